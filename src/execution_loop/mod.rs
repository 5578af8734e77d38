pub mod attempt;
pub mod error_classifier;
pub mod error_recovery;
pub mod r#loop;

pub use attempt::*;
pub use error_classifier::*;
pub use error_recovery::*;
pub use r#loop::*;
