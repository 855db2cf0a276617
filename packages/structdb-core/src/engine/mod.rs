//! Fill and learn: moving type trees between containers and the database.

pub mod fill;
pub mod merge;

pub use fill::fill;
pub use merge::{learn, LearnOutcome, LearnSkip};
