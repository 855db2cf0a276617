//! Integration test suite.
//!
//! Exercises the public API the way a host tool does:
//! learn from parsed containers, save in batches, reload and fill.

pub mod helpers;
pub mod lifecycle_tests;
pub mod recovery_tests;
