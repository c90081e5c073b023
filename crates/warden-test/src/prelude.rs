//! Prelude module - commonly used test helpers for convenient import.
//!
//! Use `use warden_test::prelude::*;` to import all essential helpers.

pub use crate::clock::ManualClock;
pub use crate::fixtures::*;
pub use crate::init_test_logging;
pub use crate::mocks::{RecordingExecutor, ReviewScript, ScriptedReviewer};
