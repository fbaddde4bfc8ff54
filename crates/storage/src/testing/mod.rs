//! Testing utilities for collaborator failure scenarios

mod fail;

pub use fail::{FailPoint, FailPoints, Trigger};
