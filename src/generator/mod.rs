//! Program generation from the workspace.
//!
//! - [`program`] – serialize the workspace tree into [`crate::model::ProgramNode`]s
//! - [`preflight`] – arity and completeness checks mirroring the executor
//! - [`submission`] – the JSON POST payload sent to the executor

pub mod preflight;
pub mod program;
pub mod submission;

pub use preflight::{ProgramIssue, preflight};
pub use program::serialize;
pub use submission::ProgramSubmission;
