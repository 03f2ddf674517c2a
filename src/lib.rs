//! Block-based robot programming workspace.
//!
//! Programs are built by dragging blocks from a palette into a workspace
//! tree. This crate provides the pieces behind such an editor:
//!
//! - [`catalog`] and [`registry`] describe what can be dragged,
//! - [`editor`] owns the workspace tree and applies drag-and-drop gestures,
//! - [`generator`] turns the tree into the JSON program the executor runs,
//! - [`feedback`] parses what the executor sends back.
//!
//! The binary `robolink-blocks` replays a [`script::GestureScript`] and
//! prints the resulting program.

pub mod catalog;
pub mod clock;
pub mod editor;
pub mod feedback;
pub mod generator;
pub mod model;
pub mod registry;
pub mod script;

pub use catalog::{BlockCatalog, BlockTemplate};
pub use clock::{Clock, FixedClock, SystemClock, TickClock};
pub use editor::{DragEngine, DragSource, DropOutcome, DropRejected, DropTarget, Editor};
pub use model::{BlockInstance, Category, ProgramNode, WorkspaceTree};
pub use registry::{NameError, VariableRegistry};
