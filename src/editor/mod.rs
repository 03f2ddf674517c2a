//! Workspace editing.
//!
//! - [`operations`] – addressing and low-level mutations of the workspace tree
//! - [`anchor`] – insertion points for drops into ordered containers
//! - [`drag`] – the drag-and-drop gesture engine
//! - [`state`] – the [`Editor`] session tying palette, registry and engine together

pub mod anchor;
pub mod drag;
pub mod operations;
pub mod state;

pub use anchor::{Anchor, BlockBox, FixedLayout, Layout, NoLayout, StackLayout, insertion_anchor};
pub use drag::{
    DragEngine, DragSource, DropAction, DropOutcome, DropRejected, DropTarget, GestureState,
    Palette, PaletteView,
};
pub use operations::{ContainerRef, Location};
pub use state::{EditError, Editor};
