//! Editor session state.
//!
//! [`Editor`] owns the palette catalog, the name registry and the drag engine
//! (and through it the workspace tree). It is the place for actions that touch
//! more than one of them, such as removing a variable together with every
//! placed copy of its block.

use super::anchor::Layout;
use super::drag::{DragEngine, DragSource, DropAction, DropOutcome, DropRejected, DropTarget, PaletteView};
use super::operations::{self, Location};
use crate::catalog::{BlockCatalog, BlockTemplate};
use crate::clock::{Clock, SystemClock};
use crate::feedback::ExecutionFeedback;
use crate::generator::preflight::{ProgramIssue, preflight};
use crate::generator::program::serialize;
use crate::generator::submission::ProgramSubmission;
use crate::model::{ProgramNode, SlotContent, WorkspaceTree};
use crate::registry::{EntryKind, NameError, VariableRegistry, palette_id_for};

/// Edits to a placed block outside of drag gestures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
    #[error("block `{block}` has no slot {slot}")]
    NoSuchSlot { block: String, slot: usize },
    #[error("slot {slot} of `{block}` does not take typed values")]
    NotLiteralSlot { block: String, slot: usize },
    #[error("slot {slot} of `{block}` holds a block")]
    SlotOccupied { block: String, slot: usize },
    #[error("`{operator}` is not an operator of `{block}`")]
    UnknownOperator { block: String, operator: String },
}

#[derive(Debug)]
pub struct Editor<C: Clock = SystemClock> {
    catalog: BlockCatalog,
    registry: VariableRegistry,
    engine: DragEngine<C>,
}

impl Default for Editor<SystemClock> {
    fn default() -> Self {
        Self::new(
            BlockCatalog::robot_default(),
            VariableRegistry::default(),
            SystemClock,
        )
    }
}

impl<C: Clock> Editor<C> {
    pub fn new(catalog: BlockCatalog, registry: VariableRegistry, clock: C) -> Self {
        Self {
            catalog,
            registry,
            engine: DragEngine::new(clock),
        }
    }

    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &DragEngine<C> {
        &self.engine
    }

    pub fn tree(&self) -> &WorkspaceTree {
        self.engine.tree()
    }

    pub fn palette(&self) -> PaletteView<'_> {
        PaletteView {
            catalog: &self.catalog,
            registry: &self.registry,
        }
    }

    /// Every draggable palette entry: stock blocks, then one per name.
    pub fn palette_templates(&self) -> Vec<BlockTemplate> {
        self.catalog
            .iter()
            .cloned()
            .chain(self.registry.palette_templates())
            .collect()
    }

    // ── names ───────────────────────────────────────────────────────────

    pub fn add_variable(&mut self, name: &str) -> Result<(), NameError> {
        self.registry.add_name(name, EntryKind::Variable).map(|_| ())
    }

    pub fn add_position(&mut self, name: &str) -> Result<(), NameError> {
        self.registry.add_name(name, EntryKind::Position).map(|_| ())
    }

    /// Remove a variable or position and every placed copy of its block.
    /// Returns the ids of the removed blocks.
    pub fn remove_name(&mut self, name: &str) -> Vec<String> {
        if self.registry.remove_name(name).is_none() {
            return Vec::new();
        }
        let purged = operations::purge_template(self.engine.tree_mut(), &palette_id_for(name));
        if !purged.is_empty() {
            tracing::info!(%name, blocks = purged.len(), "removed placed copies");
        }
        purged
    }

    pub fn set_variable_value(&mut self, name: &str, value: &str) -> Result<(), NameError> {
        self.registry.set_value(name, Some(value.to_string()))
    }

    // ── gestures ────────────────────────────────────────────────────────

    pub fn start_drag(&mut self, source: DragSource) {
        self.engine.start(source);
    }

    pub fn hover(&self, target: &DropTarget, layout: &dyn Layout) -> Result<DropAction, DropRejected> {
        self.engine.hover(target, &self.palette(), layout)
    }

    pub fn drop(
        &mut self,
        target: &DropTarget,
        layout: &dyn Layout,
    ) -> Result<DropOutcome, DropRejected> {
        let palette = PaletteView {
            catalog: &self.catalog,
            registry: &self.registry,
        };
        self.engine.drop(target, &palette, layout)
    }

    pub fn cancel_drag(&mut self) {
        self.engine.cancel();
    }

    pub fn clear(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        self.engine.clear(confirm)
    }

    // ── in-place edits ──────────────────────────────────────────────────

    /// Type a value into a slot. An empty value clears the slot.
    pub fn set_literal(&mut self, block: &str, slot: usize, value: &str) -> Result<(), EditError> {
        let holder = operations::find_mut(self.engine.tree_mut(), block)
            .ok_or_else(|| EditError::UnknownBlock(block.to_string()))?;
        let spec = holder
            .kind
            .slots
            .get(slot)
            .ok_or_else(|| EditError::NoSuchSlot {
                block: block.to_string(),
                slot,
            })?;
        if !spec.literal {
            return Err(EditError::NotLiteralSlot {
                block: block.to_string(),
                slot,
            });
        }
        let content = holder
            .slots
            .get_mut(slot)
            .ok_or_else(|| EditError::NoSuchSlot {
                block: block.to_string(),
                slot,
            })?;
        if let SlotContent::Block(_) = content {
            return Err(EditError::SlotOccupied {
                block: block.to_string(),
                slot,
            });
        }
        *content = if value.is_empty() {
            SlotContent::Empty
        } else {
            SlotContent::Literal(value.to_string())
        };
        Ok(())
    }

    /// Select (or with `None`, clear) the operator of a calc or compare block.
    pub fn set_operator(&mut self, block: &str, operator: Option<&str>) -> Result<(), EditError> {
        let target = operations::find_mut(self.engine.tree_mut(), block)
            .ok_or_else(|| EditError::UnknownBlock(block.to_string()))?;
        if let Some(op) = operator {
            if !target.kind.operators.iter().any(|o| o == op) {
                return Err(EditError::UnknownOperator {
                    block: block.to_string(),
                    operator: op.to_string(),
                });
            }
        }
        target.operator = operator.map(str::to_string);
        Ok(())
    }

    // ── output ──────────────────────────────────────────────────────────

    /// Serialize the workspace into the executor's program tree.
    pub fn program(&self) -> Vec<ProgramNode> {
        serialize(self.engine.tree(), &self.registry, self.engine.clock())
    }

    pub fn submission(&self, endpoint: &str) -> serde_json::Result<ProgramSubmission> {
        ProgramSubmission::new(endpoint, &self.program())
    }

    pub fn preflight(&self) -> Vec<ProgramIssue> {
        preflight(&self.program(), &self.catalog, &self.registry)
    }

    /// Where the block named in an execution error sits, for highlighting.
    pub fn locate_feedback(&self, feedback: &ExecutionFeedback) -> Option<Location> {
        let id = feedback.block_id()?;
        operations::locate(self.engine.tree(), id)
    }
}
