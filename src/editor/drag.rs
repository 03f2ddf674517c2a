//! Drag-and-drop engine.
//!
//! One gesture at a time: [`DragEngine::start`] records what is carried,
//! [`DragEngine::hover`] previews where it would land, and
//! [`DragEngine::drop`] applies it. Every drop is planned against the current
//! tree first; the tree is only touched once the whole plan has validated, so
//! a rejected drop leaves it exactly as it was.

use super::anchor::{Anchor, Layout, insertion_anchor};
use super::operations::{self, ContainerRef};
use crate::catalog::{BlockCatalog, BlockTemplate};
use crate::clock::{Clock, SystemClock};
use crate::model::{BlockInstance, Category, SlotContent, WorkspaceTree};
use crate::registry::VariableRegistry;

// ────────────────────────────────────────────────────────────────────────────
// Gesture types
// ────────────────────────────────────────────────────────────────────────────

/// What the pointer picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A palette template, by template id.
    Palette(String),
    /// A placed block, by id.
    Workspace(String),
}

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq)]
pub enum DropTarget {
    Slot { block: String, slot: usize },
    /// Over a placed block. The drop nests into the nearest enclosing block
    /// that accepts children, or falls back to the workspace root.
    Block { block: String, pointer_y: f32 },
    Workspace { pointer_y: f32 },
    /// The trash area.
    Disposal,
    /// Anywhere not tracked by the editor.
    Outside,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging(DragSource),
}

/// What a drop would do, as reported by [`DragEngine::hover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropAction {
    Slot {
        holder: String,
        slot: usize,
        /// Block that would be pushed back to the workspace root.
        evicts: Option<String>,
    },
    Insert {
        container: ContainerRef,
        anchor: Anchor,
    },
    /// `None` when a palette item is dropped on the trash.
    Dispose { block: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Inserted {
        id: String,
        container: ContainerRef,
    },
    Slotted {
        id: String,
        holder: String,
        slot: usize,
        evicted: Option<String>,
    },
    /// Block and its subtree removed; `removed` counts every block.
    Deleted { id: String, removed: usize },
    /// Nothing to do (palette item dropped on the trash).
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropRejected {
    #[error("block type `{category:?}` not allowed in slot {slot} of `{holder}`")]
    TypeMismatch {
        category: Category,
        holder: String,
        slot: usize,
    },
    #[error("no drop target")]
    NoTarget,
    #[error("unknown palette template `{0}`")]
    UnknownTemplate(String),
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
    #[error("`{carried}` cannot be dropped into its own subtree")]
    IntoOwnSubtree { carried: String },
    #[error("no drag in progress")]
    NotDragging,
}

// ────────────────────────────────────────────────────────────────────────────
// Palette lookup
// ────────────────────────────────────────────────────────────────────────────

/// Resolves palette template ids.
pub trait Palette {
    fn template(&self, id: &str) -> Option<BlockTemplate>;
}

impl Palette for BlockCatalog {
    fn template(&self, id: &str) -> Option<BlockTemplate> {
        self.get(id).cloned()
    }
}

impl Palette for VariableRegistry {
    fn template(&self, id: &str) -> Option<BlockTemplate> {
        self.palette_template(id)
    }
}

/// The full palette: stock blocks plus one block per registry entry.
#[derive(Debug, Clone, Copy)]
pub struct PaletteView<'a> {
    pub catalog: &'a BlockCatalog,
    pub registry: &'a VariableRegistry,
}

impl Palette for PaletteView<'_> {
    fn template(&self, id: &str) -> Option<BlockTemplate> {
        self.catalog
            .template(id)
            .or_else(|| self.registry.template(id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

enum Carried {
    Fresh(BlockTemplate),
    Existing(String),
}

struct DropPlan {
    /// `None` for drops on the trash, which only remove.
    carried: Option<Carried>,
    action: DropAction,
}

/// Owns the workspace tree and applies drag gestures to it.
#[derive(Debug)]
pub struct DragEngine<C: Clock = SystemClock> {
    tree: WorkspaceTree,
    state: GestureState,
    clock: C,
    last_stamp: Option<u64>,
}

impl Default for DragEngine<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> DragEngine<C> {
    pub fn new(clock: C) -> Self {
        Self::with_tree(WorkspaceTree::new(), clock)
    }

    pub fn with_tree(tree: WorkspaceTree, clock: C) -> Self {
        Self {
            tree,
            state: GestureState::Idle,
            clock,
            last_stamp: None,
        }
    }

    pub fn tree(&self) -> &WorkspaceTree {
        &self.tree
    }

    /// Direct access for edits that are not gestures (slot literals,
    /// operators, purges).
    pub(crate) fn tree_mut(&mut self) -> &mut WorkspaceTree {
        &mut self.tree
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging(_))
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Begin a gesture. Nothing in the tree changes until the drop.
    pub fn start(&mut self, source: DragSource) {
        if let GestureState::Dragging(previous) = &self.state {
            tracing::debug!(?previous, "replacing unfinished gesture");
        }
        tracing::debug!(?source, "drag started");
        self.state = GestureState::Dragging(source);
    }

    /// Abandon the gesture without touching the tree.
    pub fn cancel(&mut self) {
        if let GestureState::Dragging(source) = std::mem::take(&mut self.state) {
            tracing::debug!(?source, "drag cancelled");
        }
    }

    /// Preview the drop at `target`. Pure: may be called for every pointer
    /// move.
    pub fn hover(
        &self,
        target: &DropTarget,
        palette: &dyn Palette,
        layout: &dyn Layout,
    ) -> Result<DropAction, DropRejected> {
        let GestureState::Dragging(source) = &self.state else {
            return Err(DropRejected::NotDragging);
        };
        self.plan(source, target, palette, layout)
            .map(|plan| plan.action)
    }

    /// Finish the gesture at `target`. The gesture ends whether or not the
    /// drop is accepted.
    pub fn drop(
        &mut self,
        target: &DropTarget,
        palette: &dyn Palette,
        layout: &dyn Layout,
    ) -> Result<DropOutcome, DropRejected> {
        let GestureState::Dragging(source) = std::mem::take(&mut self.state) else {
            return Err(DropRejected::NotDragging);
        };
        let result = self
            .plan(&source, target, palette, layout)
            .and_then(|plan| self.apply(plan));
        match &result {
            Ok(outcome) => tracing::info!(?source, ?outcome, "drop applied"),
            Err(err) => tracing::warn!(?source, %err, "drop rejected"),
        }
        result
    }

    /// Empty the workspace if `confirm` agrees. Returns whether it did.
    pub fn clear(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            tracing::warn!("clear aborted");
            return false;
        }
        let count = self.tree.block_count();
        self.tree.top_level.clear();
        tracing::info!(removed = count, "workspace cleared");
        true
    }

    // ── planning ────────────────────────────────────────────────────────

    fn plan(
        &self,
        source: &DragSource,
        target: &DropTarget,
        palette: &dyn Palette,
        layout: &dyn Layout,
    ) -> Result<DropPlan, DropRejected> {
        match target {
            DropTarget::Outside => return Err(DropRejected::NoTarget),
            DropTarget::Disposal => {
                let block = match source {
                    DragSource::Palette(_) => None,
                    DragSource::Workspace(id) => {
                        if operations::find(&self.tree, id).is_none() {
                            return Err(DropRejected::UnknownBlock(id.clone()));
                        }
                        Some(id.clone())
                    }
                };
                return Ok(DropPlan {
                    carried: None,
                    action: DropAction::Dispose { block },
                });
            }
            _ => {}
        }

        let (carried, category, carried_block) = match source {
            DragSource::Palette(id) => {
                let template = palette
                    .template(id)
                    .ok_or_else(|| DropRejected::UnknownTemplate(id.clone()))?;
                let category = template.kind.category;
                (Carried::Fresh(template), category, None)
            }
            DragSource::Workspace(id) => {
                let block = operations::find(&self.tree, id)
                    .ok_or_else(|| DropRejected::UnknownBlock(id.clone()))?;
                (Carried::Existing(id.clone()), block.category(), Some(block))
            }
        };

        let action = match target {
            DropTarget::Slot { block, slot } => {
                let holder = operations::find(&self.tree, block)
                    .ok_or_else(|| DropRejected::UnknownBlock(block.clone()))?;
                let spec = holder.kind.slots.get(*slot).ok_or(DropRejected::NoTarget)?;
                if let Some(carried) = carried_block {
                    if carried.contains(block) {
                        return Err(DropRejected::IntoOwnSubtree {
                            carried: carried.id.clone(),
                        });
                    }
                }
                if !spec.accepts(category) {
                    return Err(DropRejected::TypeMismatch {
                        category,
                        holder: block.clone(),
                        slot: *slot,
                    });
                }
                let evicts = holder
                    .slots
                    .get(*slot)
                    .ok_or(DropRejected::NoTarget)?
                    .block()
                    .filter(|b| carried_block.is_none_or(|c| c.id != b.id))
                    .map(|b| b.id.clone());
                DropAction::Slot {
                    holder: block.clone(),
                    slot: *slot,
                    evicts,
                }
            }
            DropTarget::Block { block, pointer_y } => {
                let container = self.nest_container(block, carried_block)?;
                self.insert_action(container, *pointer_y, layout, carried_block)
            }
            DropTarget::Workspace { pointer_y } => {
                self.insert_action(ContainerRef::Root, *pointer_y, layout, carried_block)
            }
            DropTarget::Outside | DropTarget::Disposal => return Err(DropRejected::NoTarget),
        };

        Ok(DropPlan {
            carried: Some(carried),
            action,
        })
    }

    /// Container a drop over `block_id` nests into: the nearest block at or
    /// above it that accepts children, skipping the carried subtree.
    fn nest_container(
        &self,
        block_id: &str,
        carried: Option<&BlockInstance>,
    ) -> Result<ContainerRef, DropRejected> {
        let unknown = || DropRejected::UnknownBlock(block_id.to_string());
        let mut current = block_id.to_string();
        if let Some(c) = carried {
            if c.contains(block_id) {
                current = c.id.clone();
            }
        }
        loop {
            let block = operations::find(&self.tree, &current).ok_or_else(unknown)?;
            let is_carried = carried.is_some_and(|c| c.id == current);
            if block.kind.accepts_children && !is_carried {
                return Ok(ContainerRef::Children(current));
            }
            let location = operations::locate(&self.tree, &current).ok_or_else(unknown)?;
            match location.container {
                ContainerRef::Slot { block, .. } => current = block,
                container => return Ok(container),
            }
        }
    }

    fn insert_action(
        &self,
        container: ContainerRef,
        pointer_y: f32,
        layout: &dyn Layout,
        carried: Option<&BlockInstance>,
    ) -> DropAction {
        let siblings = operations::sequence(&self.tree, &container).unwrap_or(&[]);
        let anchor = insertion_anchor(
            siblings,
            pointer_y,
            layout,
            carried.map(|c| c.id.as_str()),
        );
        DropAction::Insert { container, anchor }
    }

    // ── applying ────────────────────────────────────────────────────────

    fn apply(&mut self, plan: DropPlan) -> Result<DropOutcome, DropRejected> {
        if let DropAction::Dispose { block } = &plan.action {
            return Ok(match block {
                None => DropOutcome::Ignored,
                Some(id) => {
                    let removed = operations::detach(&mut self.tree, id)
                        .ok_or_else(|| DropRejected::UnknownBlock(id.clone()))?;
                    DropOutcome::Deleted {
                        id: id.clone(),
                        removed: removed.subtree_len(),
                    }
                }
            });
        }

        let snapshot = self.tree.clone();
        let result = self.apply_placement(plan);
        if result.is_err() {
            self.tree = snapshot;
        }
        result
    }

    fn apply_placement(&mut self, plan: DropPlan) -> Result<DropOutcome, DropRejected> {
        let block = match plan.carried {
            Some(Carried::Fresh(template)) => {
                let id = self.fresh_id(&template.id);
                template.instantiate(&id)
            }
            Some(Carried::Existing(id)) => operations::detach(&mut self.tree, &id)
                .ok_or(DropRejected::UnknownBlock(id))?,
            None => return Err(DropRejected::NoTarget),
        };
        let id = block.id.clone();

        match plan.action {
            DropAction::Slot { holder, slot, .. } => {
                let previous = operations::place_in_slot(&mut self.tree, &holder, slot, block)
                    .map_err(|_| DropRejected::UnknownBlock(holder.clone()))?;
                let evicted = match previous {
                    SlotContent::Block(mut old) => {
                        old.palette = false;
                        let old_id = old.id.clone();
                        self.tree.top_level.push(*old);
                        Some(old_id)
                    }
                    SlotContent::Literal(_) | SlotContent::Empty => None,
                };
                Ok(DropOutcome::Slotted {
                    id,
                    holder,
                    slot,
                    evicted,
                })
            }
            DropAction::Insert { container, anchor } => {
                operations::insert_at(&mut self.tree, &container, &anchor, block)
                    .map_err(|_| DropRejected::NoTarget)?;
                Ok(DropOutcome::Inserted { id, container })
            }
            DropAction::Dispose { .. } => Err(DropRejected::NoTarget),
        }
    }

    /// `<template>-<millis>`, never reusing a timestamp already handed out
    /// and never colliding with a placed block.
    fn fresh_id(&mut self, template_id: &str) -> String {
        let now = self.clock.now_millis();
        let mut stamp = match self.last_stamp {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        let mut id = format!("{template_id}-{stamp}");
        while operations::find(&self.tree, &id).is_some() {
            stamp += 1;
            id = format!("{template_id}-{stamp}");
        }
        self.last_stamp = Some(stamp);
        id
    }
}
