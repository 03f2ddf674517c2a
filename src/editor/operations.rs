//! Low-level mutations of the [`WorkspaceTree`].
//!
//! These functions address blocks by id and containers by [`ContainerRef`].
//! They do no type checking: the drag engine validates a drop completely and
//! only then calls into this module, so each call here is expected to
//! succeed on the tree it was validated against.

use super::anchor::Anchor;
use crate::model::{BlockInstance, SlotContent, WorkspaceTree};

// ────────────────────────────────────────────────────────────────────────────
// Addressing
// ────────────────────────────────────────────────────────────────────────────

/// A container that can hold blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRef {
    /// The top-level sequence of the workspace.
    Root,
    /// The children container of the block with this id.
    Children(String),
    /// A slot on the block with this id.
    Slot { block: String, slot: usize },
}

/// Where a block currently sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub container: ContainerRef,
    /// Position within the container; always 0 for slots.
    pub index: usize,
}

pub fn find<'a>(tree: &'a WorkspaceTree, id: &str) -> Option<&'a BlockInstance> {
    tree.top_level.iter().find_map(|b| find_in(b, id))
}

fn find_in<'a>(block: &'a BlockInstance, id: &str) -> Option<&'a BlockInstance> {
    if block.id == id {
        return Some(block);
    }
    block
        .children
        .iter()
        .flatten()
        .find_map(|c| find_in(c, id))
        .or_else(|| {
            block
                .slots
                .iter()
                .filter_map(SlotContent::block)
                .find_map(|b| find_in(b, id))
        })
}

pub fn find_mut<'a>(tree: &'a mut WorkspaceTree, id: &str) -> Option<&'a mut BlockInstance> {
    tree.top_level.iter_mut().find_map(|b| find_in_mut(b, id))
}

fn find_in_mut<'a>(block: &'a mut BlockInstance, id: &str) -> Option<&'a mut BlockInstance> {
    if block.id == id {
        return Some(block);
    }
    if let Some(found) = block
        .children
        .iter_mut()
        .flatten()
        .find_map(|c| find_in_mut(c, id))
    {
        return Some(found);
    }
    block.slots.iter_mut().find_map(|s| match s {
        SlotContent::Block(b) => find_in_mut(b, id),
        _ => None,
    })
}

/// Find the container holding `id`.
pub fn locate(tree: &WorkspaceTree, id: &str) -> Option<Location> {
    if let Some(index) = tree.top_level.iter().position(|b| b.id == id) {
        return Some(Location {
            container: ContainerRef::Root,
            index,
        });
    }
    tree.top_level.iter().find_map(|b| locate_in(b, id))
}

fn locate_in(block: &BlockInstance, id: &str) -> Option<Location> {
    if let Some(children) = &block.children {
        if let Some(index) = children.iter().position(|c| c.id == id) {
            return Some(Location {
                container: ContainerRef::Children(block.id.clone()),
                index,
            });
        }
    }
    for (slot, content) in block.slots.iter().enumerate() {
        if content.block().is_some_and(|b| b.id == id) {
            return Some(Location {
                container: ContainerRef::Slot {
                    block: block.id.clone(),
                    slot,
                },
                index: 0,
            });
        }
    }
    block
        .children
        .iter()
        .flatten()
        .chain(block.slots.iter().filter_map(SlotContent::block))
        .find_map(|b| locate_in(b, id))
}

/// Blocks in an ordered container, or `None` if it does not exist.
pub fn sequence<'a>(
    tree: &'a WorkspaceTree,
    container: &ContainerRef,
) -> Option<&'a [BlockInstance]> {
    match container {
        ContainerRef::Root => Some(&tree.top_level),
        ContainerRef::Children(id) => find(tree, id)?.children.as_deref(),
        ContainerRef::Slot { .. } => None,
    }
}

fn sequence_mut<'a>(
    tree: &'a mut WorkspaceTree,
    container: &ContainerRef,
) -> Option<&'a mut Vec<BlockInstance>> {
    match container {
        ContainerRef::Root => Some(&mut tree.top_level),
        ContainerRef::Children(id) => find_mut(tree, id)?.children.as_mut(),
        ContainerRef::Slot { .. } => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mutations
// ────────────────────────────────────────────────────────────────────────────

/// Remove a block and its subtree from wherever it sits.
pub fn detach(tree: &mut WorkspaceTree, id: &str) -> Option<BlockInstance> {
    let location = locate(tree, id)?;
    match location.container {
        ContainerRef::Slot { block, slot } => {
            let holder = find_mut(tree, &block)?;
            let content = holder.slots.get_mut(slot)?;
            match std::mem::take(content) {
                SlotContent::Block(b) => Some(*b),
                other => {
                    *content = other;
                    None
                }
            }
        }
        container => {
            let seq = sequence_mut(tree, &container)?;
            Some(seq.remove(location.index))
        }
    }
}

/// Insert into an ordered container at `anchor`. An anchor that is no longer
/// in the container appends. Returns the block if the container is missing.
pub fn insert_at(
    tree: &mut WorkspaceTree,
    container: &ContainerRef,
    anchor: &Anchor,
    block: BlockInstance,
) -> Result<(), BlockInstance> {
    let Some(seq) = sequence_mut(tree, container) else {
        return Err(block);
    };
    let index = match anchor {
        Anchor::Before(id) => seq.iter().position(|b| &b.id == id).unwrap_or(seq.len()),
        Anchor::End => seq.len(),
    };
    seq.insert(index, block);
    Ok(())
}

/// Put a block into a slot, returning what the slot held before.
pub fn place_in_slot(
    tree: &mut WorkspaceTree,
    block_id: &str,
    slot: usize,
    block: BlockInstance,
) -> Result<SlotContent, BlockInstance> {
    let Some(content) = find_mut(tree, block_id).and_then(|h| h.slots.get_mut(slot)) else {
        return Err(block);
    };
    Ok(std::mem::replace(content, SlotContent::Block(Box::new(block))))
}

/// Remove every placed block cloned from `template_id`, at any depth.
/// Returns the removed ids.
pub fn purge_template(tree: &mut WorkspaceTree, template_id: &str) -> Vec<String> {
    let mut removed = Vec::new();
    purge_seq(&mut tree.top_level, template_id, &mut removed);
    removed
}

fn purge_seq(seq: &mut Vec<BlockInstance>, template_id: &str, removed: &mut Vec<String>) {
    seq.retain(|b| {
        let hit = b.template_id == template_id;
        if hit {
            removed.push(b.id.clone());
        }
        !hit
    });
    for block in seq.iter_mut() {
        purge_block(block, template_id, removed);
    }
}

fn purge_block(block: &mut BlockInstance, template_id: &str, removed: &mut Vec<String>) {
    if let Some(children) = block.children.as_mut() {
        purge_seq(children, template_id, removed);
    }
    for content in block.slots.iter_mut() {
        let hit = matches!(content, SlotContent::Block(b) if b.template_id == template_id);
        if hit {
            if let SlotContent::Block(b) = std::mem::take(content) {
                removed.push(b.id);
            }
        } else if let SlotContent::Block(b) = content {
            purge_block(b, template_id, removed);
        }
    }
}

/// Visit every placed block in pre-order (children before slot occupants).
pub fn walk<'a>(tree: &'a WorkspaceTree, mut visit: impl FnMut(&'a BlockInstance)) {
    fn rec<'a>(block: &'a BlockInstance, visit: &mut impl FnMut(&'a BlockInstance)) {
        visit(block);
        for child in block.children.iter().flatten() {
            rec(child, visit);
        }
        for occupant in block.slots.iter().filter_map(SlotContent::block) {
            rec(occupant, visit);
        }
    }
    for block in &tree.top_level {
        rec(block, &mut visit);
    }
}
