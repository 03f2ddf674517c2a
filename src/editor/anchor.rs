//! Insertion-point computation for drops into ordered containers.
//!
//! Geometry comes from the view through the [`Layout`] trait; the engine only
//! needs the vertical extent of each sibling.

use super::operations::walk;
use crate::model::{BlockInstance, WorkspaceTree};
use std::collections::HashMap;

/// Vertical extent of a rendered block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockBox {
    pub top: f32,
    pub height: f32,
}

impl BlockBox {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn mid_y(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Supplies rendered bounds for placed blocks.
pub trait Layout {
    fn bounds(&self, block_id: &str) -> Option<BlockBox>;
}

/// No geometry known: every drop appends.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl Layout for NoLayout {
    fn bounds(&self, _block_id: &str) -> Option<BlockBox> {
        None
    }
}

/// Bounds looked up from a map keyed by block id.
#[derive(Debug, Clone, Default)]
pub struct FixedLayout {
    pub boxes: HashMap<String, BlockBox>,
}

impl FixedLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, top: f32, height: f32) -> Self {
        self.boxes.insert(id.to_string(), BlockBox::new(top, height));
        self
    }
}

impl Layout for FixedLayout {
    fn bounds(&self, block_id: &str) -> Option<BlockBox> {
        self.boxes.get(block_id).copied()
    }
}

/// Every placed block stacked in pre-order, one row of equal height each.
/// Used where no real view exists, such as replaying scripted sessions.
#[derive(Debug, Clone)]
pub struct StackLayout {
    rows: HashMap<String, BlockBox>,
    row_height: f32,
}

impl StackLayout {
    pub fn of(tree: &WorkspaceTree, row_height: f32) -> Self {
        let mut rows = HashMap::new();
        let mut top = 0.0;
        walk(tree, |block| {
            rows.insert(block.id.clone(), BlockBox::new(top, row_height));
            top += row_height;
        });
        Self { rows, row_height }
    }

    /// A pointer position whose anchor is `id` among its siblings.
    pub fn pointer_before(&self, id: &str) -> Option<f32> {
        self.rows.get(id).map(|b| b.top + self.row_height / 4.0)
    }

    /// A pointer position below every block.
    pub fn pointer_below_all(&self) -> f32 {
        self.rows.len() as f32 * self.row_height
    }
}

impl Layout for StackLayout {
    fn bounds(&self, block_id: &str) -> Option<BlockBox> {
        self.rows.get(block_id).copied()
    }
}

/// Where a block lands inside an ordered container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Directly before the sibling with this id.
    Before(String),
    End,
}

/// Pick the sibling the pointer sits just above.
///
/// For each candidate the offset `pointer_y - mid_y` is computed; the anchor
/// is the candidate with the largest strictly negative offset, i.e. the
/// closest midpoint below the pointer. Equal offsets resolve to the sibling
/// that comes first in container order. Palette originals, `skip` and
/// siblings without finite bounds are not candidates.
pub fn insertion_anchor<'a>(
    siblings: impl IntoIterator<Item = &'a BlockInstance>,
    pointer_y: f32,
    layout: &dyn Layout,
    skip: Option<&str>,
) -> Anchor {
    if !pointer_y.is_finite() {
        return Anchor::End;
    }
    let mut best: Option<(f32, usize, &str)> = None;
    for (order, sibling) in siblings.into_iter().enumerate() {
        if sibling.palette || skip == Some(sibling.id.as_str()) {
            continue;
        }
        let Some(bounds) = layout.bounds(&sibling.id) else {
            continue;
        };
        let offset = pointer_y - bounds.mid_y();
        if !offset.is_finite() || offset >= 0.0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_offset, best_order, _)) => {
                offset > best_offset || (offset == best_offset && order < best_order)
            }
        };
        if better {
            best = Some((offset, order, sibling.id.as_str()));
        }
    }
    match best {
        Some((_, _, id)) => Anchor::Before(id.to_string()),
        None => Anchor::End,
    }
}
