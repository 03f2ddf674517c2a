//! Serialize the workspace tree into the executor's program tree.
//!
//! Each top-level block becomes one [`ProgramNode`], visited depth-first.
//! A node only collects variables from its own slots; whatever sits inside
//! its children container belongs to the child nodes. Raw values typed into
//! slots become synthetic variables named `var<timestamp>`.

use crate::clock::{Clock, Entropy, synthesize_name};
use crate::model::{BlockInstance, Category, ProgramNode, ProgramVariable, SlotContent, WorkspaceTree};
use crate::registry::VariableRegistry;
use indexmap::IndexMap;
use std::collections::HashSet;

const AXES: [&str; 3] = ["X", "Y", "Z"];

/// Serialize `tree`, resolving variable blocks against `registry`.
///
/// Pure with respect to `tree` and `registry`. The clock is read once per
/// call, so two calls on an unchanged tree with the same clock reading give
/// equal output.
pub fn serialize(
    tree: &WorkspaceTree,
    registry: &VariableRegistry,
    clock: &impl Clock,
) -> Vec<ProgramNode> {
    let mut pass = SerializePass::new(registry, clock.now_millis());
    let nodes: Vec<ProgramNode> = tree
        .top_level
        .iter()
        .filter(|b| !b.palette)
        .map(|b| pass.node(b))
        .collect();
    tracing::debug!(
        nodes = nodes.len(),
        synthetic = pass.synthetic.taken.len(),
        "serialized workspace"
    );
    nodes
}

/// Value a variable label resolves to.
struct Resolved<'a> {
    value: Option<&'a str>,
}

/// Synthetic names handed out during one pass. They avoid every registry
/// name and each other without reserving anything in the registry.
struct SyntheticNames<'a> {
    registry: &'a VariableRegistry,
    taken: HashSet<String>,
    now: u64,
    entropy: Entropy,
}

impl SyntheticNames<'_> {
    fn next(&mut self) -> String {
        let name = synthesize_name(self.now, &mut self.entropy, |n| {
            self.registry.is_reserved(n) || self.taken.contains(n)
        });
        self.taken.insert(name.clone());
        name
    }
}

struct SerializePass<'a> {
    resolution: IndexMap<&'a str, Resolved<'a>>,
    synthetic: SyntheticNames<'a>,
}

impl<'a> SerializePass<'a> {
    fn new(registry: &'a VariableRegistry, now: u64) -> Self {
        let resolution = registry
            .entries()
            .map(|e| {
                (
                    e.name.as_str(),
                    Resolved {
                        value: e.value.as_deref(),
                    },
                )
            })
            .collect();
        Self {
            resolution,
            synthetic: SyntheticNames {
                registry,
                taken: HashSet::new(),
                now,
                entropy: Entropy::seeded(now),
            },
        }
    }

    fn node(&mut self, block: &BlockInstance) -> ProgramNode {
        let mut variables = if block.category() == Category::Pos {
            self.axis_variables(block)
        } else {
            self.slot_variables(block)
        };

        let mut children: Vec<ProgramNode> = block
            .children
            .iter()
            .flatten()
            .filter(|c| !c.palette)
            .map(|c| self.node(c))
            .collect();
        // Blocks held in slots (a position in a `{pos}` slot) follow the
        // structural children. A held position also lends its axes to the
        // holder, under the same names.
        for occupant in block.slots.iter().filter_map(SlotContent::block) {
            if occupant.category() != Category::Variable && !occupant.palette {
                let child = self.node(occupant);
                if occupant.category() == Category::Pos {
                    variables.extend(child.variables.iter().cloned());
                }
                children.push(child);
            }
        }

        ProgramNode {
            id: block.id.clone(),
            node_type: block.category().wire_name().to_string(),
            text: block.wire_text(),
            variables,
            children,
        }
    }

    /// Variables from the block's own slots, in slot order.
    fn slot_variables(&mut self, block: &BlockInstance) -> Vec<ProgramVariable> {
        let mut out = Vec::new();
        for content in &block.slots {
            match content {
                SlotContent::Block(b) if b.category() == Category::Variable => {
                    if let Some(var) = self.bound(b) {
                        out.push(var);
                    } else {
                        tracing::warn!(block = %block.id, variable = %b.label, "unresolved variable");
                    }
                }
                SlotContent::Literal(value) => out.push(self.literal(Some(value))),
                SlotContent::Block(_) | SlotContent::Empty => {}
            }
        }
        out
    }

    /// One variable per axis in X, Y, Z order, whatever order the slots are
    /// declared in.
    fn axis_variables(&mut self, block: &BlockInstance) -> Vec<ProgramVariable> {
        let named: Vec<Option<usize>> = AXES
            .iter()
            .map(|axis| {
                block
                    .kind
                    .slots
                    .iter()
                    .position(|s| s.name.as_deref() == Some(*axis))
            })
            .collect();
        // Without all three names, the first slots stand in and any axis
        // past them stays unset.
        let indices: Vec<Option<usize>> = if named.iter().all(Option::is_some) {
            named
        } else {
            (0..AXES.len()).map(Some).collect()
        };

        indices
            .into_iter()
            .map(|i| match i.and_then(|i| block.slots.get(i)) {
                Some(SlotContent::Literal(value)) => self.literal(Some(value)),
                Some(SlotContent::Block(b)) if b.category() == Category::Variable => {
                    self.bound(b).unwrap_or_else(|| self.literal(None))
                }
                Some(SlotContent::Block(_) | SlotContent::Empty) | None => self.literal(None),
            })
            .collect()
    }

    fn bound(&self, var: &BlockInstance) -> Option<ProgramVariable> {
        let resolved = self.resolution.get(var.label.as_str())?;
        Some(ProgramVariable {
            id: var.id.clone(),
            text: var.label.clone(),
            var_type: Category::Variable.wire_name().to_string(),
            value: resolved.value.map(str::to_string),
        })
    }

    fn literal(&mut self, value: Option<&String>) -> ProgramVariable {
        let name = self.synthetic.next();
        ProgramVariable {
            id: name.clone(),
            text: name,
            var_type: Category::Variable.wire_name().to_string(),
            value: value.cloned(),
        }
    }
}
