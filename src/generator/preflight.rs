//! Checks on a serialized program before it is sent to the executor.
//!
//! The executor rejects a block whose variable count does not match what it
//! expects for that block. Running the same check here lets the editor point
//! at the offending block before anything is submitted.

use crate::catalog::{BlockCatalog, BlockTemplate};
use crate::model::{Category, ProgramNode};
use crate::registry::VariableRegistry;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ProgramIssue {
    #[error("block `{block_id}` expects {expected} variables, found {found}")]
    ArityMismatch {
        block_id: String,
        expected: usize,
        found: usize,
    },
    #[error("block `{block_id}` has no operator selected")]
    MissingOperator { block_id: String },
    #[error("block `{block_id}` has no position to move to")]
    MissingPosition { block_id: String },
    #[error("variable `{variable}` of block `{block_id}` has no value")]
    UnsetValue { block_id: String, variable: String },
}

impl ProgramIssue {
    pub fn block_id(&self) -> &str {
        match self {
            Self::ArityMismatch { block_id, .. }
            | Self::MissingOperator { block_id }
            | Self::MissingPosition { block_id }
            | Self::UnsetValue { block_id, .. } => block_id,
        }
    }
}

/// Check every node, depth-first. Nodes whose id does not map back to a
/// known template are skipped.
pub fn preflight(
    nodes: &[ProgramNode],
    catalog: &BlockCatalog,
    registry: &VariableRegistry,
) -> Vec<ProgramIssue> {
    let mut issues = Vec::new();
    for node in nodes {
        check(node, catalog, registry, &mut issues);
    }
    if !issues.is_empty() {
        tracing::debug!(issues = issues.len(), "preflight found problems");
    }
    issues
}

fn template_of(id: &str, catalog: &BlockCatalog, registry: &VariableRegistry) -> Option<BlockTemplate> {
    if let Some(template) = catalog.template_for_instance(id) {
        return Some(template.clone());
    }
    let (base, stamp) = id.rsplit_once('-')?;
    if !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    registry.palette_template(base)
}

fn check(
    node: &ProgramNode,
    catalog: &BlockCatalog,
    registry: &VariableRegistry,
    issues: &mut Vec<ProgramIssue>,
) {
    if let Some(template) = template_of(&node.id, catalog, registry) {
        if let Some(expected) = template.expected_vars {
            if node.variables.len() != expected {
                issues.push(ProgramIssue::ArityMismatch {
                    block_id: node.id.clone(),
                    expected,
                    found: node.variables.len(),
                });
            }
        }
        if !template.kind.operators.is_empty() && node.text == template.label {
            issues.push(ProgramIssue::MissingOperator {
                block_id: node.id.clone(),
            });
        }
        let wants_position = template
            .kind
            .slots
            .iter()
            .any(|s| !s.literal && s.accepts == [Category::Pos]);
        let pos_type = Category::Pos.wire_name();
        if wants_position && !node.children.iter().any(|c| c.node_type == pos_type) {
            issues.push(ProgramIssue::MissingPosition {
                block_id: node.id.clone(),
            });
        }
    }

    // Synthetic variables carry their own name as id; an unset one comes
    // from an axis slot nobody filled in. Axes a holder copied from its
    // position are reported on the position.
    for var in &node.variables {
        let copied = node
            .children
            .iter()
            .any(|c| c.variables.iter().any(|v| v.id == var.id));
        if var.value.is_none()
            && var.id == var.text
            && !copied
            && registry.lookup(&var.text).is_none()
        {
            issues.push(ProgramIssue::UnsetValue {
                block_id: node.id.clone(),
                variable: var.text.clone(),
            });
        }
    }

    for child in &node.children {
        check(child, catalog, registry, issues);
    }
}
