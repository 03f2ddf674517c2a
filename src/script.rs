//! Replayable editing sessions.
//!
//! A [`GestureScript`] is a JSON description of what a user did in the
//! editor: names to register, then a list of steps such as "drag this
//! palette block into that repeat". Steps refer to earlier placed blocks by
//! handles chosen in the script, since real ids depend on the clock.
//!
//! ```json
//! {
//!   "variables": [{ "name": "speed", "value": "5" }],
//!   "steps": [
//!     { "op": "place", "template": "block-repeat", "as": "loop" },
//!     { "op": "place", "template": "block-steps-x", "into": { "into": "loop" }, "as": "step" },
//!     { "op": "place", "template": "block-get-speed-pos", "into": { "slot": { "block": "step", "slot": 0 } } },
//!     { "op": "literal", "block": "loop", "slot": 0, "value": "3" }
//!   ]
//! }
//! ```

use crate::clock::Clock;
use crate::editor::{
    ContainerRef, DragSource, DropOutcome, DropRejected, DropTarget, EditError, Editor,
    StackLayout, operations,
};
use crate::registry::NameError;
use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Row height of the synthetic layout used to turn targets into pointers.
const ROW_HEIGHT: f32 = 40.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureScript {
    #[serde(default)]
    pub variables: Vec<ScriptVariable>,
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptVariable {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Drag a palette template onto `into`.
    Place {
        template: String,
        #[serde(default)]
        into: ScriptTarget,
        #[serde(rename = "as", default)]
        handle: Option<String>,
    },
    /// Drag a placed block onto `into`.
    Move {
        block: String,
        #[serde(default)]
        into: ScriptTarget,
    },
    /// Drag a placed block onto the trash.
    Delete { block: String },
    Literal {
        block: String,
        slot: usize,
        value: String,
    },
    Operator {
        block: String,
        #[serde(default)]
        operator: Option<String>,
    },
    /// Empty the workspace (confirmed).
    Clear,
    RemoveName { name: String },
}

/// Where a scripted drag ends. Block references are script handles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptTarget {
    /// Below everything at the top level.
    #[default]
    Workspace,
    /// At the end of the container the block nests into.
    Into(String),
    /// Directly before a block, in whatever container holds it.
    Before(String),
    Slot { block: String, slot: usize },
    Trash,
    Outside,
}

/// A step the editor refused. The session continues after it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Drop(#[from] DropRejected),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Name(#[from] NameError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Outcome of every accepted drop, in step order.
    pub outcomes: Vec<DropOutcome>,
    /// Refused steps, by step index.
    pub rejected: Vec<(usize, StepError)>,
    /// Handle to block id.
    pub handles: HashMap<String, String>,
}

impl GestureScript {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        let script =
            Self::from_json(&text).with_context(|| format!("Failed to parse script {path}"))?;
        tracing::debug!(%path, steps = script.steps.len(), "loaded gesture script");
        Ok(script)
    }

    /// Replay the script against `editor`.
    ///
    /// Steps the editor refuses are collected in the report. A handle that
    /// was never defined is a script error and aborts the replay.
    pub fn run<C: Clock>(&self, editor: &mut Editor<C>) -> Result<ScriptReport> {
        let mut report = ScriptReport::default();

        for var in &self.variables {
            editor
                .add_variable(&var.name)
                .with_context(|| format!("Cannot add variable `{}`", var.name))?;
            if let Some(value) = &var.value {
                editor.set_variable_value(&var.name, value)?;
            }
        }
        for name in &self.positions {
            editor
                .add_position(name)
                .with_context(|| format!("Cannot add position `{name}`"))?;
        }

        for (index, step) in self.steps.iter().enumerate() {
            let _span = tracing::debug_span!("step", index).entered();
            match self.step(editor, step, &mut report) {
                Ok(()) => {}
                Err(err) => match err.downcast::<StepError>() {
                    Ok(refused) => {
                        tracing::warn!(index, %refused, "step refused");
                        report.rejected.push((index, refused));
                    }
                    Err(fatal) => return Err(fatal.context(format!("Step {index} failed"))),
                },
            }
        }
        Ok(report)
    }

    fn step<C: Clock>(
        &self,
        editor: &mut Editor<C>,
        step: &ScriptStep,
        report: &mut ScriptReport,
    ) -> Result<()> {
        match step {
            ScriptStep::Place {
                template,
                into,
                handle,
            } => {
                let target = resolve_target(editor, into, &report.handles)?;
                editor.start_drag(DragSource::Palette(template.clone()));
                let outcome = drop_on(editor, &target)?;
                if let (Some(handle), Some(id)) = (handle, placed_id(&outcome)) {
                    report.handles.insert(handle.clone(), id.to_string());
                }
                report.outcomes.push(outcome);
            }
            ScriptStep::Move { block, into } => {
                let id = lookup(&report.handles, block)?;
                let target = resolve_target(editor, into, &report.handles)?;
                editor.start_drag(DragSource::Workspace(id));
                let outcome = drop_on(editor, &target)?;
                report.outcomes.push(outcome);
            }
            ScriptStep::Delete { block } => {
                let id = lookup(&report.handles, block)?;
                editor.start_drag(DragSource::Workspace(id));
                let outcome = drop_on(editor, &DropTarget::Disposal)?;
                report.outcomes.push(outcome);
            }
            ScriptStep::Literal { block, slot, value } => {
                let id = lookup(&report.handles, block)?;
                editor
                    .set_literal(&id, *slot, value)
                    .map_err(StepError::from)?;
            }
            ScriptStep::Operator { block, operator } => {
                let id = lookup(&report.handles, block)?;
                editor
                    .set_operator(&id, operator.as_deref())
                    .map_err(StepError::from)?;
            }
            ScriptStep::Clear => {
                editor.clear(|| true);
            }
            ScriptStep::RemoveName { name } => {
                editor.remove_name(name);
            }
        }
        Ok(())
    }
}

fn drop_on<C: Clock>(editor: &mut Editor<C>, target: &DropTarget) -> Result<DropOutcome> {
    let layout = StackLayout::of(editor.tree(), ROW_HEIGHT);
    Ok(editor.drop(target, &layout).map_err(StepError::from)?)
}

fn placed_id(outcome: &DropOutcome) -> Option<&str> {
    match outcome {
        DropOutcome::Inserted { id, .. } | DropOutcome::Slotted { id, .. } => Some(id),
        DropOutcome::Deleted { .. } | DropOutcome::Ignored => None,
    }
}

fn lookup(handles: &HashMap<String, String>, handle: &str) -> Result<String> {
    match handles.get(handle) {
        Some(id) => Ok(id.clone()),
        None => bail!("unknown block handle `{handle}`"),
    }
}

/// Translate a script target into a pointer target over the stacked layout.
fn resolve_target<C: Clock>(
    editor: &Editor<C>,
    target: &ScriptTarget,
    handles: &HashMap<String, String>,
) -> Result<DropTarget> {
    let layout = StackLayout::of(editor.tree(), ROW_HEIGHT);
    Ok(match target {
        ScriptTarget::Workspace => DropTarget::Workspace {
            pointer_y: layout.pointer_below_all(),
        },
        ScriptTarget::Into(handle) => DropTarget::Block {
            block: lookup(handles, handle)?,
            pointer_y: layout.pointer_below_all(),
        },
        ScriptTarget::Before(handle) => {
            let id = lookup(handles, handle)?;
            let location = operations::locate(editor.tree(), &id)
                .with_context(|| format!("block `{handle}` is no longer placed"))?;
            let pointer_y = layout
                .pointer_before(&id)
                .unwrap_or_else(|| layout.pointer_below_all());
            match location.container {
                ContainerRef::Root => DropTarget::Workspace { pointer_y },
                ContainerRef::Children(parent) => DropTarget::Block {
                    block: parent,
                    pointer_y,
                },
                ContainerRef::Slot { .. } => bail!("block `{handle}` sits in a slot"),
            }
        }
        ScriptTarget::Slot { block, slot } => DropTarget::Slot {
            block: lookup(handles, block)?,
            slot: *slot,
        },
        ScriptTarget::Trash => DropTarget::Disposal,
        ScriptTarget::Outside => DropTarget::Outside,
    })
}
