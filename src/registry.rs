//! Registry of reserved identifiers: built-in axes, user variables and
//! positions.
//!
//! Names share one namespace across variables and positions. Every entry also
//! backs a palette template (`block-get-<name>-pos`) that the user drags into
//! slots, so [`VariableRegistry::palette_template`] is the registry half of
//! the palette next to [`crate::catalog::BlockCatalog`].

use crate::catalog::BlockTemplate;
use crate::clock::{Clock, Entropy, synthesize_name};
use crate::model::{BlockKind, Category, SlotSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Limits and built-ins for a [`VariableRegistry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum name length in characters.
    pub max_name_len: usize,
    /// Substrings that may not appear in a name.
    pub forbidden: Vec<String>,
    /// Variables present from the start (robot axes).
    pub builtin_variables: Vec<String>,
    /// Positions present from the start.
    pub builtin_positions: Vec<String>,
    /// Names that are taken but have no entry.
    pub reserved: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            max_name_len: 20,
            forbidden: list(&[
                "{", "}", "[", "]", "/", "%", "&", "|", " ", "^", "~", "<<", ">>", "==", "<=",
                ">=", "<", ">", "=", ",", ";", ".",
            ]),
            builtin_variables: list(&["X", "Y", "Z"]),
            builtin_positions: list(&["p1", "p2", "p3"]),
            reserved: list(&["x", "y", "z"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name `{name}` is longer than {max} characters")]
    TooLong { name: String, max: usize },
    #[error("name `{name}` contains forbidden sequence `{token}`")]
    ForbiddenChar { name: String, token: String },
    #[error("name `{0}` already exists")]
    Duplicate(String),
    #[error("name must not be empty")]
    Empty,
    #[error("no variable named `{0}`")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Variable,
    Position,
}

/// One row of the variables or positions list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    /// Current value; unset for positions and robot axes.
    pub value: Option<String>,
    /// Id of the palette block that represents this entry.
    pub source_block_id: String,
    pub kind: EntryKind,
    /// Built-ins cannot be removed.
    #[serde(default)]
    pub builtin: bool,
}

/// Palette id of the block representing `name`.
pub fn palette_id_for(name: &str) -> String {
    format!("block-get-{name}-pos")
}

#[derive(Debug, Clone)]
pub struct VariableRegistry {
    config: RegistryConfig,
    entries: IndexMap<String, VariableEntry>,
    /// Taken names without an entry: configured reservations and synthetic names.
    reserved: BTreeSet<String>,
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl VariableRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let mut entries = IndexMap::new();
        let builtins = config
            .builtin_variables
            .iter()
            .map(|n| (n, EntryKind::Variable))
            .chain(config.builtin_positions.iter().map(|n| (n, EntryKind::Position)));
        for (name, kind) in builtins {
            entries.insert(
                name.clone(),
                VariableEntry {
                    name: name.clone(),
                    value: None,
                    source_block_id: palette_id_for(name),
                    kind,
                    builtin: true,
                },
            );
        }
        let reserved = config.reserved.iter().cloned().collect();
        Self {
            config,
            entries,
            reserved,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Check a name against the length, character and uniqueness rules
    /// without reserving it.
    pub fn validate(&self, name: &str) -> Result<(), NameError> {
        if name.chars().count() > self.config.max_name_len {
            return Err(NameError::TooLong {
                name: name.to_string(),
                max: self.config.max_name_len,
            });
        }
        if let Some(token) = self.config.forbidden.iter().find(|t| name.contains(t.as_str())) {
            return Err(NameError::ForbiddenChar {
                name: name.to_string(),
                token: token.clone(),
            });
        }
        if self.is_reserved(name) {
            return Err(NameError::Duplicate(name.to_string()));
        }
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        Ok(())
    }

    /// Reserve `name` and append its entry. Variables start at `"0"`,
    /// positions start unset.
    pub fn add_name(&mut self, name: &str, kind: EntryKind) -> Result<&VariableEntry, NameError> {
        if let Err(err) = self.validate(name) {
            tracing::warn!(%name, %err, "rejected name");
            return Err(err);
        }
        let value = match kind {
            EntryKind::Variable => Some("0".to_string()),
            EntryKind::Position => None,
        };
        tracing::info!(%name, ?kind, "registered name");
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert(VariableEntry {
                name: name.to_string(),
                value,
                source_block_id: palette_id_for(name),
                kind,
                builtin: false,
            });
        Ok(entry)
    }

    /// Release `name`. Unknown names and built-ins are left alone.
    pub fn remove_name(&mut self, name: &str) -> Option<VariableEntry> {
        match self.entries.get(name) {
            Some(entry) if entry.builtin => {
                tracing::debug!(%name, "built-in names cannot be removed");
                None
            }
            Some(_) => {
                tracing::info!(%name, "removed name");
                self.entries.shift_remove(name)
            }
            None => {
                // Synthetic names may be released, configured reservations stay.
                if !self.config.reserved.iter().any(|r| r == name) {
                    self.reserved.remove(name);
                }
                None
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&VariableEntry> {
        self.entries.get(name)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.entries.contains_key(name) || self.reserved.contains(name)
    }

    /// Update the stored value of an entry.
    pub fn set_value(&mut self, name: &str, value: Option<String>) -> Result<(), NameError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| NameError::Unknown(name.to_string()))?;
        entry.value = value;
        Ok(())
    }

    /// Entries in registration order, built-ins first.
    pub fn entries(&self) -> impl Iterator<Item = &VariableEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reserve and return a fresh `var<timestamp>` name.
    pub fn fresh_synthetic_name(&mut self, clock: &impl Clock) -> String {
        let now = clock.now_millis();
        let mut entropy = Entropy::seeded(now);
        let name = synthesize_name(now, &mut entropy, |n| self.is_reserved(n));
        self.reserved.insert(name.clone());
        name
    }

    /// Palette template for the entry whose palette block has `id`.
    pub fn palette_template(&self, id: &str) -> Option<BlockTemplate> {
        self.entries
            .values()
            .find(|e| e.source_block_id == id)
            .map(entry_template)
    }

    pub fn palette_templates(&self) -> impl Iterator<Item = BlockTemplate> + '_ {
        self.entries.values().map(entry_template)
    }
}

fn entry_template(entry: &VariableEntry) -> BlockTemplate {
    let kind = match entry.kind {
        EntryKind::Variable => BlockKind::new(Category::Variable),
        EntryKind::Position => BlockKind::new(Category::Pos)
            .with_slot(SlotSpec::named_value("X"))
            .with_slot(SlotSpec::named_value("Y"))
            .with_slot(SlotSpec::named_value("Z")),
    };
    let template = BlockTemplate::new(&entry.source_block_id, &entry.name, kind);
    match entry.kind {
        EntryKind::Variable => template,
        EntryKind::Position => template.expecting(3),
    }
}
