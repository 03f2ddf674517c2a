//! Palette catalog of robot block templates.
//!
//! Each [`BlockTemplate`] describes one draggable palette entry: its id,
//! display label, [`BlockKind`] and the number of variables the executor
//! expects on the serialized node. The catalog is an explicit value passed
//! to the editor; [`BlockCatalog::robot_default`] builds the stock palette and
//! [`BlockCatalog::from_json`] loads a replacement.
//!
//! # Usage
//!
//! ```rust
//! use robolink_blocks::catalog::BlockCatalog;
//!
//! let catalog = BlockCatalog::robot_default();
//! let matches: Vec<_> = catalog.search("repeat").collect();
//! assert_eq!(matches[0].id, "block-repeat");
//! ```

use crate::model::{BlockInstance, BlockKind, Category, SlotContent, SlotSpec};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    /// Palette id; placed copies get `<id>-<millis>`.
    pub id: String,
    pub label: String,
    pub kind: BlockKind,
    /// Number of variables the executor expects on this block, if fixed.
    #[serde(default)]
    pub expected_vars: Option<usize>,
}

impl BlockTemplate {
    pub fn new(id: &str, label: &str, kind: BlockKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            expected_vars: None,
        }
    }

    pub fn expecting(mut self, vars: usize) -> Self {
        self.expected_vars = Some(vars);
        self
    }

    /// The read-only palette original.
    pub fn palette_block(&self) -> BlockInstance {
        BlockInstance {
            palette: true,
            ..self.instantiate(&self.id)
        }
    }

    /// Fresh workspace block with the given id. Shares nothing mutable with
    /// the template: the kind is deep-copied, slots start empty, and kinds
    /// that accept children get an empty children container.
    pub fn instantiate(&self, id: &str) -> BlockInstance {
        BlockInstance {
            id: id.to_string(),
            template_id: self.id.clone(),
            kind: self.kind.clone(),
            label: self.label.clone(),
            children: self.kind.accepts_children.then(Vec::new),
            slots: vec![SlotContent::Empty; self.kind.slots.len()],
            operator: None,
            palette: false,
        }
    }

    /// Case-insensitive substring match on id, label or category.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        self.id.to_lowercase().contains(&q)
            || self.label.to_lowercase().contains(&q)
            || self.kind.category.wire_name().contains(&q)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate template id `{0}`")]
    DuplicateTemplate(String),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Immutable set of palette templates, in palette order.
#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    templates: IndexMap<String, BlockTemplate>,
}

impl BlockCatalog {
    pub fn from_templates(
        templates: impl IntoIterator<Item = BlockTemplate>,
    ) -> Result<Self, CatalogError> {
        let mut map = IndexMap::new();
        for t in templates {
            if map.contains_key(&t.id) {
                return Err(CatalogError::DuplicateTemplate(t.id));
            }
            map.insert(t.id.clone(), t);
        }
        Ok(Self { templates: map })
    }

    /// Parse a JSON array of templates.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let templates: Vec<BlockTemplate> = serde_json::from_str(text)?;
        Self::from_templates(templates)
    }

    /// Load a JSON catalog file.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Read catalog {}", path))?;
        let catalog =
            Self::from_json(&text).with_context(|| format!("Failed to parse catalog {}", path))?;
        tracing::info!(templates = catalog.len(), %path, "loaded block catalog");
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&BlockTemplate> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockTemplate> {
        self.templates.values()
    }

    pub fn search<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a BlockTemplate> + 'a {
        self.iter().filter(move |t| t.matches_query(query))
    }

    /// Templates grouped by category, categories in first-seen order.
    pub fn by_category(&self) -> IndexMap<Category, Vec<&BlockTemplate>> {
        let mut out: IndexMap<Category, Vec<&BlockTemplate>> = IndexMap::new();
        for t in self.iter() {
            out.entry(t.kind.category).or_default().push(t);
        }
        out
    }

    /// Template a placed block was cloned from, recovered from its id
    /// (`<template>-<millis>`).
    pub fn template_for_instance(&self, instance_id: &str) -> Option<&BlockTemplate> {
        let (base, stamp) = instance_id.rsplit_once('-')?;
        if stamp.is_empty() || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.get(base)
    }

    /// The stock robot palette.
    pub fn robot_default() -> Self {
        let compare = ["==", "<=", ">=", "<", ">"];
        let arithmetic = [
            "+", "-", "*", "/", "pow", "sqrt", "mod", "and", "or", "xor", "not", "<<", ">>",
        ];

        let templates = vec![
            // ── Movement ─────────────────────────────────────────────────
            BlockTemplate::new(
                "block-steps-x",
                "move X by",
                BlockKind::new(Category::Move).with_slot(SlotSpec::value()),
            )
            .expecting(1),
            BlockTemplate::new(
                "block-steps-y",
                "move Y by",
                BlockKind::new(Category::Move).with_slot(SlotSpec::value()),
            )
            .expecting(1),
            BlockTemplate::new(
                "block-steps-z",
                "move Z by",
                BlockKind::new(Category::Move).with_slot(SlotSpec::value()),
            )
            .expecting(1),
            BlockTemplate::new(
                "block-reset",
                "reset position",
                BlockKind::new(Category::Move),
            )
            .expecting(0),
            BlockTemplate::new(
                "block-to-pos",
                "move to position",
                BlockKind::new(Category::Move).with_slot(SlotSpec::position()),
            )
            // the position's axes are copied onto the move
            .expecting(3),
            // ── Control ──────────────────────────────────────────────────
            BlockTemplate::new(
                "block-repeat",
                "repeat",
                BlockKind::new(Category::Control)
                    .with_children()
                    .with_slot(SlotSpec::value()),
            )
            .expecting(1),
            BlockTemplate::new(
                "block-if",
                "if",
                BlockKind::new(Category::Control)
                    .with_children()
                    .with_slot(SlotSpec::value())
                    .with_slot(SlotSpec::value())
                    .with_operators(&compare),
            )
            .expecting(2),
            // ── Events ───────────────────────────────────────────────────
            BlockTemplate::new("block-break", "break", BlockKind::new(Category::Event))
                .expecting(0),
            // ── Calculation ──────────────────────────────────────────────
            BlockTemplate::new(
                "block-calc",
                "calculate",
                BlockKind::new(Category::Calc)
                    .with_slot(SlotSpec::variable())
                    .with_slot(SlotSpec::value())
                    .with_slot(SlotSpec::value())
                    .with_operators(&arithmetic)
                    // the executor reads `{ } [` for `+ - *`
                    .with_wire_operators(&[("+", "{"), ("-", "}"), ("*", "[")]),
            )
            .expecting(3),
            // ── Time ─────────────────────────────────────────────────────
            BlockTemplate::new(
                "block-seconds",
                "wait seconds",
                BlockKind::new(Category::Time).with_slot(SlotSpec::value()),
            )
            .expecting(1),
            BlockTemplate::new(
                "block-minutes",
                "wait minutes",
                BlockKind::new(Category::Time).with_slot(SlotSpec::value()),
            )
            .expecting(1),
            // ── Measurement ──────────────────────────────────────────────
            BlockTemplate::new("block-measure", "measure", BlockKind::new(Category::Measure))
                .expecting(0),
            // ── Debug ────────────────────────────────────────────────────
            BlockTemplate::new(
                "block-print",
                "print",
                BlockKind::new(Category::Debug)
                    .with_slot(SlotSpec::variable())
                    .with_slot(SlotSpec::variable())
                    .with_slot(SlotSpec::variable()),
            ),
        ];

        // Stock ids are unique.
        Self {
            templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }
}
