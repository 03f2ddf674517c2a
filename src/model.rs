use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Block kinds
// ────────────────────────────────────────────────────────────────────────────

/// Category of a block. Decides which slots accept it and how the executor
/// interprets the serialized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Move,
    Control,
    Event,
    Variable,
    Calc,
    Time,
    Measure,
    Pos,
    Debug,
}

impl Category {
    /// Type string expected by the executor in [`ProgramNode::node_type`].
    ///
    /// The executor matches `block-controll` literally, so the spelling is
    /// part of the wire contract.
    pub fn wire_name(self) -> &'static str {
        match self {
            Category::Move => "block-move",
            Category::Control => "block-controll",
            Category::Event => "block-event",
            Category::Variable => "block-variable",
            Category::Calc => "block-calc",
            Category::Time => "block-time",
            Category::Measure => "block-measure",
            Category::Pos => "block-pos",
            Category::Debug => "block-debug",
        }
    }
}

/// A typed single-occupant slot on a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Display name (position blocks use `X`, `Y`, `Z`).
    #[serde(default)]
    pub name: Option<String>,
    /// Block categories that may be dropped into the slot.
    #[serde(default)]
    pub accepts: Vec<Category>,
    /// Whether the slot can hold a raw numeric input instead of a block.
    #[serde(default)]
    pub literal: bool,
}

impl SlotSpec {
    pub fn accepts(&self, category: Category) -> bool {
        self.accepts.contains(&category)
    }

    /// Slot accepting a bound variable or a typed number.
    pub fn value() -> Self {
        Self {
            name: None,
            accepts: vec![Category::Variable],
            literal: true,
        }
    }

    /// Like [`SlotSpec::value`] but with a display name.
    pub fn named_value(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::value()
        }
    }

    /// Slot accepting only a bound variable.
    pub fn variable() -> Self {
        Self {
            name: None,
            accepts: vec![Category::Variable],
            literal: false,
        }
    }

    /// Slot accepting only a position block.
    pub fn position() -> Self {
        Self {
            name: None,
            accepts: vec![Category::Pos],
            literal: false,
        }
    }
}

/// Shape of a block: category, whether it nests children, and its slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockKind {
    pub category: Category,
    #[serde(default)]
    pub accepts_children: bool,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
    /// Operator tokens selectable on the block (calc and comparison blocks).
    #[serde(default)]
    pub operators: Vec<String>,
    /// Token the executor reads for an operator, where it differs from the
    /// displayed one.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub wire_operators: IndexMap<String, String>,
}

impl BlockKind {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            accepts_children: false,
            slots: Vec::new(),
            operators: Vec::new(),
            wire_operators: IndexMap::new(),
        }
    }

    pub fn with_children(mut self) -> Self {
        self.accepts_children = true;
        self
    }

    pub fn with_slot(mut self, slot: SlotSpec) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn with_operators(mut self, ops: &[&str]) -> Self {
        self.operators = ops.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Map displayed operators to the tokens the executor reads.
    pub fn with_wire_operators(mut self, pairs: &[(&str, &str)]) -> Self {
        self.wire_operators = pairs
            .iter()
            .map(|(shown, wire)| (shown.to_string(), wire.to_string()))
            .collect();
        self
    }

    /// Executor token for `op`.
    pub fn wire_operator<'a>(&'a self, op: &'a str) -> &'a str {
        self.wire_operators.get(op).map_or(op, String::as_str)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block instances
// ────────────────────────────────────────────────────────────────────────────

/// Content of a slot on a placed block.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SlotContent {
    #[default]
    Empty,
    /// Raw value typed into the slot.
    Literal(String),
    Block(Box<BlockInstance>),
}

impl SlotContent {
    pub fn block(&self) -> Option<&BlockInstance> {
        match self {
            SlotContent::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SlotContent::Empty)
    }
}

/// A block placed in the workspace (or, with `palette` set, a palette original).
///
/// Blocks own their children and slot occupants. The container holding a
/// block is found with [`crate::editor::operations::locate`] rather than
/// stored on the block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    pub id: String,
    /// Palette template this block was cloned from.
    pub template_id: String,
    pub kind: BlockKind,
    pub label: String,
    /// Present iff `kind.accepts_children`.
    pub children: Option<Vec<BlockInstance>>,
    /// One entry per `kind.slots`.
    pub slots: Vec<SlotContent>,
    /// Selected operator token, if the kind has operators.
    pub operator: Option<String>,
    /// True only for read-only palette originals.
    pub palette: bool,
}

impl BlockInstance {
    pub fn category(&self) -> Category {
        self.kind.category
    }

    /// Display text with the selected operator appended.
    pub fn text(&self) -> String {
        match &self.operator {
            Some(op) if !op.is_empty() => format!("{} {}", self.label, op),
            _ => self.label.clone(),
        }
    }

    /// Text as the executor reads it: like [`BlockInstance::text`] but with
    /// the operator's wire token.
    pub fn wire_text(&self) -> String {
        match &self.operator {
            Some(op) if !op.is_empty() => {
                format!("{} {}", self.label, self.kind.wire_operator(op))
            }
            _ => self.label.clone(),
        }
    }

    /// True if `id` names this block or any block beneath it.
    pub fn contains(&self, id: &str) -> bool {
        if self.id == id {
            return true;
        }
        self.children
            .iter()
            .flatten()
            .any(|c| c.contains(id))
            || self
                .slots
                .iter()
                .filter_map(SlotContent::block)
                .any(|b| b.contains(id))
    }

    /// Number of blocks in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(BlockInstance::subtree_len)
            .sum::<usize>()
            + self
                .slots
                .iter()
                .filter_map(SlotContent::block)
                .map(BlockInstance::subtree_len)
                .sum::<usize>()
    }
}

/// The editable forest of placed blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkspaceTree {
    pub top_level: Vec<BlockInstance>,
}

impl WorkspaceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    /// Total number of placed blocks at any depth.
    pub fn block_count(&self) -> usize {
        self.top_level.iter().map(BlockInstance::subtree_len).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Program tree
// ────────────────────────────────────────────────────────────────────────────

/// A variable reference attached to a serialized node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramVariable {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub value: Option<String>,
}

/// Executor-facing node. Pure data; children are owned copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub text: String,
    #[serde(default)]
    pub variables: Vec<ProgramVariable>,
    #[serde(default)]
    pub children: Vec<ProgramNode>,
}

impl ProgramNode {
    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&ProgramNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}
