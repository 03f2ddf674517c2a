//! Messages pushed back by the executor while a program runs.
//!
//! Each message arrives as a JSON object tagged by its `event` name:
//!
//! ```
//! use robolink_blocks::feedback::ExecutionFeedback;
//!
//! let msg = ExecutionFeedback::parse(
//!     r#"{"event":"execution_error","error":"bad value","block_id":"block-steps-x-1","error_code":"ExpectVariableError"}"#,
//! )
//! .unwrap();
//! assert_eq!(msg.block_id(), Some("block-steps-x-1"));
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionFeedback {
    /// A block failed. `block_id` is absent for internal errors.
    ExecutionError {
        error: String,
        #[serde(default)]
        block_id: Option<String>,
        #[serde(default)]
        error_code: Option<String>,
    },
    /// Free-form progress output (`print` blocks and the like).
    Update {
        data: String,
        #[serde(default)]
        error_code: Option<String>,
    },
    /// Current robot coordinates, see [`Coords`].
    Coords { data: String },
}

impl ExecutionFeedback {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Block the message is about, if any.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::ExecutionError { block_id, .. } => block_id.as_deref(),
            _ => None,
        }
    }

    /// Parsed coordinates of a `coords` message.
    pub fn coords(&self) -> Option<Result<Coords, CoordsError>> {
        match self {
            Self::Coords { data } => Some(data.parse()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordsError {
    #[error("expected three comma separated values, got {0}")]
    Count(usize),
    #[error("invalid coordinate `{0}`")]
    Value(String),
}

impl FromStr for Coords {
    type Err = CoordsError;

    /// Accepts `1,2,3` as well as the labelled `X: 1, Y: 2, Z: 3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(',').collect();
        if parts.len() != 3 {
            return Err(CoordsError::Count(parts.len()));
        }
        let mut values = [0.0; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            let raw = part.rsplit(':').next().unwrap_or(part).trim();
            *slot = raw
                .parse()
                .map_err(|_| CoordsError::Value(part.trim().to_string()))?;
        }
        let [x, y, z] = values;
        Ok(Coords { x, y, z })
    }
}
