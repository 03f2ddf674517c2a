use crate::model::ProgramNode;

pub const CONTENT_TYPE: &str = "application/json";

/// POST payload for the executor: a JSON array of program nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSubmission {
    pub endpoint: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ProgramSubmission {
    pub fn new(endpoint: &str, nodes: &[ProgramNode]) -> serde_json::Result<Self> {
        let body = serde_json::to_string(nodes)?;
        tracing::debug!(%endpoint, bytes = body.len(), "prepared submission");
        Ok(Self {
            endpoint: endpoint.to_string(),
            content_type: CONTENT_TYPE,
            body,
        })
    }

    /// Decode the body back into nodes.
    pub fn nodes(&self) -> serde_json::Result<Vec<ProgramNode>> {
        serde_json::from_str(&self.body)
    }

    pub fn headers(&self) -> [(&'static str, &'static str); 1] {
        [("Content-Type", self.content_type)]
    }
}
