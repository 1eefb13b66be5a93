//! Configuration types for stream stages

use serde::{Deserialize, Serialize};

/// Requested direction for an aggregate stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldDirection {
    /// `f(x1, f(x2, ... f(xn, iv)))`
    Right,
    /// `f(f(f(iv, x1), x2), ... xn)`
    Left,
}

/// Per-stage options for [`Stream`](crate::stream::Stream) and
/// [`StreamBuilder`](crate::builder::StreamBuilder) operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Id reported in errors from this stage. Generated when absent.
    pub node_id: Option<String>,
    /// Aggregate direction. Inferred from the aggregator when absent.
    pub fold: Option<FoldDirection>,
}

impl StageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stage id
    pub fn node_id(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }

    /// Set the aggregate direction
    pub fn fold(mut self, direction: FoldDirection) -> Self {
        self.fold = Some(direction);
        self
    }
}

impl From<&str> for StageConfig {
    fn from(id: &str) -> Self {
        StageConfig::new().node_id(id)
    }
}

impl From<String> for StageConfig {
    fn from(id: String) -> Self {
        StageConfig::new().node_id(id)
    }
}

impl From<FoldDirection> for StageConfig {
    fn from(direction: FoldDirection) -> Self {
        StageConfig::new().fold(direction)
    }
}
