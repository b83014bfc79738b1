//! Core types for tool set reconciliation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Origin of a tool attachment, governing eligibility for automatic
/// detachment. Only externally-managed (MCP-hosted) tools are ever detached
/// by reconciliation; statically configured tools are never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolOrigin {
    ExternalMcp,
    Static,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A tool descriptor as known to the candidate source and the runtime
/// registry. `tool_id` is the stable external identity: re-registration with
/// the same source resolves to the same id, never a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub tool_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub origin: ToolOrigin,
    /// Originating MCP server, required for registration of unknown tools.
    #[serde(default)]
    pub source_server: Option<String>,
    /// Relevance score from the candidate source, when ranked.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ToolDescriptor {
    pub fn new(tool_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            description: String::new(),
            origin: ToolOrigin::ExternalMcp,
            source_server: None,
            score: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: ToolOrigin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn with_source_server(mut self, server: impl Into<String>) -> Self {
        self.source_server = Some(server.into());
        self
    }

    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Whether this descriptor carries a runtime registration id.
    pub fn is_registered(&self) -> bool {
        !self.tool_id.is_empty()
    }
}

/// A live (agent, tool) attachment as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedToolRef {
    pub agent_id: String,
    pub tool_id: String,
    pub name: String,
    pub origin: ToolOrigin,
}

impl AttachedToolRef {
    pub fn new(
        agent_id: impl Into<String>,
        tool_id: impl Into<String>,
        name: impl Into<String>,
        origin: ToolOrigin,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            tool_id: tool_id.into(),
            name: name.into(),
            origin,
        }
    }
}

/// Tool ids protected from detachment for one reconciliation pass.
/// Supplied per request, never persisted.
pub type KeepSet = HashSet<String>;

/// The diff a reconciliation pass executes: detachments first, then
/// attachments. The two sets are disjoint by construction; a tool that is
/// both attached and desired appears in neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationPlan {
    pub detach: Vec<AttachedToolRef>,
    pub attach: Vec<ToolDescriptor>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.detach.is_empty() && self.attach.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Attach,
    Detach,
}

/// Result of one attach/detach operation, after all retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub tool_id: String,
    pub name: String,
    pub kind: OperationKind,
    pub success: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Match score carried through from the candidate source, for attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl OperationOutcome {
    pub fn success(
        tool_id: impl Into<String>,
        name: impl Into<String>,
        kind: OperationKind,
        attempts: u32,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            kind,
            success: true,
            attempts,
            error: None,
            score: None,
        }
    }

    pub fn failure(
        tool_id: impl Into<String>,
        name: impl Into<String>,
        kind: OperationKind,
        attempts: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            kind,
            success: false,
            attempts,
            error: Some(error.into()),
            score: None,
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }
}

/// The sole externally observable output of a reconciliation pass.
/// Fully reconstructable from the individual operation outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub agent_id: String,
    /// Candidates returned by search.
    pub processed_count: usize,
    /// Candidates that survived registration and entered planning.
    pub passed_filter_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub detached_tools: Vec<String>,
    pub failed_detachments: Vec<OperationOutcome>,
    pub successful_attachments: Vec<OperationOutcome>,
    pub failed_attachments: Vec<OperationOutcome>,
    /// Keep-list tool ids left untouched this pass.
    pub preserved_tools: Vec<String>,
}

/// Outcome of one sync pass over the full tool inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Obsolete index entries removed (inventory no longer lists them).
    pub removed: usize,
    pub failed_tools: Vec<String>,
}
