//! Search index boundary.
//!
//! The vector index that backs candidate search. The sync reconciler writes
//! through this seam; ranking itself lives on the other side of it.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{error::ToolSyncResult, types::ToolDescriptor};

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Content fingerprints of every indexed tool, keyed by tool id.
    /// Drives the upsert/skip decision in a sync pass.
    async fn list_fingerprints(&self) -> ToolSyncResult<HashMap<String, String>>;

    /// Insert or replace the index entry for a tool.
    async fn upsert(&self, descriptor: &ToolDescriptor, fingerprint: &str) -> ToolSyncResult<()>;

    /// Remove an index entry whose tool no longer exists in the registry.
    async fn remove(&self, tool_id: &str) -> ToolSyncResult<()>;
}
