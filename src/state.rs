//! Attachment state reader.
//!
//! Fetches the agent's live tool set fresh on every pass and narrows it to
//! the attachments reconciliation is allowed to manage. A failed read is
//! fatal to the pass: planning against partial state risks detaching tools
//! that should have been kept.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    error::{ToolSyncError, ToolSyncResult},
    runtime::AgentRuntime,
    types::{AttachedToolRef, ToolOrigin},
};

pub struct AttachmentStateReader {
    runtime: Arc<dyn AgentRuntime>,
}

impl AttachmentStateReader {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    /// Externally-managed attachments currently on the agent, deduplicated
    /// by tool id.
    ///
    /// Origin handling is conservative: `ExternalMcp` qualifies outright,
    /// `Unknown` qualifies only when the id appears in `known_external_ids`,
    /// and `Static` is never eligible for automatic detachment.
    pub async fn current_attachments(
        &self,
        agent_id: &str,
        known_external_ids: &HashSet<String>,
    ) -> ToolSyncResult<Vec<AttachedToolRef>> {
        let all = self
            .runtime
            .list_agent_tools(agent_id)
            .await
            .map_err(|e| ToolSyncError::StateUnavailable(e.to_string()))?;

        let total = all.len();
        let mut seen = HashSet::new();
        let mut managed = Vec::new();

        for tool in all {
            let eligible = match tool.origin {
                ToolOrigin::ExternalMcp => true,
                ToolOrigin::Unknown => {
                    let known = known_external_ids.contains(&tool.tool_id);
                    if !known {
                        warn!(
                            agent_id,
                            tool_id = %tool.tool_id,
                            "Attachment with unknown origin left untouched"
                        );
                    }
                    known
                }
                ToolOrigin::Static => false,
            };

            if !eligible {
                continue;
            }

            if seen.insert(tool.tool_id.clone()) {
                managed.push(tool);
            } else {
                debug!(agent_id, tool_id = %tool.tool_id, "Duplicate attachment listing, deduplicated");
            }
        }

        info!(
            agent_id,
            total,
            externally_managed = managed.len(),
            "Fetched attachment state"
        );
        Ok(managed)
    }
}
