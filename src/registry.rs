//! Tool registry adapter.
//!
//! Ensures every candidate descriptor has a corresponding registration in the
//! agent runtime before planning runs. Idempotent: an already-registered
//! descriptor passes through unchanged, a duplicate external key in one batch
//! produces exactly one creation call, and a failed registry read is never
//! mistaken for "tool does not exist".

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    error::ToolSyncResult,
    runtime::AgentRuntime,
    types::ToolDescriptor,
};

pub struct ToolRegistry {
    runtime: Arc<dyn AgentRuntime>,
}

impl ToolRegistry {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    /// Resolve a batch of candidates to registered descriptors. Per-tool
    /// failures are logged and dropped from the output; one bad tool never
    /// aborts the batch.
    pub async fn ensure_registered(
        &self,
        candidates: Vec<ToolDescriptor>,
    ) -> Vec<ToolDescriptor> {
        let mut registered = Vec::with_capacity(candidates.len());
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut seen_pending: HashSet<(String, String)> = HashSet::new();
        // One registry listing per originating server per batch. A fetch
        // failure is remembered and fails every candidate from that server.
        let mut listings: HashMap<String, Option<Vec<ToolDescriptor>>> = HashMap::new();

        for candidate in candidates {
            if candidate.is_registered() {
                if seen_ids.insert(candidate.tool_id.clone()) {
                    registered.push(candidate);
                } else {
                    debug!(tool_id = %candidate.tool_id, "Duplicate candidate in batch, skipping");
                }
                continue;
            }

            let Some(server) = candidate.source_server.clone() else {
                warn!(
                    name = %candidate.name,
                    "Candidate has no id and no originating server, cannot register"
                );
                continue;
            };

            let pending_key = (server.clone(), candidate.name.clone());
            if !seen_pending.insert(pending_key) {
                debug!(name = %candidate.name, server, "Duplicate unregistered candidate, skipping");
                continue;
            }

            let listing = match listings.entry(server.clone()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let fetched = match self.runtime.list_server_tools(&server).await {
                        Ok(tools) => Some(tools),
                        Err(err) => {
                            warn!(server, error = %err, "Registry listing failed");
                            None
                        }
                    };
                    e.insert(fetched)
                }
            };

            // A failed listing must fail the tool rather than fall through to
            // a creation call: a partial read does not mean "absent".
            let Some(listing) = listing else {
                warn!(
                    server,
                    name = %candidate.name,
                    "Registration skipped, tool unavailable this pass"
                );
                continue;
            };

            match self.ensure_one(&server, listing, candidate).await {
                Ok(tool) => {
                    if seen_ids.insert(tool.tool_id.clone()) {
                        registered.push(tool);
                    }
                }
                Err(e) => {
                    warn!(server, error = %e, "Registration failed, tool unavailable this pass");
                }
            }
        }

        registered
    }

    async fn ensure_one(
        &self,
        server: &str,
        listing: &[ToolDescriptor],
        candidate: ToolDescriptor,
    ) -> ToolSyncResult<ToolDescriptor> {
        if let Some(existing) = listing
            .iter()
            .find(|t| t.is_registered() && t.name == candidate.name)
        {
            debug!(name = %candidate.name, tool_id = %existing.tool_id, "Already registered");
            return Ok(existing.clone().with_score_from(&candidate));
        }

        let tool = self.runtime.register_tool(server, &candidate.name).await?;
        info!(name = %candidate.name, server, tool_id = %tool.tool_id, "Registered tool");
        Ok(tool.with_score_from(&candidate))
    }
}

trait ScoreCarry {
    fn with_score_from(self, candidate: &ToolDescriptor) -> Self;
}

impl ScoreCarry for ToolDescriptor {
    /// Registration responses do not echo relevance; carry the candidate's
    /// ranking through so the result can report match scores.
    fn with_score_from(mut self, candidate: &ToolDescriptor) -> Self {
        if self.score.is_none() {
            self.score = candidate.score;
        }
        self
    }
}
