//! Reconciliation orchestration.
//!
//! Wires search, registration, state reading, planning, and execution into
//! the single `reconcile` entry point. All state is per-pass: attachment
//! truth is fetched fresh from the runtime on every call and never cached
//! across calls. Passes for different agents are fully independent.

use std::{collections::HashSet, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::ToolSyncConfig,
    error::{ToolSyncError, ToolSyncResult},
    executor::ExecutionEngine,
    index::SearchIndex,
    planner,
    registry::ToolRegistry,
    runtime::AgentRuntime,
    search::{CachedCandidateSource, CandidateSource},
    state::AttachmentStateReader,
    sync::SyncReconciler,
    types::{KeepSet, ReconciliationResult, SyncReport},
};

pub struct ToolSyncService {
    search: Arc<dyn CandidateSource>,
    registry: ToolRegistry,
    reader: AttachmentStateReader,
    executor: ExecutionEngine,
    syncer: SyncReconciler,
    default_limit: usize,
}

impl ToolSyncService {
    pub fn new(
        config: &ToolSyncConfig,
        runtime: Arc<dyn AgentRuntime>,
        search: Arc<dyn CandidateSource>,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        let search: Arc<dyn CandidateSource> = if config.search_cache.enabled {
            Arc::new(CachedCandidateSource::new(search, config.search_cache.ttl()))
        } else {
            search
        };

        Self {
            search,
            registry: ToolRegistry::new(Arc::clone(&runtime)),
            reader: AttachmentStateReader::new(Arc::clone(&runtime)),
            executor: ExecutionEngine::new(Arc::clone(&runtime), &config.reconcile),
            syncer: SyncReconciler::new(runtime, index),
            default_limit: config.reconcile.default_limit,
        }
    }

    /// One reconciliation pass: search, register, read state, plan, execute.
    pub async fn reconcile(
        &self,
        agent_id: &str,
        query: &str,
        limit: Option<usize>,
        keep_tools: Vec<String>,
    ) -> ToolSyncResult<ReconciliationResult> {
        self.reconcile_with_cancel(agent_id, query, limit, keep_tools, &CancellationToken::new())
            .await
    }

    /// Like [`reconcile`](Self::reconcile), abandoning further plan execution
    /// once `cancel` fires and returning the partial result accumulated so
    /// far. Already-issued runtime mutations are not rolled back.
    pub async fn reconcile_with_cancel(
        &self,
        agent_id: &str,
        query: &str,
        limit: Option<usize>,
        keep_tools: Vec<String>,
        cancel: &CancellationToken,
    ) -> ToolSyncResult<ReconciliationResult> {
        let limit = limit.unwrap_or(self.default_limit);
        info!(agent_id, query, limit, keep = keep_tools.len(), "Reconciliation pass started");

        let candidates = self.search.search(query, limit).await.map_err(|e| match e {
            e @ ToolSyncError::SearchFailed(_) => e,
            other => ToolSyncError::SearchFailed(other.to_string()),
        })?;
        let processed_count = candidates.len();
        if candidates.is_empty() {
            warn!(agent_id, query, "Search returned no candidates; stale tools will be cleared");
        }

        let desired = self.registry.ensure_registered(candidates).await;
        let passed_filter_count = desired.len();

        // Ids known to belong to the external registry this pass; used to
        // conservatively classify attachments whose origin tag is missing.
        let known_external_ids: HashSet<String> =
            desired.iter().map(|t| t.tool_id.clone()).collect();

        // Fatal on failure, before any mutation is attempted.
        let current = self
            .reader
            .current_attachments(agent_id, &known_external_ids)
            .await?;

        let keep: KeepSet = keep_tools.iter().cloned().collect();
        let plan = planner::plan(&current, &keep, &desired);

        let mut result = self.executor.execute(agent_id, plan, cancel).await;
        result.processed_count = processed_count;
        result.passed_filter_count = passed_filter_count;
        result.preserved_tools = keep_tools;

        info!(
            agent_id,
            processed = result.processed_count,
            attached = result.success_count,
            detached = result.detached_tools.len(),
            failed = result.failure_count + result.failed_detachments.len(),
            "Reconciliation pass finished"
        );
        Ok(result)
    }

    /// One sync pass over the full tool inventory (see [`SyncReconciler`]).
    pub async fn sync_index(&self) -> ToolSyncResult<SyncReport> {
        self.syncer.sync_index().await
    }
}
