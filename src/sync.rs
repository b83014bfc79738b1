//! Search-index synchronization.
//!
//! Mirrors the runtime's full tool inventory into the search index on a
//! content-fingerprint basis: unchanged tools are skipped, new or changed
//! tools are upserted, and index entries whose tool no longer exists are
//! removed. The index is derived data; the runtime inventory is the source
//! of truth and the pass can always be re-run to converge.

use std::{collections::HashSet, sync::Arc};

use tracing::{info, warn};

use crate::{
    error::{ToolSyncError, ToolSyncResult},
    index::SearchIndex,
    runtime::AgentRuntime,
    types::{SyncReport, ToolDescriptor, ToolOrigin},
};

/// Field separator for fingerprint input. Unit-separator keeps adjacent
/// fields from colliding ("ab" + "c" vs "a" + "bc").
const FIELD_SEP: u8 = 0x1f;

pub struct SyncReconciler {
    runtime: Arc<dyn AgentRuntime>,
    index: Arc<dyn SearchIndex>,
}

impl SyncReconciler {
    pub fn new(runtime: Arc<dyn AgentRuntime>, index: Arc<dyn SearchIndex>) -> Self {
        Self { runtime, index }
    }

    /// One full sync pass. Per-tool index write failures are recorded in the
    /// report and do not stop the pass; only an unreadable inventory or an
    /// unreadable index aborts it.
    pub async fn sync_index(&self) -> ToolSyncResult<SyncReport> {
        let inventory = self
            .runtime
            .list_all_tools()
            .await
            .map_err(|e| ToolSyncError::StateUnavailable(format!("tool inventory: {e}")))?;
        let indexed = self.index.list_fingerprints().await?;

        info!(
            inventory = inventory.len(),
            indexed = indexed.len(),
            "Index sync pass started"
        );

        let mut report = SyncReport::default();
        let mut live_ids: HashSet<&str> = HashSet::with_capacity(inventory.len());

        for tool in &inventory {
            if !tool.is_registered() {
                warn!(name = %tool.name, "Inventory entry without id skipped");
                continue;
            }
            live_ids.insert(tool.tool_id.as_str());

            let fp = fingerprint(tool);
            if indexed.get(&tool.tool_id).map(String::as_str) == Some(fp.as_str()) {
                report.skipped += 1;
                continue;
            }

            match self.index.upsert(tool, &fp).await {
                Ok(()) => report.uploaded += 1,
                Err(e) => {
                    warn!(tool_id = %tool.tool_id, error = %e, "Index upsert failed");
                    report.failed += 1;
                    report.failed_tools.push(tool.name.clone());
                }
            }
        }

        for stale_id in indexed.keys().filter(|id| !live_ids.contains(id.as_str())) {
            match self.index.remove(stale_id).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(tool_id = %stale_id, error = %e, "Index removal failed");
                    report.failed += 1;
                    report.failed_tools.push(stale_id.clone());
                }
            }
        }

        info!(
            uploaded = report.uploaded,
            skipped = report.skipped,
            removed = report.removed,
            failed = report.failed,
            "Index sync pass finished"
        );
        Ok(report)
    }
}

/// Content fingerprint of a descriptor. Any change to the indexed fields
/// produces a new fingerprint; the relevance score is deliberately excluded
/// since it is query-dependent, not part of the tool's identity.
pub fn fingerprint(tool: &ToolDescriptor) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(tool.tool_id.as_bytes());
    hasher.update(&[FIELD_SEP]);
    hasher.update(tool.name.as_bytes());
    hasher.update(&[FIELD_SEP]);
    hasher.update(tool.description.as_bytes());
    hasher.update(&[FIELD_SEP]);
    hasher.update(origin_tag(tool.origin).as_bytes());
    hasher.update(&[FIELD_SEP]);
    hasher.update(tool.source_server.as_deref().unwrap_or("").as_bytes());
    for tag in &tool.tags {
        hasher.update(&[FIELD_SEP]);
        hasher.update(tag.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn origin_tag(origin: ToolOrigin) -> &'static str {
    match origin {
        ToolOrigin::ExternalMcp => "external_mcp",
        ToolOrigin::Static => "static",
        ToolOrigin::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
    };

    use async_trait::async_trait;

    use super::*;
    use crate::types::AttachedToolRef;

    struct InventoryRuntime {
        tools: Vec<ToolDescriptor>,
    }

    #[async_trait]
    impl AgentRuntime for InventoryRuntime {
        async fn list_agent_tools(&self, _: &str) -> ToolSyncResult<Vec<AttachedToolRef>> {
            Ok(Vec::new())
        }

        async fn list_server_tools(&self, _: &str) -> ToolSyncResult<Vec<ToolDescriptor>> {
            Ok(Vec::new())
        }

        async fn register_tool(&self, _: &str, name: &str) -> ToolSyncResult<ToolDescriptor> {
            Ok(ToolDescriptor::new("unused", name))
        }

        async fn attach_tool(&self, _: &str, _: &str) -> ToolSyncResult<()> {
            Ok(())
        }

        async fn detach_tool(&self, _: &str, _: &str) -> ToolSyncResult<()> {
            Ok(())
        }

        async fn list_all_tools(&self) -> ToolSyncResult<Vec<ToolDescriptor>> {
            Ok(self.tools.clone())
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        fingerprints: Mutex<HashMap<String, String>>,
        fail_upserts: AtomicBool,
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn list_fingerprints(&self) -> ToolSyncResult<HashMap<String, String>> {
            Ok(self.fingerprints.lock().unwrap().clone())
        }

        async fn upsert(&self, tool: &ToolDescriptor, fp: &str) -> ToolSyncResult<()> {
            if self.fail_upserts.load(Ordering::SeqCst) {
                return Err(ToolSyncError::IndexWrite {
                    tool: tool.name.clone(),
                    cause: "store rejected write".to_string(),
                });
            }
            self.fingerprints
                .lock()
                .unwrap()
                .insert(tool.tool_id.clone(), fp.to_string());
            Ok(())
        }

        async fn remove(&self, tool_id: &str) -> ToolSyncResult<()> {
            self.fingerprints.lock().unwrap().remove(tool_id);
            Ok(())
        }
    }

    fn tool(id: &str, name: &str) -> ToolDescriptor {
        ToolDescriptor::new(id, name).with_description("does things")
    }

    #[tokio::test]
    async fn test_initial_sync_uploads_everything() {
        let runtime = Arc::new(InventoryRuntime {
            tools: vec![tool("t1", "alpha"), tool("t2", "beta")],
        });
        let index = Arc::new(RecordingIndex::default());
        let syncer = SyncReconciler::new(runtime, index.clone());

        let report = syncer.sync_index().await.unwrap();
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(index.fingerprints.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_inventory_is_all_skips() {
        let runtime = Arc::new(InventoryRuntime {
            tools: vec![tool("t1", "alpha"), tool("t2", "beta")],
        });
        let index = Arc::new(RecordingIndex::default());
        let syncer = SyncReconciler::new(runtime, index.clone());

        syncer.sync_index().await.unwrap();
        let report = syncer.sync_index().await.unwrap();
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_changed_description_reuploads_one() {
        let index = Arc::new(RecordingIndex::default());
        let syncer = SyncReconciler::new(
            Arc::new(InventoryRuntime {
                tools: vec![tool("t1", "alpha"), tool("t2", "beta")],
            }),
            index.clone(),
        );
        syncer.sync_index().await.unwrap();

        let changed = SyncReconciler::new(
            Arc::new(InventoryRuntime {
                tools: vec![
                    tool("t1", "alpha").with_description("does new things"),
                    tool("t2", "beta"),
                ],
            }),
            index.clone(),
        );
        let report = changed.sync_index().await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_obsolete_entries_are_removed() {
        let index = Arc::new(RecordingIndex::default());
        let full = SyncReconciler::new(
            Arc::new(InventoryRuntime {
                tools: vec![tool("t1", "alpha"), tool("t2", "beta")],
            }),
            index.clone(),
        );
        full.sync_index().await.unwrap();

        let shrunk = SyncReconciler::new(
            Arc::new(InventoryRuntime {
                tools: vec![tool("t1", "alpha")],
            }),
            index.clone(),
        );
        let report = shrunk.sync_index().await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.skipped, 1);
        assert!(!index.fingerprints.lock().unwrap().contains_key("t2"));
    }

    #[tokio::test]
    async fn test_upsert_failure_does_not_stop_pass() {
        let runtime = Arc::new(InventoryRuntime {
            tools: vec![tool("t1", "alpha"), tool("t2", "beta")],
        });
        let index = Arc::new(RecordingIndex::default());
        index.fail_upserts.store(true, Ordering::SeqCst);
        let syncer = SyncReconciler::new(runtime, index.clone());

        let report = syncer.sync_index().await.unwrap();
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.failed, 2);
        assert_eq!(report.failed_tools, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_unregistered_inventory_entry_skipped() {
        let runtime = Arc::new(InventoryRuntime {
            tools: vec![ToolDescriptor::new("", "ghost"), tool("t1", "alpha")],
        });
        let index = Arc::new(RecordingIndex::default());
        let syncer = SyncReconciler::new(runtime, index.clone());

        let report = syncer.sync_index().await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert!(!index.fingerprints.lock().unwrap().contains_key(""));
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let a = ToolDescriptor::new("t1", "ab").with_description("c");
        let b = ToolDescriptor::new("t1", "a").with_description("bc");
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_ignores_score() {
        let plain = tool("t1", "alpha");
        let scored = tool("t1", "alpha").with_score(0.42);
        assert_eq!(fingerprint(&plain), fingerprint(&scored));
    }
}
