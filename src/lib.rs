//! Tool set reconciliation for LLM agent runtimes.
//!
//! Keeps an agent's attached tool set converged with the top-ranked results
//! of a semantic tool search, without disturbing tools the caller pins via a
//! keep-list or tools the runtime manages statically.
//!
//! ## Modules
//!
//! - [`reconciler`]: The [`ToolSyncService`] entry point (search, register, plan, execute)
//! - [`planner`]: Pure set-difference planning over attachment state
//! - [`executor`]: Plan execution with retries and bounded attach concurrency
//! - [`registry`]: Idempotent tool registration against the runtime
//! - [`state`]: Attachment-state reads with conservative origin handling
//! - [`search`]: Candidate source seam plus TTL result caching
//! - [`sync`]: Fingerprint-based search-index synchronization
//! - [`runtime`]: The [`AgentRuntime`] seam and its HTTP implementation

pub mod config;
pub mod error;
pub mod types;

// Boundary seams
pub mod index;
pub mod runtime;
pub mod search;

// Reconciliation pipeline
pub mod executor;
pub mod planner;
pub mod reconciler;
pub mod registry;
pub mod state;
pub mod sync;

pub use config::{ReconcileConfig, RuntimeConfig, SearchCacheConfig, SyncConfig, ToolSyncConfig};
pub use error::{ToolSyncError, ToolSyncResult};
pub use executor::ExecutionEngine;
pub use index::SearchIndex;
pub use planner::plan;
pub use reconciler::ToolSyncService;
pub use registry::ToolRegistry;
pub use runtime::{AgentRuntime, HttpAgentRuntime};
pub use search::{CachedCandidateSource, CandidateSource};
pub use state::AttachmentStateReader;
pub use sync::SyncReconciler;
pub use types::{
    AttachedToolRef, KeepSet, OperationKind, OperationOutcome, ReconciliationPlan,
    ReconciliationResult, SyncReport, ToolDescriptor, ToolOrigin,
};
