//! Execution engine.
//!
//! Applies a [`ReconciliationPlan`] against the runtime. Detachments run
//! strictly before attachments so the agent's tool count stays below the
//! ceiling at every instant, and they run sequentially: the runtime's
//! tool-list endpoint exhibits read-after-write inconsistency under
//! concurrent mutation of the same agent. Attachments do not share that
//! hazard and fan out with bounded concurrency.

use std::{sync::Arc, time::Duration};

use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::ReconcileConfig,
    runtime::AgentRuntime,
    types::{OperationKind, OperationOutcome, ReconciliationPlan, ReconciliationResult},
};

pub struct ExecutionEngine {
    runtime: Arc<dyn AgentRuntime>,
    retry_attempts: u32,
    retry_delay: Duration,
    attach_fan_out: usize,
}

impl ExecutionEngine {
    pub fn new(runtime: Arc<dyn AgentRuntime>, config: &ReconcileConfig) -> Self {
        Self {
            runtime,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: config.retry_delay(),
            attach_fan_out: config.attach_fan_out.max(1),
        }
    }

    /// Apply the plan. Never fails: partial failure is a normal, fully
    /// reported outcome, and a cancelled pass returns whatever it had
    /// accumulated (issued mutations are not rolled back).
    pub async fn execute(
        &self,
        agent_id: &str,
        plan: ReconciliationPlan,
        cancel: &CancellationToken,
    ) -> ReconciliationResult {
        let mut result = ReconciliationResult {
            agent_id: agent_id.to_string(),
            ..Default::default()
        };

        info!(
            agent_id,
            detach = plan.detach.len(),
            attach = plan.attach.len(),
            "Executing reconciliation plan"
        );

        for tool in &plan.detach {
            if cancel.is_cancelled() {
                warn!(agent_id, "Pass cancelled, abandoning remaining detachments");
                return result;
            }
            let outcome = self
                .run_operation(agent_id, &tool.tool_id, &tool.name, OperationKind::Detach)
                .await;
            if outcome.success {
                result.detached_tools.push(outcome.tool_id);
            } else {
                result.failed_detachments.push(outcome);
            }
        }

        let outcomes: Vec<Option<OperationOutcome>> = stream::iter(plan.attach)
            .map(|tool| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let outcome = self
                        .run_operation(agent_id, &tool.tool_id, &tool.name, OperationKind::Attach)
                        .await
                        .with_score(tool.score);
                    Some(outcome)
                }
            })
            .buffer_unordered(self.attach_fan_out)
            .collect()
            .await;

        for outcome in outcomes.into_iter().flatten() {
            if outcome.success {
                result.successful_attachments.push(outcome);
            } else {
                result.failed_attachments.push(outcome);
            }
        }

        result.success_count = result.successful_attachments.len();
        result.failure_count = result.failed_attachments.len();
        result
    }

    /// One operation with its retry budget. The delay between attempts is
    /// fixed, not exponential: detach latency is dominated by the runtime's
    /// consistency window, not congestion. A timeout consumes an attempt.
    async fn run_operation(
        &self,
        agent_id: &str,
        tool_id: &str,
        name: &str,
        kind: OperationKind,
    ) -> OperationOutcome {
        for attempt in 1..=self.retry_attempts {
            let call = match kind {
                OperationKind::Attach => self.runtime.attach_tool(agent_id, tool_id),
                OperationKind::Detach => self.runtime.detach_tool(agent_id, tool_id),
            };
            match call.await {
                Ok(()) => {
                    info!(agent_id, tool_id, ?kind, attempt, "Operation succeeded");
                    return OperationOutcome::success(tool_id, name, kind, attempt);
                }
                Err(e) => {
                    if attempt >= self.retry_attempts || !e.is_retryable() {
                        error!(
                            agent_id, tool_id, ?kind, attempt,
                            error = %e,
                            "Operation failed, retry budget exhausted"
                        );
                        return OperationOutcome::failure(tool_id, name, kind, attempt, e.to_string());
                    }
                    warn!(
                        agent_id, tool_id, ?kind, attempt,
                        error = %e,
                        "Operation failed, retrying in {:?}",
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
        OperationOutcome::failure(tool_id, name, kind, self.retry_attempts, "retry budget exhausted")
    }
}
