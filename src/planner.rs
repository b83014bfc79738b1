//! Reconciliation planner.
//!
//! Pure diff between the current externally-managed attachment set, the
//! caller's keep-list, and the desired candidate set. Deterministic: the same
//! three inputs always produce the same plan, regardless of input ordering.

use std::collections::HashSet;

use crate::types::{AttachedToolRef, KeepSet, ReconciliationPlan, ToolDescriptor};

/// Compute the attach/detach diff for one pass.
///
/// - `attach`: desired tools not already attached, in ranking order.
/// - `detach`: current attachments whose id is neither kept nor desired,
///   sorted by tool id.
///
/// A tool that is both attached and desired appears in neither list. An
/// empty `desired` clears every non-kept externally-managed tool: a query
/// that matches nothing still flushes stale attachments.
pub fn plan(
    current: &[AttachedToolRef],
    keep: &KeepSet,
    desired: &[ToolDescriptor],
) -> ReconciliationPlan {
    let current_ids: HashSet<&str> = current.iter().map(|t| t.tool_id.as_str()).collect();
    let desired_ids: HashSet<&str> = desired.iter().map(|t| t.tool_id.as_str()).collect();

    let attach: Vec<ToolDescriptor> = desired
        .iter()
        .filter(|t| !current_ids.contains(t.tool_id.as_str()))
        .cloned()
        .collect();

    let mut detach: Vec<AttachedToolRef> = current
        .iter()
        .filter(|t| !keep.contains(&t.tool_id) && !desired_ids.contains(t.tool_id.as_str()))
        .cloned()
        .collect();
    detach.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
    detach.dedup_by(|a, b| a.tool_id == b.tool_id);

    ReconciliationPlan { detach, attach }
}
