//! Metrics for the block template feed.

use crate::WorkTrigger;

/// Container for metrics.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of work-ready signals. Labels: `trigger`.
    pub const WORK_READY_TOTAL: &'static str = "bridge_work_ready_total";
    /// Identifier for the gauge reporting whether push notifications are active (1 = active).
    pub const BLOCK_TEMPLATE_PUSH_ENABLED: &'static str = "bridge_block_template_push_enabled";

    /// Initializes metrics for the block template feed.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics to 0 so they can be queried immediately.
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::WORK_READY_TOTAL,
            metrics::Unit::Count,
            "Total number of times new work was announced to miners, by trigger"
        );
        metrics::describe_gauge!(
            Self::BLOCK_TEMPLATE_PUSH_ENABLED,
            "Whether the node pushes new block template notifications to the bridge"
        );
    }

    fn zero() {
        for trigger in [WorkTrigger::Push, WorkTrigger::Timer] {
            metrics::counter!(Self::WORK_READY_TOTAL, "trigger" => trigger.to_string())
                .increment(0);
        }
        metrics::gauge!(Self::BLOCK_TEMPLATE_PUSH_ENABLED).set(0.0);
    }

    /// Records one work-ready signal.
    pub fn record_work_ready(trigger: WorkTrigger) {
        metrics::counter!(Self::WORK_READY_TOTAL, "trigger" => trigger.to_string()).increment(1);
    }

    /// Records whether push notifications are active.
    pub fn set_push_enabled(enabled: bool) {
        metrics::gauge!(Self::BLOCK_TEMPLATE_PUSH_ENABLED).set(if enabled { 1.0 } else { 0.0 });
    }
}
