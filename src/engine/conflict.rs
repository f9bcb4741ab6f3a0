use uuid::Uuid;

use crate::api::Transport;
use crate::engine::estimate::{estimate_schedule, ScheduleInputs};
use crate::engine::workload::total_assigned_hours;
use crate::models::assignment::ScheduleEstimate;

pub const DEFAULT_CONFLICT_THRESHOLD_HOURS: f64 = 12.0;

/// An assignment conflicts when it would push the associate's day past the
/// capacity threshold. Advisory only; enforcement is the caller's policy.
pub fn has_conflict(existing_hours: f64, new_assignment_hours: f64, threshold_hours: f64) -> bool {
    existing_hours + new_assignment_hours > threshold_hours
}

/// The reconciled view of one evaluation round.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleEvaluation {
    pub estimate: ScheduleEstimate,
    pub existing_hours: f64,
    pub conflict: bool,
}

/// Single reconciliation point: the synchronous estimate and the async
/// workload lookup are combined only once the lookup has resolved.
pub async fn evaluate(
    transport: &dyn Transport,
    inputs: &ScheduleInputs,
    associate_id: Option<Uuid>,
    threshold_hours: f64,
) -> ScheduleEvaluation {
    let estimate = estimate_schedule(inputs);
    let existing_hours = total_assigned_hours(
        transport,
        associate_id,
        inputs.requested_delivery_time.date_naive(),
    )
    .await;

    ScheduleEvaluation {
        estimate,
        existing_hours,
        conflict: has_conflict(existing_hours, estimate.total_hours, threshold_hours),
    }
}
