use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_WAIT_HOURS: f64 = 0.5;
pub const MAX_WAIT_HOURS: f64 = 4.0;
const WAIT_STEP_HOURS: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    Unassigned,
    Assigned,
    Confirmed,
    Cancelled,
    Postponed,
    Completed,
}

impl AssignmentStatus {
    /// Legal lifecycle moves. `Completed` is only reachable from `Confirmed`
    /// via external delivery confirmation.
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Unassigned, Assigned)
                | (Assigned, Confirmed)
                | (Assigned, Cancelled)
                | (Assigned, Postponed)
                | (Confirmed, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AssignmentStatus::Cancelled | AssignmentStatus::Completed
        )
    }
}

/// The derived schedule for one delivery leg. Arrival always precedes the
/// requested delivery time by the wait margin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEstimate {
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub return_time: DateTime<Utc>,
    pub travel_out_hours: f64,
    pub travel_back_hours: f64,
    pub total_hours: f64,
}

/// One delivery obligation tied to a request. Owned by the editing session
/// until submitted; afterwards the local copy is a read cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub request_id: Uuid,
    pub requested_delivery_time: DateTime<Utc>,
    pub category: String,
    pub associate_id: Option<Uuid>,
    pub wait_time_hours: f64,
    pub estimated_hours: f64,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub return_time: Option<DateTime<Utc>>,
    pub notes: String,
    pub status: AssignmentStatus,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(request_id: Uuid, requested_delivery_time: DateTime<Utc>, category: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            requested_delivery_time,
            category: category.to_string(),
            associate_id: None,
            wait_time_hours: MIN_WAIT_HOURS,
            estimated_hours: 0.0,
            departure_time: None,
            arrival_time: None,
            return_time: None,
            notes: String::new(),
            status: AssignmentStatus::Unassigned,
            updated_at: Utc::now(),
        }
    }

    /// Snaps a wait time onto the 0.5..=4.0 hour range in half-hour steps.
    pub fn clamp_wait_time(hours: f64) -> f64 {
        let snapped = (hours / WAIT_STEP_HOURS).round() * WAIT_STEP_HOURS;
        snapped.clamp(MIN_WAIT_HOURS, MAX_WAIT_HOURS)
    }

    pub fn apply_estimate(&mut self, estimate: &ScheduleEstimate) {
        self.departure_time = Some(estimate.departure_time);
        self.arrival_time = Some(estimate.arrival_time);
        self.return_time = Some(estimate.return_time);
        self.estimated_hours = estimate.total_hours;
        self.updated_at = Utc::now();
    }
}
