use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{resources, Method, Transport};
use crate::config::{Config, ConflictPolicy};
use crate::engine::conflict::{evaluate, ScheduleEvaluation};
use crate::engine::estimate::ScheduleInputs;
use crate::error::LogisticsError;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::associate::{DeliveryAssociate, GeoPoint};
use crate::state::EngineState;

/// The committed assignment plus the advisory conflict verdict.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub assignment: Assignment,
    pub conflict: bool,
    pub existing_hours: f64,
}

/// Drives the assignment lifecycle against the remote store. The cached
/// copy only advances after the remote accepts the write; a failed
/// submission leaves it untouched and surfaces a recoverable error.
pub struct Scheduler {
    state: Arc<EngineState>,
    transport: Arc<dyn Transport>,
    config: Config,
}

impl Scheduler {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            state: Arc::new(EngineState::new(config.event_buffer_size)),
            transport,
            config,
        }
    }

    pub fn state(&self) -> Arc<EngineState> {
        self.state.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Assignment> {
        self.state.assignment_events_tx.subscribe()
    }

    /// Opens a session-owned draft; nothing is persisted until the first
    /// transition.
    pub fn open_assignment(
        &self,
        request_id: Uuid,
        requested_delivery_time: DateTime<Utc>,
        category: &str,
    ) -> Assignment {
        let assignment = Assignment::new(request_id, requested_delivery_time, category);
        self.state
            .assignments
            .insert(assignment.id, assignment.clone());
        assignment
    }

    /// Fetches one associate by id, refreshing the cached entry on a hit.
    pub async fn load_associate(
        &self,
        associate_id: Uuid,
    ) -> Result<Option<DeliveryAssociate>, LogisticsError> {
        let response = self
            .transport
            .fetch_by_id(resources::ASSOCIATES, associate_id)
            .await?;

        if !response.is_success() {
            return Ok(None);
        }

        let Some(value) = response.data else {
            return Ok(None);
        };
        match serde_json::from_value::<DeliveryAssociate>(value) {
            Ok(associate) => {
                self.state
                    .associates
                    .insert(associate.id, associate.clone());
                Ok(Some(associate))
            }
            Err(err) => {
                warn!(%associate_id, error = %err, "malformed associate record");
                Ok(None)
            }
        }
    }

    pub fn associate_location(&self, associate_id: Uuid) -> Option<GeoPoint> {
        self.state
            .associates
            .get(&associate_id)
            .and_then(|entry| entry.value().location)
    }

    /// Re-evaluates the estimate and capacity verdict; called on every input
    /// change.
    pub async fn evaluate(
        &self,
        inputs: &ScheduleInputs,
        associate_id: Option<Uuid>,
    ) -> ScheduleEvaluation {
        let evaluation = evaluate(
            self.transport.as_ref(),
            inputs,
            associate_id,
            self.config.conflict_threshold_hours,
        )
        .await;

        if evaluation.conflict {
            self.state.metrics.conflicts_detected_total.inc();
        }

        evaluation
    }

    /// Reloads the delivery associate directory into the local cache.
    pub async fn refresh_associates(&self) -> Result<Vec<DeliveryAssociate>, LogisticsError> {
        let response = self
            .transport
            .fetch_collection(resources::ASSOCIATES, &[])
            .await?;

        if !response.is_success() {
            return Err(LogisticsError::Transport(format!(
                "associate directory returned status {}",
                response.status
            )));
        }

        let mut associates = Vec::new();
        for value in response.data.unwrap_or_default() {
            match serde_json::from_value::<DeliveryAssociate>(value) {
                Ok(associate) => {
                    self.state
                        .associates
                        .insert(associate.id, associate.clone());
                    associates.push(associate);
                }
                Err(err) => warn!(error = %err, "skipping malformed associate record"),
            }
        }

        Ok(associates)
    }

    /// `Unassigned -> Assigned`. A capacity conflict is surfaced in the
    /// outcome and, under [`ConflictPolicy::Block`], refuses the transition.
    pub async fn assign(
        &self,
        assignment_id: Uuid,
        associate_id: Uuid,
        inputs: &ScheduleInputs,
    ) -> Result<AssignOutcome, LogisticsError> {
        let current = self.cached(assignment_id)?;
        self.check_transition(&current, AssignmentStatus::Assigned)?;

        let snapshot = ScheduleInputs {
            wait_time_hours: Assignment::clamp_wait_time(inputs.wait_time_hours),
            ..*inputs
        };
        let evaluation = self.evaluate(&snapshot, Some(associate_id)).await;

        if evaluation.conflict {
            warn!(
                %assignment_id,
                %associate_id,
                existing_hours = evaluation.existing_hours,
                new_hours = evaluation.estimate.total_hours,
                threshold = self.config.conflict_threshold_hours,
                "assignment exceeds daily capacity"
            );

            if self.config.conflict_policy == ConflictPolicy::Block {
                return Err(LogisticsError::Conflict(format!(
                    "associate {associate_id} would exceed {} hours",
                    self.config.conflict_threshold_hours
                )));
            }
        }

        let mut candidate = current;
        candidate.associate_id = Some(associate_id);
        candidate.wait_time_hours = snapshot.wait_time_hours;
        candidate.apply_estimate(&evaluation.estimate);
        candidate.status = AssignmentStatus::Assigned;

        self.persist(&candidate, Method::Create).await?;
        self.commit(candidate.clone());

        Ok(AssignOutcome {
            assignment: candidate,
            conflict: evaluation.conflict,
            existing_hours: evaluation.existing_hours,
        })
    }

    /// `Assigned -> Confirmed`.
    pub async fn confirm(&self, assignment_id: Uuid) -> Result<Assignment, LogisticsError> {
        let current = self.cached(assignment_id)?;
        self.check_transition(&current, AssignmentStatus::Confirmed)?;

        let mut candidate = current;
        candidate.status = AssignmentStatus::Confirmed;
        candidate.updated_at = Utc::now();

        self.persist(&candidate, Method::Update).await?;
        self.commit(candidate.clone());
        Ok(candidate)
    }

    /// `Assigned -> Cancelled`, behind the operator confirmation gate.
    /// A declined gate is a no-op, not an error.
    pub async fn cancel(
        &self,
        assignment_id: Uuid,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<Assignment>, LogisticsError> {
        self.gated_transition(assignment_id, AssignmentStatus::Cancelled, confirm)
            .await
    }

    /// `Assigned -> Postponed`, behind the operator confirmation gate.
    pub async fn postpone(
        &self,
        assignment_id: Uuid,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<Assignment>, LogisticsError> {
        self.gated_transition(assignment_id, AssignmentStatus::Postponed, confirm)
            .await
    }

    async fn gated_transition(
        &self,
        assignment_id: Uuid,
        next: AssignmentStatus,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<Assignment>, LogisticsError> {
        let current = self.cached(assignment_id)?;
        self.check_transition(&current, next)?;

        let verb = match next {
            AssignmentStatus::Cancelled => "cancel",
            AssignmentStatus::Postponed => "postpone",
            _ => "update",
        };
        let message = format!("Really {verb} the delivery for request {}?", current.request_id);
        if !confirm(&message) {
            info!(%assignment_id, ?next, "operator declined transition");
            return Ok(None);
        }

        let mut candidate = current;
        candidate.status = next;
        candidate.updated_at = Utc::now();

        self.persist(&candidate, Method::Update).await?;
        self.commit(candidate.clone());
        Ok(Some(candidate))
    }

    fn cached(&self, assignment_id: Uuid) -> Result<Assignment, LogisticsError> {
        self.state
            .assignments
            .get(&assignment_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LogisticsError::NotFound(format!("assignment {assignment_id}")))
    }

    fn check_transition(
        &self,
        current: &Assignment,
        next: AssignmentStatus,
    ) -> Result<(), LogisticsError> {
        if !current.status.can_transition_to(next) {
            return Err(LogisticsError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
        Ok(())
    }

    async fn persist(
        &self,
        candidate: &Assignment,
        method: Method,
    ) -> Result<(), LogisticsError> {
        let payload = serde_json::to_value(candidate)
            .map_err(|err| LogisticsError::Internal(format!("serialize assignment: {err}")))?;

        let result = self
            .transport
            .submit(resources::ASSIGNMENTS, method, payload)
            .await;

        match result {
            Ok(response) if response.is_success() => {
                self.state
                    .metrics
                    .submissions_total
                    .with_label_values(&["success"])
                    .inc();
                Ok(())
            }
            Ok(response) => {
                self.state
                    .metrics
                    .submissions_total
                    .with_label_values(&["error"])
                    .inc();
                let reason = if response.is_client_error() {
                    "submission rejected as invalid; keeping prior state"
                } else {
                    "submission failed server-side; keeping prior state"
                };
                warn!(
                    assignment_id = %candidate.id,
                    status = response.status,
                    "{reason}"
                );
                Err(LogisticsError::SubmitRejected {
                    status: response.status,
                })
            }
            Err(err) => {
                self.state
                    .metrics
                    .submissions_total
                    .with_label_values(&["error"])
                    .inc();
                warn!(
                    assignment_id = %candidate.id,
                    error = %err,
                    "submission failed; keeping prior state"
                );
                Err(err)
            }
        }
    }

    fn commit(&self, assignment: Assignment) {
        info!(
            assignment_id = %assignment.id,
            request_id = %assignment.request_id,
            status = ?assignment.status,
            "assignment persisted"
        );
        self.state
            .assignments
            .insert(assignment.id, assignment.clone());
        let _ = self.state.assignment_events_tx.send(assignment);
    }
}
