use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use rig_logistics::api::memory::MemoryTransport;
use rig_logistics::api::{resources, Method};
use rig_logistics::config::{Config, ConflictPolicy};
use rig_logistics::engine::estimate::ScheduleInputs;
use rig_logistics::engine::lifecycle::Scheduler;
use rig_logistics::error::LogisticsError;
use rig_logistics::models::assignment::AssignmentStatus;
use rig_logistics::models::associate::{GeoPoint, WorkloadSample};

fn setup(policy: ConflictPolicy) -> (Scheduler, Arc<MemoryTransport>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let transport = Arc::new(MemoryTransport::new());
    let config = Config {
        conflict_policy: policy,
        ..Config::default()
    };
    (Scheduler::new(config, transport.clone()), transport)
}

fn committed_hours(associate_id: Uuid, hours: f64) -> WorkloadSample {
    WorkloadSample {
        associate_id,
        date: requested_time().date_naive(),
        hours,
    }
}

fn requested_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 14, 0, 0).unwrap()
}

fn bakersfield_inputs(wait: f64) -> ScheduleInputs {
    ScheduleInputs {
        requested_delivery_time: requested_time(),
        wait_time_hours: wait,
        supplier_location: Some(GeoPoint {
            lat: 35.2,
            lng: -119.3,
        }),
        destination_location: Some(GeoPoint {
            lat: 35.48,
            lng: -118.9,
        }),
    }
}

fn locationless_inputs(wait: f64) -> ScheduleInputs {
    ScheduleInputs {
        requested_delivery_time: requested_time(),
        wait_time_hours: wait,
        supplier_location: None,
        destination_location: None,
    }
}

#[tokio::test]
async fn evaluate_derives_the_full_schedule() {
    let (scheduler, _transport) = setup(ConflictPolicy::Advise);

    let evaluation = scheduler.evaluate(&bakersfield_inputs(1.0), None).await;
    let estimate = evaluation.estimate;

    assert_eq!(
        estimate.arrival_time,
        Utc.with_ymd_and_hms(2024, 1, 10, 13, 0, 0).unwrap()
    );
    assert!((estimate.travel_out_hours - 1.084).abs() < 0.01);
    assert_eq!(estimate.travel_out_hours, estimate.travel_back_hours);
    assert!(estimate.departure_time < estimate.arrival_time);
    assert!(estimate.return_time > requested_time());
    assert!((estimate.total_hours - (2.0 * estimate.travel_out_hours + 1.0)).abs() < 1e-9);

    // No associate selected means no committed hours and no conflict.
    assert_eq!(evaluation.existing_hours, 0.0);
    assert!(!evaluation.conflict);
}

#[tokio::test]
async fn evaluate_flags_a_capacity_conflict() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let associate_id = Uuid::new_v4();
    transport.set_workload(committed_hours(associate_id, 8.0));

    // Default 1-hour legs plus a 3-hour wait: 5 new hours on top of 8.
    let evaluation = scheduler
        .evaluate(&locationless_inputs(3.0), Some(associate_id))
        .await;

    assert_eq!(evaluation.existing_hours, 8.0);
    assert!((evaluation.estimate.total_hours - 5.0).abs() < 1e-9);
    assert!(evaluation.conflict);
}

#[tokio::test]
async fn evaluate_treats_missing_workload_as_zero() {
    let (scheduler, _transport) = setup(ConflictPolicy::Advise);

    let evaluation = scheduler
        .evaluate(&locationless_inputs(1.0), Some(Uuid::new_v4()))
        .await;

    assert_eq!(evaluation.existing_hours, 0.0);
    assert!(!evaluation.conflict);
}

#[tokio::test]
async fn evaluate_survives_a_failing_workload_endpoint() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    transport.force_status(resources::WORKLOAD, 500);

    let evaluation = scheduler
        .evaluate(&locationless_inputs(1.0), Some(Uuid::new_v4()))
        .await;

    assert_eq!(evaluation.existing_hours, 0.0);
    assert!(!evaluation.conflict);
}

#[tokio::test]
async fn assign_persists_and_publishes() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let mut events = scheduler.subscribe();

    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "mud pump");
    assert_eq!(assignment.status, AssignmentStatus::Unassigned);

    let associate_id = Uuid::new_v4();
    let outcome = scheduler
        .assign(assignment.id, associate_id, &bakersfield_inputs(1.0))
        .await
        .unwrap();

    assert_eq!(outcome.assignment.status, AssignmentStatus::Assigned);
    assert_eq!(outcome.assignment.associate_id, Some(associate_id));
    assert!(!outcome.conflict);
    assert!(outcome.assignment.departure_time.is_some());
    assert!(outcome.assignment.arrival_time.is_some());
    assert!(outcome.assignment.return_time.is_some());

    let submissions = transport.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].resource, resources::ASSIGNMENTS);
    assert_eq!(submissions[0].method, Method::Create);
    assert_eq!(
        submissions[0].payload["status"],
        json!("Assigned"),
    );

    let event = events.recv().await.unwrap();
    assert_eq!(event.id, assignment.id);
    assert_eq!(event.status, AssignmentStatus::Assigned);

    let cached = scheduler.state().assignments.get(&assignment.id).unwrap().value().clone();
    assert_eq!(cached.status, AssignmentStatus::Assigned);
}

#[tokio::test]
async fn assign_clamps_the_wait_time() {
    let (scheduler, _transport) = setup(ConflictPolicy::Advise);
    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "casing");

    let outcome = scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(9.0))
        .await
        .unwrap();

    assert_eq!(outcome.assignment.wait_time_hours, 4.0);
}

#[tokio::test]
async fn assign_refuses_a_second_assignment() {
    let (scheduler, _transport) = setup(ConflictPolicy::Advise);
    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "casing");

    scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap();

    let err = scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LogisticsError::InvalidTransition {
            from: AssignmentStatus::Assigned,
            to: AssignmentStatus::Assigned,
        }
    ));
}

#[tokio::test]
async fn block_policy_refuses_a_conflicting_assignment() {
    let (scheduler, transport) = setup(ConflictPolicy::Block);
    let associate_id = Uuid::new_v4();
    transport.set_workload(committed_hours(associate_id, 10.0));

    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "drill bits");
    let err = scheduler
        .assign(assignment.id, associate_id, &locationless_inputs(3.0))
        .await
        .unwrap_err();

    assert!(matches!(err, LogisticsError::Conflict(_)));
    assert!(transport.submissions().is_empty());

    let cached = scheduler.state().assignments.get(&assignment.id).unwrap().value().clone();
    assert_eq!(cached.status, AssignmentStatus::Unassigned);
}

#[tokio::test]
async fn advise_policy_lets_a_conflicting_assignment_through() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let associate_id = Uuid::new_v4();
    transport.set_workload(committed_hours(associate_id, 10.0));

    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "drill bits");
    let outcome = scheduler
        .assign(assignment.id, associate_id, &locationless_inputs(3.0))
        .await
        .unwrap();

    assert!(outcome.conflict);
    assert_eq!(outcome.existing_hours, 10.0);
    assert_eq!(outcome.assignment.status, AssignmentStatus::Assigned);
    assert_eq!(transport.submissions().len(), 1);
}

#[tokio::test]
async fn failed_submission_keeps_the_prior_state() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    transport.force_status(resources::ASSIGNMENTS, 500);

    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "cement");
    let err = scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap_err();

    assert!(matches!(err, LogisticsError::SubmitRejected { status: 500 }));
    assert!(transport.submissions().is_empty());

    let cached = scheduler.state().assignments.get(&assignment.id).unwrap().value().clone();
    assert_eq!(cached.status, AssignmentStatus::Unassigned);
    assert_eq!(cached.associate_id, None);
}

#[tokio::test]
async fn client_rejected_submission_surfaces_the_400() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    transport.force_status(resources::ASSIGNMENTS, 400);

    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "cement");
    let err = scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap_err();

    assert!(matches!(err, LogisticsError::SubmitRejected { status: 400 }));
    let cached = scheduler.state().assignments.get(&assignment.id).unwrap().value().clone();
    assert_eq!(cached.status, AssignmentStatus::Unassigned);
}

#[tokio::test]
async fn confirm_moves_an_assigned_delivery_forward() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "frac sand");

    scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap();
    let confirmed = scheduler.confirm(assignment.id).await.unwrap();

    assert_eq!(confirmed.status, AssignmentStatus::Confirmed);
    let submissions = transport.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].method, Method::Update);
}

#[tokio::test]
async fn declined_cancel_is_a_noop() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "frac sand");

    scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap();

    let result = scheduler.cancel(assignment.id, |_| false).await.unwrap();
    assert!(result.is_none());

    // Only the original assign write went out.
    assert_eq!(transport.submissions().len(), 1);
    let cached = scheduler.state().assignments.get(&assignment.id).unwrap().value().clone();
    assert_eq!(cached.status, AssignmentStatus::Assigned);
}

#[tokio::test]
async fn confirmed_cancel_goes_through_the_gate() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let request_id = Uuid::new_v4();
    let assignment = scheduler.open_assignment(request_id, requested_time(), "frac sand");

    scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap();

    let mut seen_message = None;
    let cancelled = scheduler
        .cancel(assignment.id, |message| {
            seen_message = Some(message.to_string());
            true
        })
        .await
        .unwrap()
        .unwrap();

    let message = seen_message.unwrap();
    assert!(message.contains("cancel"));
    assert!(message.contains(&request_id.to_string()));

    assert_eq!(cancelled.status, AssignmentStatus::Cancelled);
    let submissions = transport.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].method, Method::Update);
}

#[tokio::test]
async fn postpone_goes_through_the_gate() {
    let (scheduler, _transport) = setup(ConflictPolicy::Advise);
    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "pipe");

    scheduler
        .assign(assignment.id, Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap();
    let postponed = scheduler
        .postpone(assignment.id, |_| true)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(postponed.status, AssignmentStatus::Postponed);
}

#[tokio::test]
async fn cancel_of_an_unassigned_draft_is_invalid() {
    let (scheduler, _transport) = setup(ConflictPolicy::Advise);
    let assignment = scheduler.open_assignment(Uuid::new_v4(), requested_time(), "pipe");

    let err = scheduler.cancel(assignment.id, |_| true).await.unwrap_err();
    assert!(matches!(err, LogisticsError::InvalidTransition { .. }));
}

#[tokio::test]
async fn unknown_assignment_is_not_found() {
    let (scheduler, _transport) = setup(ConflictPolicy::Advise);

    let err = scheduler
        .assign(Uuid::new_v4(), Uuid::new_v4(), &locationless_inputs(1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, LogisticsError::NotFound(_)));
}

#[tokio::test]
async fn refresh_associates_fills_the_directory_cache() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let associate_id = Uuid::new_v4();
    transport.seed_associates(vec![
        json!({
            "id": associate_id,
            "name": "R. Alvarez",
            "supplier_id": Uuid::new_v4(),
            "location": { "lat": 35.2, "lng": -119.3 }
        }),
        json!({
            "id": Uuid::new_v4(),
            "name": "T. Okafor",
            "supplier_id": Uuid::new_v4(),
            "location": null
        }),
    ]);

    let associates = scheduler.refresh_associates().await.unwrap();
    assert_eq!(associates.len(), 2);

    let location = scheduler.associate_location(associate_id).unwrap();
    assert_eq!(location.lat, 35.2);
    assert_eq!(location.lng, -119.3);
}

#[tokio::test]
async fn load_associate_hydrates_a_single_entry() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    let associate_id = Uuid::new_v4();
    transport.seed_associates(vec![json!({
        "id": associate_id,
        "name": "R. Alvarez",
        "supplier_id": Uuid::new_v4(),
        "location": { "lat": 35.2, "lng": -119.3 }
    })]);

    let associate = scheduler.load_associate(associate_id).await.unwrap().unwrap();
    assert_eq!(associate.name, "R. Alvarez");
    assert!(scheduler.associate_location(associate_id).is_some());

    // An unknown id is absence, not an error.
    let missing = scheduler.load_associate(Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn refresh_associates_surfaces_a_directory_failure() {
    let (scheduler, transport) = setup(ConflictPolicy::Advise);
    transport.force_status(resources::ASSOCIATES, 503);

    let err = scheduler.refresh_associates().await.unwrap_err();
    assert!(matches!(err, LogisticsError::Transport(_)));
}
