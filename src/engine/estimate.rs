use chrono::{DateTime, Duration, Utc};

use crate::geo::estimate_travel_hours;
use crate::models::assignment::ScheduleEstimate;
use crate::models::associate::GeoPoint;

/// The current input snapshot of the scheduling dialog.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleInputs {
    pub requested_delivery_time: DateTime<Utc>,
    pub wait_time_hours: f64,
    pub supplier_location: Option<GeoPoint>,
    pub destination_location: Option<GeoPoint>,
}

/// Derives departure, arrival, and return times for one delivery leg.
/// Stage order matters: travel legs first, then arrival = requested - wait
/// (the associate is on-site before the requested time), then departure =
/// arrival - travel out, then return = requested + travel back.
pub fn estimate_schedule(inputs: &ScheduleInputs) -> ScheduleEstimate {
    let travel_out = estimate_travel_hours(
        inputs.supplier_location.as_ref(),
        inputs.destination_location.as_ref(),
    );
    let travel_back = estimate_travel_hours(
        inputs.destination_location.as_ref(),
        inputs.supplier_location.as_ref(),
    );

    let arrival_time = inputs.requested_delivery_time - hours(inputs.wait_time_hours);
    let departure_time = arrival_time - hours(travel_out);
    let return_time = inputs.requested_delivery_time + hours(travel_back);

    ScheduleEstimate {
        departure_time,
        arrival_time,
        return_time,
        travel_out_hours: travel_out,
        travel_back_hours: travel_back,
        total_hours: travel_out + inputs.wait_time_hours + travel_back,
    }
}

fn hours(value: f64) -> Duration {
    Duration::milliseconds((value * 3_600_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{estimate_schedule, ScheduleInputs};
    use crate::models::associate::GeoPoint;

    fn inputs(wait: f64) -> ScheduleInputs {
        ScheduleInputs {
            requested_delivery_time: Utc.with_ymd_and_hms(2024, 1, 10, 14, 0, 0).unwrap(),
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

    #[test]
    fn arrival_precedes_the_requested_time_by_the_wait_margin() {
        let estimate = estimate_schedule(&inputs(1.0));
        assert_eq!(
            estimate.arrival_time,
            Utc.with_ymd_and_hms(2024, 1, 10, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn departure_return_and_total_follow_the_travel_legs() {
        let snapshot = inputs(1.0);
        let estimate = estimate_schedule(&snapshot);

        // Straight-line legs are symmetric.
        assert_eq!(estimate.travel_out_hours, estimate.travel_back_hours);

        let out_ms = (estimate.travel_out_hours * 3_600_000.0).round() as i64;
        let back_ms = (estimate.travel_back_hours * 3_600_000.0).round() as i64;
        assert_eq!(
            estimate.departure_time,
            estimate.arrival_time - chrono::Duration::milliseconds(out_ms)
        );
        assert_eq!(
            estimate.return_time,
            snapshot.requested_delivery_time + chrono::Duration::milliseconds(back_ms)
        );
        assert!(
            (estimate.total_hours
                - (estimate.travel_out_hours + 1.0 + estimate.travel_back_hours))
                .abs()
                < 1e-12
        );

        assert!(estimate.departure_time <= estimate.arrival_time);
        assert!(estimate.arrival_time <= snapshot.requested_delivery_time);
        assert!(snapshot.requested_delivery_time <= estimate.return_time);
    }

    #[test]
    fn missing_locations_fall_back_to_one_hour_legs() {
        let snapshot = ScheduleInputs {
            supplier_location: None,
            ..inputs(2.0)
        };
        let estimate = estimate_schedule(&snapshot);

        assert_eq!(estimate.travel_out_hours, 1.0);
        assert_eq!(estimate.travel_back_hours, 1.0);
        assert_eq!(estimate.total_hours, 4.0);
        assert_eq!(
            estimate.departure_time,
            Utc.with_ymd_and_hms(2024, 1, 10, 11, 0, 0).unwrap()
        );
        assert_eq!(
            estimate.return_time,
            Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn recomputation_with_identical_inputs_is_identical() {
        let snapshot = inputs(1.5);
        assert_eq!(estimate_schedule(&snapshot), estimate_schedule(&snapshot));
    }
}
