use crate::models::associate::GeoPoint;

const KM_PER_DEGREE: f64 = 111.0;
const AVG_SPEED_KMH: f64 = 50.0;
pub const MIN_TRAVEL_HOURS: f64 = 0.5;
pub const MAX_TRAVEL_HOURS: f64 = 8.0;
pub const DEFAULT_TRAVEL_HOURS: f64 = 1.0;

/// Estimates the travel time between two points in hours.
///
/// This is deliberately a coarse planar heuristic, not a geodesic distance:
/// straight-line distance in degrees scaled by 111 km/degree, then divided
/// by an assumed 50 km/h average speed. The `[0.5, 8]` hour clamp is tuned
/// to this approximation; swapping in a true geodesic formula requires
/// re-validating the clamp bounds.
///
/// Missing geodata must never block scheduling, so an absent coordinate on
/// either side yields a fixed 1-hour default.
pub fn estimate_travel_hours(from: Option<&GeoPoint>, to: Option<&GeoPoint>) -> f64 {
    let (Some(from), Some(to)) = (from, to) else {
        return DEFAULT_TRAVEL_HOURS;
    };

    let delta_lat = to.lat - from.lat;
    let delta_lng = to.lng - from.lng;
    let degrees = (delta_lat * delta_lat + delta_lng * delta_lng).sqrt();
    let distance_km = degrees * KM_PER_DEGREE;

    (distance_km / AVG_SPEED_KMH).clamp(MIN_TRAVEL_HOURS, MAX_TRAVEL_HOURS)
}
