use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::associate::GeoPoint;

/// One reported position along a delivery; the wire field for the sample
/// timestamp is `date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "date")]
    pub recorded_at: DateTime<Utc>,
}

/// The ordered path of a delivery, rebuilt wholesale on every poll. Samples
/// stay sorted by timestamp ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteTrace {
    samples: Vec<LocationSample>,
}

impl RouteTrace {
    pub fn from_samples(mut samples: Vec<LocationSample>) -> Self {
        samples.sort_by_key(|sample| sample.recorded_at);
        Self { samples }
    }

    pub fn samples(&self) -> &[LocationSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&LocationSample> {
        self.samples.last()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// What a route subscriber sees after each successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUpdate {
    pub trace: RouteTrace,
    pub last_location: Option<GeoPoint>,
    pub last_update: Option<DateTime<Utc>>,
    pub last_update_label: Option<String>,
}

impl RouteUpdate {
    pub fn from_trace(trace: RouteTrace) -> Self {
        let last = trace.last().copied();
        Self {
            last_location: last.map(|sample| GeoPoint {
                lat: sample.lat,
                lng: sample.lng,
            }),
            last_update: last.map(|sample| sample.recorded_at),
            last_update_label: last
                .map(|sample| sample.recorded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            trace,
        }
    }
}
