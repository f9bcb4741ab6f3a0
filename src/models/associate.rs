use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// An associate as reported by the external directory; immutable once
/// fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAssociate {
    pub id: Uuid,
    pub name: String,
    pub supplier_id: Uuid,
    pub location: Option<GeoPoint>,
}

/// Hours already committed to an associate on a date, sourced externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSample {
    pub associate_id: Uuid,
    pub date: NaiveDate,
    pub hours: f64,
}
