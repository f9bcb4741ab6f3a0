use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::api::{resources, Transport};

/// Sums the hours already committed to an associate on a date. Missing
/// history is a valid "no conflict" signal, so absent input, rejected
/// lookups, and transport failures all resolve to zero.
pub async fn total_assigned_hours(
    transport: &dyn Transport,
    associate_id: Option<Uuid>,
    date: NaiveDate,
) -> f64 {
    let Some(associate_id) = associate_id else {
        return 0.0;
    };

    let query = vec![
        ("associateId".to_string(), associate_id.to_string()),
        ("date".to_string(), date.to_string()),
    ];

    match transport.fetch_collection(resources::WORKLOAD, &query).await {
        Ok(response) if response.is_success() => response
            .data
            .unwrap_or_default()
            .iter()
            .map(|record| {
                record
                    .get("totalHours")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
            })
            .sum(),
        Ok(response) => {
            warn!(
                status = response.status,
                %associate_id,
                "workload lookup rejected; assuming no committed hours"
            );
            0.0
        }
        Err(err) => {
            warn!(error = %err, %associate_id, "workload lookup failed; assuming no committed hours");
            0.0
        }
    }
}
