use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{resources, ApiResponse, Method, Transport};
use crate::error::LogisticsError;
use crate::models::associate::WorkloadSample;
use crate::models::route::LocationSample;

/// A write captured by [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct SubmittedWrite {
    pub resource: String,
    pub method: Method,
    pub payload: Value,
}

/// In-memory, scriptable stand-in for the remote API. Tests seed canned
/// reads, force per-resource statuses, and inspect the submission log.
#[derive(Default)]
pub struct MemoryTransport {
    associates: Mutex<Vec<Value>>,
    workload: DashMap<String, f64>,
    route_samples: Mutex<Vec<LocationSample>>,
    forced_status: DashMap<String, u16>,
    submissions: Mutex<Vec<SubmittedWrite>>,
    fetch_delay: Mutex<Option<Duration>>,
    fetch_counts: DashMap<String, u64>,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_associates(&self, associates: Vec<Value>) {
        *self.associates.lock().unwrap() = associates;
    }

    pub fn set_workload(&self, sample: WorkloadSample) {
        self.workload
            .insert(workload_key(sample.associate_id, sample.date), sample.hours);
    }

    pub fn set_route_samples(&self, samples: Vec<LocationSample>) {
        *self.route_samples.lock().unwrap() = samples;
    }

    /// Forces every call against `resource` to answer `status` until cleared.
    pub fn force_status(&self, resource: &str, status: u16) {
        self.forced_status.insert(resource.to_string(), status);
    }

    pub fn clear_forced_status(&self, resource: &str) {
        self.forced_status.remove(resource);
    }

    /// Adds artificial latency to every read, for poller timing tests.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn submissions(&self) -> Vec<SubmittedWrite> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, resource: &str) -> u64 {
        self.fetch_counts
            .get(resource)
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    /// Highest number of reads in flight at once; a serialized caller keeps
    /// this at 1.
    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter_fetch(&self, resource: &str) {
        *self
            .fetch_counts
            .entry(resource.to_string())
            .or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave_fetch(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn workload_key(associate_id: Uuid, date: NaiveDate) -> String {
    format!("{associate_id}:{date}")
}

fn query_value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch_collection(
        &self,
        resource: &str,
        query: &[(String, String)],
    ) -> Result<ApiResponse<Vec<Value>>, LogisticsError> {
        self.enter_fetch(resource).await;
        let response = self.respond(resource, query);
        self.leave_fetch();
        response
    }

    async fn fetch_by_id(
        &self,
        resource: &str,
        id: Uuid,
    ) -> Result<ApiResponse<Value>, LogisticsError> {
        self.enter_fetch(resource).await;
        self.leave_fetch();

        if let Some(status) = self.forced_status.get(resource) {
            return Ok(ApiResponse::status_only(*status.value()));
        }

        if resource == resources::ASSOCIATES {
            let found = self
                .associates
                .lock()
                .unwrap()
                .iter()
                .find(|value| value.get("id").and_then(Value::as_str) == Some(&id.to_string()))
                .cloned();
            return Ok(match found {
                Some(value) => ApiResponse::ok(value),
                None => ApiResponse::status_only(404),
            });
        }

        Ok(ApiResponse::status_only(404))
    }

    async fn submit(
        &self,
        resource: &str,
        method: Method,
        payload: Value,
    ) -> Result<ApiResponse<Value>, LogisticsError> {
        if let Some(status) = self.forced_status.get(resource) {
            return Ok(ApiResponse::status_only(*status.value()));
        }

        self.submissions.lock().unwrap().push(SubmittedWrite {
            resource: resource.to_string(),
            method,
            payload: payload.clone(),
        });

        Ok(ApiResponse::ok(payload))
    }
}

impl MemoryTransport {
    fn respond(
        &self,
        resource: &str,
        query: &[(String, String)],
    ) -> Result<ApiResponse<Vec<Value>>, LogisticsError> {
        if let Some(status) = self.forced_status.get(resource) {
            return Ok(ApiResponse::status_only(*status.value()));
        }

        match resource {
            resources::ROUTE_SAMPLES => {
                let samples = self.route_samples.lock().unwrap().clone();
                let data = samples
                    .into_iter()
                    .map(|sample| serde_json::to_value(sample).unwrap_or(Value::Null))
                    .collect();
                Ok(ApiResponse::ok(data))
            }
            resources::WORKLOAD => {
                let associate = query_value(query, "associateId");
                let date = query_value(query, "date");
                let hours = match (associate, date) {
                    (Some(associate), Some(date)) => self
                        .workload
                        .get(&format!("{associate}:{date}"))
                        .map(|entry| *entry.value()),
                    _ => None,
                };
                let data = hours
                    .map(|hours| vec![json!({ "totalHours": hours })])
                    .unwrap_or_default();
                Ok(ApiResponse::ok(data))
            }
            resources::ASSOCIATES => {
                Ok(ApiResponse::ok(self.associates.lock().unwrap().clone()))
            }
            _ => Ok(ApiResponse::ok(Vec::new())),
        }
    }
}
