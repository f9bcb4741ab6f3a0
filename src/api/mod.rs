pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::LogisticsError;

/// Resource names understood by the remote API.
pub mod resources {
    pub const ASSIGNMENTS: &str = "assignments";
    pub const ASSOCIATES: &str = "delivery-associates";
    pub const ROUTE_SAMPLES: &str = "route-samples";
    pub const WORKLOAD: &str = "workload";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Create,
    Update,
    Delete,
}

/// Envelope every remote call resolves to: 200 success, 400 client-side
/// validation failure, anything else a server problem. Callers branch on
/// `status`, never on the mere presence of `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: 200,
            data: Some(data),
        }
    }

    pub fn status_only(status: u16) -> Self {
        Self { status, data: None }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_client_error(&self) -> bool {
        self.status == 400
    }
}

/// The request/response contract the engine consumes. `Err` is reserved for
/// connection-level failures; a reachable server answering non-200 still
/// comes back as `Ok` so callers can branch on the status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_collection(
        &self,
        resource: &str,
        query: &[(String, String)],
    ) -> Result<ApiResponse<Vec<Value>>, LogisticsError>;

    async fn fetch_by_id(
        &self,
        resource: &str,
        id: Uuid,
    ) -> Result<ApiResponse<Value>, LogisticsError>;

    async fn submit(
        &self,
        resource: &str,
        method: Method,
        payload: Value,
    ) -> Result<ApiResponse<Value>, LogisticsError>;
}
