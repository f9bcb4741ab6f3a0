use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::{ApiResponse, Method, Transport};
use crate::config::Config;
use crate::error::LogisticsError;

/// reqwest-backed implementation of the remote contract.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, LogisticsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| LogisticsError::Internal(format!("http client: {err}")))?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_collection(
        &self,
        resource: &str,
        query: &[(String, String)],
    ) -> Result<ApiResponse<Vec<Value>>, LogisticsError> {
        let response = self
            .client
            .get(self.url(resource))
            .query(query)
            .send()
            .await
            .map_err(|err| LogisticsError::Transport(format!("GET {resource}: {err}")))?;

        decode(response).await
    }

    async fn fetch_by_id(
        &self,
        resource: &str,
        id: Uuid,
    ) -> Result<ApiResponse<Value>, LogisticsError> {
        let response = self
            .client
            .get(format!("{}/{id}", self.url(resource)))
            .send()
            .await
            .map_err(|err| LogisticsError::Transport(format!("GET {resource}/{id}: {err}")))?;

        decode(response).await
    }

    async fn submit(
        &self,
        resource: &str,
        method: Method,
        payload: Value,
    ) -> Result<ApiResponse<Value>, LogisticsError> {
        let url = self.url(resource);
        let request = match method {
            Method::Create => self.client.post(url),
            Method::Update => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };

        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(|err| LogisticsError::Transport(format!("{method:?} {resource}: {err}")))?;

        decode(response).await
    }
}

// Some error paths answer with a bare HTTP status and no envelope body.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: Option<u16>,
    data: Option<T>,
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>, LogisticsError> {
    let http_status = response.status().as_u16();
    let envelope = response.json::<Envelope<T>>().await.unwrap_or(Envelope {
        status: None,
        data: None,
    });

    Ok(ApiResponse {
        status: envelope.status.unwrap_or(http_status),
        data: envelope.data,
    })
}
