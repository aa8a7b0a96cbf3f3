use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::envelope::{Envelope, Page, RawEnvelope};
use crate::models::{
    CalendarItem, ClassInstance, ClassQuery, ClassRecord, ClassStatus, CreateClassRequest,
    CreatedClass, RangeQuery, RegeneratedInstances, UpdateClassRequest, UpdateInstanceRequest,
    api_date,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

/// What the backend puts in an error response body, when it puts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {}", .body.message.as_deref().unwrap_or("no message"))]
    Api { status: StatusCode, body: ErrorBody },
    #[error("upstream rejected the request: {}", .0.message.as_deref().unwrap_or("no message"))]
    Rejected(ErrorBody),
    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ClientError::Api { body, .. } | ClientError::Rejected(body) => Some(body),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
}

/// Typed client for the `/calander` REST API.
#[derive(Clone)]
pub struct ClassApiClient {
    client: reqwest::Client,
    base_url: Arc<Url>,
}

impl ClassApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::new(base_url),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ClientError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = if params.is_empty() {
            Url::parse(&format!("{base}{path}"))?
        } else {
            Url::parse_with_params(&format!("{base}{path}"), params)?
        };
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<RawEnvelope, ClientError> {
        debug!(method = %method, path = url.path(), "upstream request");
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            warn!(%status, message = ?body.message, "upstream request failed");
            return Err(ClientError::Api { status, body });
        }

        let value: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        let raw = RawEnvelope::normalize(value);
        if !raw.success {
            let errors = raw
                .data
                .get("errors")
                .cloned()
                .and_then(|errors| serde_json::from_value(errors).ok())
                .unwrap_or_default();
            return Err(ClientError::Rejected(ErrorBody {
                title: raw.title,
                message: raw.message,
                errors,
            }));
        }
        Ok(raw)
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Envelope<T>, ClientError> {
        let url = self.url(path, params)?;
        let raw = self.send::<()>(Method::GET, url, None).await?;
        Ok(raw.into_envelope()?)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Page<T>, ClientError> {
        let url = self.url(path, params)?;
        let raw = self.send::<()>(Method::GET, url, None).await?;
        Ok(raw.into_page()?)
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Envelope<T>, ClientError> {
        let url = self.url(path, params)?;
        let raw = self.send(method, url, body).await?;
        Ok(raw.into_envelope()?)
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = self.url("/health", &[])?;
        let raw = self.send::<()>(Method::GET, url, None).await?;
        Ok(serde_json::from_value(raw.data).unwrap_or(HealthStatus {
            status: "ok".into(),
        }))
    }

    /// `GET /calander`
    pub async fn list_classes(&self, query: &ClassQuery) -> Result<Page<ClassRecord>, ClientError> {
        self.get_page("/calander", &query.to_params()).await
    }

    /// `GET /calander/{id}`
    pub async fn get_class(&self, id: &str) -> Result<ClassRecord, ClientError> {
        let envelope = self
            .get_envelope(&format!("/calander/{}", encode(id)), &[])
            .await?;
        Ok(envelope.data)
    }

    /// `POST /calander`
    pub async fn create_class(
        &self,
        request: &CreateClassRequest,
    ) -> Result<Envelope<CreatedClass>, ClientError> {
        self.write(Method::POST, "/calander", &[], Some(request))
            .await
    }

    /// `PUT /calander/{id}`
    pub async fn update_class(
        &self,
        id: &str,
        request: &UpdateClassRequest,
    ) -> Result<Envelope<Value>, ClientError> {
        self.write(
            Method::PUT,
            &format!("/calander/{}", encode(id)),
            &[],
            Some(request),
        )
        .await
    }

    /// `PATCH /calander/{id}/status`
    pub async fn update_class_status(
        &self,
        id: &str,
        status: ClassStatus,
    ) -> Result<Envelope<Value>, ClientError> {
        self.write(
            Method::PATCH,
            &format!("/calander/{}/status", encode(id)),
            &[],
            Some(&serde_json::json!({ "status": status })),
        )
        .await
    }

    /// `DELETE /calander/{id}`
    pub async fn delete_class(&self, id: &str) -> Result<Envelope<Value>, ClientError> {
        self.write::<(), _>(
            Method::DELETE,
            &format!("/calander/{}", encode(id)),
            &[],
            None,
        )
        .await
    }

    /// `GET /calander/{id}/instances`
    pub async fn class_instances(
        &self,
        id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<ClassInstance>, ClientError> {
        let mut params = Vec::new();
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        self.get_page(&format!("/calander/{}/instances", encode(id)), &params)
            .await
    }

    /// `POST /calander/{id}/regenerate`
    pub async fn regenerate_instances(&self, id: &str) -> Result<u64, ClientError> {
        let envelope: Envelope<Option<RegeneratedInstances>> = self
            .write::<(), _>(
                Method::POST,
                &format!("/calander/{}/regenerate", encode(id)),
                &[],
                None,
            )
            .await?;
        Ok(envelope.data.map(|data| data.instance_count).unwrap_or(0))
    }

    /// `GET /calander/instances`
    pub async fn instances_in_range(
        &self,
        query: &RangeQuery,
    ) -> Result<Vec<ClassInstance>, ClientError> {
        let envelope: Envelope<Option<Vec<ClassInstance>>> = self
            .get_envelope("/calander/instances", &query.to_params())
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// `PATCH /calander/instance/{id}`
    pub async fn update_instance(
        &self,
        instance_id: &str,
        request: &UpdateInstanceRequest,
    ) -> Result<Envelope<Value>, ClientError> {
        self.write(
            Method::PATCH,
            &format!("/calander/instance/{}", encode(instance_id)),
            &[],
            Some(request),
        )
        .await
    }

    /// `PUT /calander/{classId}/instances/specific?scheduledDate=&startTime=`
    pub async fn update_specific_instance(
        &self,
        class_id: &str,
        scheduled_date: NaiveDate,
        start_time: Option<&str>,
        request: &UpdateInstanceRequest,
    ) -> Result<Envelope<Value>, ClientError> {
        let mut params = vec![(
            "scheduledDate",
            scheduled_date.format(api_date::FORMAT).to_string(),
        )];
        if let Some(start_time) = start_time.filter(|s| !s.is_empty()) {
            params.push(("startTime", start_time.to_string()));
        }
        self.write(
            Method::PUT,
            &format!("/calander/{}/instances/specific", encode(class_id)),
            &params,
            Some(request),
        )
        .await
    }

    /// `GET /calander/calendar`
    pub async fn calendar_view(&self, query: &RangeQuery) -> Result<Vec<CalendarItem>, ClientError> {
        let envelope: Envelope<Option<Vec<Value>>> = self
            .get_envelope("/calander/calendar", &query.to_params())
            .await?;
        let items = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<CalendarItem>(item) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable calendar item");
                    None
                }
            })
            .collect();
        Ok(items)
    }
}

/// Ids come from upstream payloads; keep them from escaping their path
/// segment.
fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
