use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use url::Url;

use engine_logging::{engine_debug, engine_trace};
use intel_core::{ItemId, ItemPage, Job, Source, SourceId, DEFAULT_BASE_URL};

use crate::{ApiError, FailureKind, ItemQuery, RefreshReceipt, Summary};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: match Url::parse(DEFAULT_BASE_URL) {
                Ok(url) => url,
                Err(_) => unreachable!("default base url is a valid literal"),
            },
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

/// The remote collaborator behind the dashboard.
#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<Source>, ApiError>;

    async fn create_source(&self, address: &str) -> Result<Source, ApiError>;

    async fn delete_source(&self, source_id: SourceId) -> Result<(), ApiError>;

    /// Fire and forget; the effect shows up later as a job.
    async fn trigger_refresh(&self, source_id: SourceId) -> Result<RefreshReceipt, ApiError>;

    async fn list_items(&self, source_id: SourceId, query: &ItemQuery)
        -> Result<ItemPage, ApiError>;

    /// `None` when the source has never had a job.
    async fn latest_job(&self, source_id: SourceId) -> Result<Option<Job>, ApiError>;

    async fn summarize(&self, item_id: ItemId) -> Result<Summary, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.settings.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::new(
                    FailureKind::InvalidUrl,
                    format!("{} cannot be a base", self.settings.base_url),
                )
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let content_length = response.content_length();
        if let Some(len) = content_length {
            if len > self.settings.max_body_bytes {
                return Err(self.too_large(Some(len)));
            }
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_body_bytes {
                return Err(self.too_large(Some(next_len)));
            }
            body.extend_from_slice(&chunk);
        }

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            engine_debug!("{status} from backend: {text}");
            return Err(ApiError::new(
                FailureKind::HttpStatus {
                    status: status.as_u16(),
                    body: text,
                },
                status.to_string(),
            ));
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        if log::log_enabled!(log::Level::Trace) {
            engine_trace!("decoding {} byte response", body.len());
        }
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }

    fn too_large(&self, actual: Option<u64>) -> ApiError {
        ApiError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_body_bytes,
                actual,
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl ApiClient for ReqwestApiClient {
    async fn list_sources(&self) -> Result<Vec<Source>, ApiError> {
        let url = self.endpoint(&["channels"])?;
        self.send_json(self.client.get(url)).await
    }

    async fn create_source(&self, address: &str) -> Result<Source, ApiError> {
        let url = self.endpoint(&["channels"])?;
        let payload = serde_json::to_vec(&serde_json::json!({ "tg_url": address }))
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.send_json(request).await
    }

    async fn delete_source(&self, source_id: SourceId) -> Result<(), ApiError> {
        let url = self.endpoint(&["channels", &source_id.to_string()])?;
        self.send(self.client.delete(url)).await.map(|_| ())
    }

    async fn trigger_refresh(&self, source_id: SourceId) -> Result<RefreshReceipt, ApiError> {
        let url = self.endpoint(&["channels", &source_id.to_string(), "fetch"])?;
        self.send_json(self.client.post(url)).await
    }

    async fn list_items(
        &self,
        source_id: SourceId,
        query: &ItemQuery,
    ) -> Result<ItemPage, ApiError> {
        let mut url = self.endpoint(&["channels", &source_id.to_string(), "posts"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(text) = query.query.as_deref().filter(|q| !q.is_empty()) {
                pairs.append_pair("query", text);
            }
            pairs
                .append_pair("page", &query.page.max(1).to_string())
                .append_pair("page_size", &query.page_size.to_string());
        }
        self.send_json(self.client.get(url)).await
    }

    async fn latest_job(&self, source_id: SourceId) -> Result<Option<Job>, ApiError> {
        let url = self.endpoint(&["channels", &source_id.to_string(), "jobs", "latest"])?;
        self.send_json(self.client.get(url)).await
    }

    async fn summarize(&self, item_id: ItemId) -> Result<Summary, ApiError> {
        let url = self.endpoint(&["posts", &item_id.to_string(), "summarize"])?;
        self.send_json(self.client.post(url)).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
