//! Image analysis collaborator.
//!
//! The worker treats image analysis as an opaque external service with three
//! operations: label detection (bounded result count), face detection, and
//! celebrity recognition. `HttpVisionClient` speaks a JSON-over-HTTP contract
//! against a configured endpoint; tests substitute their own `VisionAnalyzer`.

use crate::config::VisionConfig;
use crate::error::PipelineError;
use crate::events::ObjectRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const COLLABORATOR: &str = "vision";

/// Analysis facts for one image. Transient: lives only in worker memory for
/// the duration of one invocation.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub labels: Vec<String>,
    pub face_count: usize,
    pub celebrities: Vec<String>,
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Detect up to `max_labels` semantic labels for the referenced image.
    async fn detect_labels(
        &self,
        image: &ObjectRef,
        max_labels: u32,
    ) -> Result<Vec<String>, PipelineError>;

    /// Count faces in the referenced image (full-attribute request).
    async fn detect_faces(&self, image: &ObjectRef) -> Result<usize, PipelineError>;

    /// Recognize named identities in the referenced image.
    async fn recognize_celebrities(&self, image: &ObjectRef)
        -> Result<Vec<String>, PipelineError>;
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    bucket: &'a str,
    key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_labels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    labels: Vec<NamedEntity>,
}

#[derive(Debug, Deserialize)]
struct FacesResponse {
    faces: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CelebritiesResponse {
    celebrities: Vec<NamedEntity>,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

/// JSON-over-HTTP vision client with bearer auth and a per-request timeout.
pub struct HttpVisionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpVisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        request: &Req,
    ) -> Result<Resp, PipelineError> {
        let url = format!("{}/{}", self.endpoint, operation);
        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            PipelineError::upstream(COLLABORATOR, e.status().map(|s| s.as_u16()), e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                COLLABORATOR,
                Some(status.as_u16()),
                format!("{} returned {}", operation, status),
            ));
        }

        response.json().await.map_err(|e| {
            PipelineError::upstream(
                COLLABORATOR,
                Some(status.as_u16()),
                format!("{} response body: {}", operation, e),
            )
        })
    }
}

#[async_trait]
impl VisionAnalyzer for HttpVisionClient {
    async fn detect_labels(
        &self,
        image: &ObjectRef,
        max_labels: u32,
    ) -> Result<Vec<String>, PipelineError> {
        let request = ImageRequest {
            bucket: &image.bucket,
            key: &image.key,
            max_labels: Some(max_labels),
            attributes: None,
        };
        let response: LabelsResponse = self.post("detect-labels", &request).await?;
        Ok(response.labels.into_iter().map(|l| l.name).collect())
    }

    async fn detect_faces(&self, image: &ObjectRef) -> Result<usize, PipelineError> {
        let request = ImageRequest {
            bucket: &image.bucket,
            key: &image.key,
            max_labels: None,
            attributes: Some("ALL"),
        };
        let response: FacesResponse = self.post("detect-faces", &request).await?;
        Ok(response.faces.len())
    }

    async fn recognize_celebrities(
        &self,
        image: &ObjectRef,
    ) -> Result<Vec<String>, PipelineError> {
        let request = ImageRequest {
            bucket: &image.bucket,
            key: &image.key,
            max_labels: None,
            attributes: None,
        };
        let response: CelebritiesResponse = self.post("recognize-celebrities", &request).await?;
        Ok(response.celebrities.into_iter().map(|c| c.name).collect())
    }
}
