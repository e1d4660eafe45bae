//! Backend client: the `ResearchBackend` trait and its implementations.
//!
//! The backend does all the heavy lifting (PDF parsing, LLM calls, arXiv
//! search). This module only shapes requests and decodes responses. It does
//! not know about supersession; flow state machines decide whether a
//! completed call still matters.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::{BackendError, ConfigError};
use crate::types::{
    DocumentHandle, DocumentUpload, ExplanationPayload, Level, PapersResponse, RoadmapResponse,
};

/// Remote operations offered by the research backend.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    /// Generate a concept roadmap toward `topic`.
    async fn fetch_roadmap(&self, topic: &str) -> Result<RoadmapResponse, BackendError>;

    /// List papers for one roadmap concept. `count` is advisory.
    async fn fetch_papers(&self, concept: &str, count: u32)
    -> Result<PapersResponse, BackendError>;

    /// Upload a document and return its handle.
    async fn upload_document(&self, upload: DocumentUpload)
    -> Result<DocumentHandle, BackendError>;

    /// Request the explanation of an uploaded document at the given tier.
    async fn explain(
        &self,
        document: &DocumentHandle,
        level: Level,
    ) -> Result<ExplanationPayload, BackendError>;

    /// Check that the backend is reachable.
    async fn health(&self) -> Result<(), BackendError>;
}

// ── HTTP Backend ──────────────────────────────────────────────

/// `ResearchBackend` over HTTP/JSON using reqwest.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        config.parsed_base_url()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "Backend returned an error status");
            return Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| BackendError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: serde_json::Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl ResearchBackend for HttpBackend {
    async fn fetch_roadmap(&self, topic: &str) -> Result<RoadmapResponse, BackendError> {
        let endpoint = "/topic/roadmap";
        debug!(topic, "Requesting roadmap");
        let request = self
            .client
            .post(self.url(endpoint))
            .json(&json!({ "topic": topic }));
        let value = self.send(endpoint, request).await?;
        decode(endpoint, value)
    }

    async fn fetch_papers(
        &self,
        concept: &str,
        count: u32,
    ) -> Result<PapersResponse, BackendError> {
        let endpoint = "/topic/papers";
        debug!(concept, count, "Requesting papers");
        let request = self
            .client
            .post(self.url(endpoint))
            .json(&json!({ "concept": concept, "count": count }));
        let value = self.send(endpoint, request).await?;
        decode(endpoint, value)
    }

    async fn upload_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<DocumentHandle, BackendError> {
        let endpoint = "/upload";
        debug!(file = %upload.file_name, bytes = upload.bytes.len(), "Uploading document");
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/pdf")
            .map_err(|e| BackendError::Transport {
                endpoint: endpoint.to_string(),
                message: format!("MIME error: {e}"),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let request = self.client.post(self.url(endpoint)).multipart(form);
        let value = self.send(endpoint, request).await?;
        decode(endpoint, value)
    }

    async fn explain(
        &self,
        document: &DocumentHandle,
        level: Level,
    ) -> Result<ExplanationPayload, BackendError> {
        let endpoint = format!(
            "/explain/{}/{}",
            level.endpoint_segment(),
            urlencoding::encode(&document.file_id)
        );
        debug!(%document, %level, "Requesting explanation");
        let request = self.client.post(self.url(&endpoint));
        let value = self.send(&endpoint, request).await?;

        if let Some(tag) = value.get("level").and_then(|v| v.as_str())
            && tag != level.as_str()
        {
            return Err(BackendError::Decode {
                endpoint,
                message: format!("requested {level} explanation, received {tag}"),
            });
        }

        ExplanationPayload::from_json(level, value).map_err(|e| BackendError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }

    async fn health(&self) -> Result<(), BackendError> {
        let request = self.client.get(self.url("/"));
        self.send("/", request).await.map(|_| ())
    }
}

// ── Mock Backend ──────────────────────────────────────────────

/// A call observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Roadmap { topic: String },
    Papers { concept: String, count: u32 },
    Upload { file_name: String },
    Explain { file_id: String, level: Level },
    Health,
}

struct Reply<T> {
    delay: Duration,
    result: Result<T, BackendError>,
}

type ReplyQueue<T> = Mutex<VecDeque<Reply<T>>>;

/// A backend that replays queued responses, optionally after a delay.
///
/// Paper replies are keyed by concept so that concurrent requests for
/// different concepts settle in a controlled order.
#[derive(Default)]
pub struct MockBackend {
    roadmaps: ReplyQueue<RoadmapResponse>,
    papers: Mutex<HashMap<String, VecDeque<Reply<PapersResponse>>>>,
    uploads: ReplyQueue<DocumentHandle>,
    explanations: ReplyQueue<ExplanationPayload>,
    calls: Mutex<Vec<BackendCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unqueued(endpoint: &str) -> BackendError {
    BackendError::Transport {
        endpoint: endpoint.to_string(),
        message: "no mock response queued".to_string(),
    }
}

async fn deliver<T>(reply: Option<Reply<T>>, endpoint: &str) -> Result<T, BackendError> {
    match reply {
        Some(reply) => {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.result
        }
        None => Err(unqueued(endpoint)),
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_roadmap(&self, result: Result<RoadmapResponse, BackendError>) -> &Self {
        self.queue_roadmap_after(Duration::ZERO, result)
    }

    pub fn queue_roadmap_after(
        &self,
        delay: Duration,
        result: Result<RoadmapResponse, BackendError>,
    ) -> &Self {
        lock(&self.roadmaps).push_back(Reply { delay, result });
        self
    }

    pub fn queue_papers(
        &self,
        concept: &str,
        result: Result<PapersResponse, BackendError>,
    ) -> &Self {
        self.queue_papers_after(concept, Duration::ZERO, result)
    }

    pub fn queue_papers_after(
        &self,
        concept: &str,
        delay: Duration,
        result: Result<PapersResponse, BackendError>,
    ) -> &Self {
        lock(&self.papers)
            .entry(concept.to_string())
            .or_default()
            .push_back(Reply { delay, result });
        self
    }

    pub fn queue_upload(&self, result: Result<DocumentHandle, BackendError>) -> &Self {
        self.queue_upload_after(Duration::ZERO, result)
    }

    pub fn queue_upload_after(
        &self,
        delay: Duration,
        result: Result<DocumentHandle, BackendError>,
    ) -> &Self {
        lock(&self.uploads).push_back(Reply { delay, result });
        self
    }

    pub fn queue_explanation(&self, result: Result<ExplanationPayload, BackendError>) -> &Self {
        self.queue_explanation_after(Duration::ZERO, result)
    }

    pub fn queue_explanation_after(
        &self,
        delay: Duration,
        result: Result<ExplanationPayload, BackendError>,
    ) -> &Self {
        lock(&self.explanations).push_back(Reply { delay, result });
        self
    }

    /// Every call made so far, in call order.
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: BackendCall) {
        lock(&self.calls).push(call);
    }

    /// A transport failure, as a real network error would surface.
    pub fn transport_error(endpoint: &str) -> BackendError {
        BackendError::Transport {
            endpoint: endpoint.to_string(),
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl ResearchBackend for MockBackend {
    async fn fetch_roadmap(&self, topic: &str) -> Result<RoadmapResponse, BackendError> {
        self.record(BackendCall::Roadmap {
            topic: topic.to_string(),
        });
        let reply = lock(&self.roadmaps).pop_front();
        deliver(reply, "/topic/roadmap").await
    }

    async fn fetch_papers(
        &self,
        concept: &str,
        count: u32,
    ) -> Result<PapersResponse, BackendError> {
        self.record(BackendCall::Papers {
            concept: concept.to_string(),
            count,
        });
        let reply = lock(&self.papers)
            .get_mut(concept)
            .and_then(|queue| queue.pop_front());
        deliver(reply, "/topic/papers").await
    }

    async fn upload_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<DocumentHandle, BackendError> {
        self.record(BackendCall::Upload {
            file_name: upload.file_name,
        });
        let reply = lock(&self.uploads).pop_front();
        deliver(reply, "/upload").await
    }

    async fn explain(
        &self,
        document: &DocumentHandle,
        level: Level,
    ) -> Result<ExplanationPayload, BackendError> {
        self.record(BackendCall::Explain {
            file_id: document.file_id.clone(),
            level,
        });
        let reply = lock(&self.explanations).pop_front();
        deliver(reply, "/explain").await
    }

    async fn health(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Health);
        Ok(())
    }
}
