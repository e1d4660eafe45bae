//! Core data model shared by the backend client, the flow state machines,
//! and the renderer.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BackendError;

// ── Roadmap ───────────────────────────────────────────────────

/// A single step in a generated learning roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub concept: String,
    pub explanation: String,
}

/// Response of `POST /topic/roadmap`.
///
/// An empty or missing `conceptual_path` is a successful response meaning
/// no roadmap could be produced, not a transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub conceptual_path: Vec<ConceptNode>,
}

// ── Papers ────────────────────────────────────────────────────

/// A paper suggested for one concept of the roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    /// Publication year. The backend sends it as a string; numbers are accepted too.
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    pub stage: String,
    pub why_exists: String,
    pub read_after: String,
    pub link: String,
}

/// Response of `POST /topic/papers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PapersResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(default)]
    pub papers_available: bool,
    #[serde(default)]
    pub papers: Vec<Paper>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

// ── Documents & explanation tiers ─────────────────────────────

/// Opaque handle the backend returns after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub file_id: String,
}

impl DocumentHandle {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_id)
    }
}

/// A document ready to be sent to `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a document from disk, keeping only the file name for the form part.
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| BackendError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Whether the file name carries a `.pdf` extension (case-insensitive).
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".pdf")
    }
}

/// Explanation depth for an uploaded document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Easy,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Easy, Level::Intermediate, Level::Advanced];

    /// The backend path segment under `/explain/`.
    pub fn endpoint_segment(&self) -> &'static str {
        match self {
            Level::Easy => "easy_llm",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Easy => "easy",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Level::Easy),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(format!(
                "unknown level '{other}' (expected easy, intermediate, or advanced)"
            )),
        }
    }
}

/// A figure extracted from the paper, with a server-relative image path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figure {
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasyExplanation {
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediateExplanation {
    pub method_explanation: String,
    #[serde(default)]
    pub figures: Vec<Figure>,
    #[serde(default)]
    pub figures_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedExplanation {
    pub methodology_text: String,
    #[serde(default)]
    pub equation_explanations: Vec<String>,
    pub results_explanation: String,
}

/// Tier-specific explanation body. Shapes are not interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum ExplanationPayload {
    Easy(EasyExplanation),
    Intermediate(IntermediateExplanation),
    Advanced(AdvancedExplanation),
}

impl ExplanationPayload {
    pub fn level(&self) -> Level {
        match self {
            ExplanationPayload::Easy(_) => Level::Easy,
            ExplanationPayload::Intermediate(_) => Level::Intermediate,
            ExplanationPayload::Advanced(_) => Level::Advanced,
        }
    }

    /// Decode a response body for the tier that was requested.
    pub fn from_json(level: Level, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match level {
            Level::Easy => ExplanationPayload::Easy(serde_json::from_value(value)?),
            Level::Intermediate => ExplanationPayload::Intermediate(serde_json::from_value(value)?),
            Level::Advanced => ExplanationPayload::Advanced(serde_json::from_value(value)?),
        })
    }
}

/// A payload together with the document and level active when it was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub document: DocumentHandle,
    pub level: Level,
    pub payload: ExplanationPayload,
}
