//! # ScholarPath Core
//!
//! Core library for ScholarPath, a client for a research-guidance backend.
//! Provides the backend client, the roadmap navigation and explain-paper
//! state machines, the session that drives them, text sanitization for
//! LLM output, configuration, and fundamental types.

pub mod client;
pub mod config;
pub mod error;
pub mod explain;
pub mod navigation;
pub mod sanitize;
pub mod session;
pub mod types;

// Re-export commonly used types at the crate root.
pub use client::{BackendCall, HttpBackend, MockBackend, ResearchBackend};
pub use config::{GuideConfig, config_exists, load_config};
pub use error::{BackendError, ConfigError};
pub use explain::ExplainFlow;
pub use navigation::{NavigationState, PaperStage, RoadmapNavigator, RoadmapStage};
pub use sanitize::sanitize;
pub use session::{FlowEvent, FlowEvents, Session};
pub use types::{
    ConceptNode, DocumentHandle, DocumentUpload, Explanation, ExplanationPayload, Figure, Level,
    Paper, PapersResponse, RoadmapResponse,
};
