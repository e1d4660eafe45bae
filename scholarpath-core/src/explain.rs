//! Explain-paper flow: upload a document, pick a level, fetch that tier.
//!
//! Like the roadmap navigator this is a pure state machine driven by
//! tickets. The document handle lives here, owned by the flow instance.

use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::types::{DocumentHandle, Explanation, ExplanationPayload, Level};

pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload document. Please try again.";
pub const EXPLAIN_FAILED_MESSAGE: &str = "Failed to generate explanation. Please try again.";

/// A dispatched upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    generation: u64,
}

/// A dispatched explanation request, carrying its dispatch-time document and level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainTicket {
    pub document: DocumentHandle,
    pub level: Level,
}

#[derive(Debug, Clone, Default)]
pub struct ExplainFlow {
    document: Option<DocumentHandle>,
    level: Level,
    explanation: Option<Explanation>,
    pending: Option<ExplainTicket>,
    uploading: bool,
    upload_generation: u64,
    error: Option<&'static str>,
}

impl ExplainFlow {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Start an upload. A newer upload supersedes any still in flight.
    pub fn begin_upload(&mut self) -> UploadTicket {
        self.upload_generation += 1;
        self.uploading = true;
        UploadTicket {
            generation: self.upload_generation,
        }
    }

    /// Apply an upload outcome. Returns `false` if a newer upload superseded it.
    ///
    /// On success the document is replaced unconditionally and the stored
    /// explanation is cleared.
    pub fn settle_upload(
        &mut self,
        ticket: &UploadTicket,
        result: Result<DocumentHandle, BackendError>,
    ) -> bool {
        if ticket.generation != self.upload_generation {
            debug!(generation = ticket.generation, "Discarding superseded upload");
            return false;
        }
        self.uploading = false;
        match result {
            Ok(document) => {
                info!(%document, "Document uploaded");
                self.document = Some(document);
                self.explanation = None;
                self.error = None;
            }
            Err(e) => {
                warn!(error = %e, "Upload failed");
                self.error = Some(UPLOAD_FAILED_MESSAGE);
            }
        }
        true
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// Start explaining the current document at the current level.
    ///
    /// No-op without a document or while an explanation is already loading.
    pub fn begin_explain(&mut self) -> Option<ExplainTicket> {
        if self.pending.is_some() {
            debug!("Explanation already in flight");
            return None;
        }
        let document = self.document.clone()?;
        let ticket = ExplainTicket {
            document,
            level: self.level,
        };
        info!(document = %ticket.document, level = %ticket.level, "Requesting explanation");
        self.error = None;
        self.pending = Some(ticket.clone());
        Some(ticket)
    }

    /// Apply an explanation outcome. Loading is always cleared for the pending ticket.
    ///
    /// The payload is stored under the ticket's document and level, not the
    /// ones active now. A payload whose tier differs from the ticket's level
    /// is treated as a failure.
    pub fn settle_explain(
        &mut self,
        ticket: &ExplainTicket,
        result: Result<ExplanationPayload, BackendError>,
    ) -> bool {
        if self.pending.as_ref() != Some(ticket) {
            debug!(document = %ticket.document, "Discarding unexpected explanation");
            return false;
        }
        self.pending = None;

        match result {
            Ok(payload) if payload.level() == ticket.level => {
                info!(document = %ticket.document, level = %ticket.level, "Explanation ready");
                self.explanation = Some(Explanation {
                    document: ticket.document.clone(),
                    level: ticket.level,
                    payload,
                });
            }
            Ok(payload) => {
                warn!(
                    requested = %ticket.level,
                    received = %payload.level(),
                    "Explanation tier mismatch"
                );
                self.error = Some(EXPLAIN_FAILED_MESSAGE);
            }
            Err(e) => {
                warn!(document = %ticket.document, error = %e, "Explanation failed");
                self.error = Some(EXPLAIN_FAILED_MESSAGE);
            }
        }
        true
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn uploading(&self) -> bool {
        self.uploading
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Whether `begin_explain` would dispatch right now.
    pub fn can_explain(&self) -> bool {
        self.document.is_some() && self.pending.is_none()
    }

    /// The last stored explanation, regardless of the selected level.
    pub fn explanation(&self) -> Option<&Explanation> {
        self.explanation.as_ref()
    }

    /// The explanation to render: only when it matches the selected level
    /// and no request is loading.
    pub fn visible_explanation(&self) -> Option<&Explanation> {
        if self.loading() {
            return None;
        }
        self.explanation.as_ref().filter(|e| e.level == self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdvancedExplanation, EasyExplanation};

    fn easy(text: &str) -> ExplanationPayload {
        ExplanationPayload::Easy(EasyExplanation {
            explanation: text.to_string(),
        })
    }

    fn advanced() -> ExplanationPayload {
        ExplanationPayload::Advanced(AdvancedExplanation {
            methodology_text: "m".into(),
            equation_explanations: vec!["e1".into()],
            results_explanation: "r".into(),
        })
    }

    fn uploaded(file_id: &str) -> ExplainFlow {
        let mut flow = ExplainFlow::default();
        let ticket = flow.begin_upload();
        assert!(flow.settle_upload(&ticket, Ok(DocumentHandle::new(file_id))));
        flow
    }

    fn failure() -> BackendError {
        BackendError::Status {
            endpoint: "/explain/easy_llm/doc".into(),
            status: 500,
        }
    }

    #[test]
    fn test_explain_without_document_is_noop() {
        let mut flow = ExplainFlow::default();
        assert!(!flow.can_explain());
        assert!(flow.begin_explain().is_none());
        assert!(!flow.loading());
        assert!(flow.error().is_none());
    }

    #[test]
    fn test_explain_while_loading_is_noop() {
        let mut flow = uploaded("doc-1");
        assert!(flow.begin_explain().is_some());
        assert!(flow.loading());
        assert!(flow.begin_explain().is_none());
    }

    #[test]
    fn test_explain_success_tags_dispatch_level() {
        let mut flow = uploaded("doc-1");
        let ticket = flow.begin_explain().unwrap();
        assert_eq!(ticket.level, Level::Easy);

        assert!(flow.settle_explain(&ticket, Ok(easy("A friendly summary"))));
        assert!(!flow.loading());
        let shown = flow.visible_explanation().unwrap();
        assert_eq!(shown.level, Level::Easy);
        assert_eq!(shown.document, DocumentHandle::new("doc-1"));
    }

    #[test]
    fn test_level_change_mid_request_hides_stale_tier() {
        let mut flow = uploaded("doc-1");
        flow.set_level(Level::Advanced);
        let ticket = flow.begin_explain().unwrap();
        flow.set_level(Level::Easy);

        flow.settle_explain(&ticket, Ok(advanced()));
        let stored = flow.explanation().unwrap();
        assert_eq!(stored.level, Level::Advanced);
        // Selector says easy, payload is advanced: nothing renders.
        assert!(flow.visible_explanation().is_none());

        flow.set_level(Level::Advanced);
        assert!(flow.visible_explanation().is_some());
    }

    #[test]
    fn test_failure_resets_loading_and_sets_error() {
        let mut flow = uploaded("doc-1");
        let ticket = flow.begin_explain().unwrap();
        flow.settle_explain(&ticket, Err(failure()));
        assert!(!flow.loading());
        assert_eq!(flow.error(), Some(EXPLAIN_FAILED_MESSAGE));
        assert!(flow.visible_explanation().is_none());
        // Recoverable by explaining again.
        assert!(flow.begin_explain().is_some());
        assert!(flow.error().is_none());
    }

    #[test]
    fn test_wrong_tier_payload_is_failure() {
        let mut flow = uploaded("doc-1");
        let ticket = flow.begin_explain().unwrap();
        flow.settle_explain(&ticket, Ok(advanced()));
        assert!(flow.explanation().is_none());
        assert_eq!(flow.error(), Some(EXPLAIN_FAILED_MESSAGE));
    }

    #[test]
    fn test_second_upload_before_explanation_settles() {
        let mut flow = uploaded("doc-1");
        let ticket = flow.begin_explain().unwrap();

        let second = flow.begin_upload();
        flow.settle_upload(&second, Ok(DocumentHandle::new("doc-2")));
        assert_eq!(flow.document(), Some(&DocumentHandle::new("doc-2")));
        assert!(flow.explanation().is_none());

        flow.settle_explain(&ticket, Ok(easy("About the first document")));
        let stored = flow.explanation().unwrap();
        assert_eq!(stored.document, DocumentHandle::new("doc-1"));
        assert!(!flow.loading());
    }

    #[test]
    fn test_upload_clears_previous_explanation() {
        let mut flow = uploaded("doc-1");
        let ticket = flow.begin_explain().unwrap();
        flow.settle_explain(&ticket, Ok(easy("First summary")));
        assert!(flow.explanation().is_some());

        let upload = flow.begin_upload();
        assert!(flow.uploading());
        flow.settle_upload(&upload, Ok(DocumentHandle::new("doc-2")));
        assert!(!flow.uploading());
        assert!(flow.explanation().is_none());
    }

    #[test]
    fn test_superseded_upload_is_discarded() {
        let mut flow = ExplainFlow::default();
        let first = flow.begin_upload();
        let second = flow.begin_upload();
        assert!(flow.settle_upload(&second, Ok(DocumentHandle::new("new"))));
        assert!(!flow.settle_upload(&first, Ok(DocumentHandle::new("old"))));
        assert_eq!(flow.document(), Some(&DocumentHandle::new("new")));
    }

    #[test]
    fn test_failed_upload_keeps_previous_document() {
        let mut flow = uploaded("doc-1");
        let ticket = flow.begin_upload();
        flow.settle_upload(&ticket, Err(failure()));
        assert_eq!(flow.document(), Some(&DocumentHandle::new("doc-1")));
        assert_eq!(flow.error(), Some(UPLOAD_FAILED_MESSAGE));
    }

    #[test]
    fn test_new_with_default_level() {
        let flow = ExplainFlow::new(Level::Intermediate);
        assert_eq!(flow.level(), Level::Intermediate);
    }
}
