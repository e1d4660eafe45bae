//! Session: runs backend calls concurrently, applies results in settle order.
//!
//! A `Session` owns one roadmap navigator and one explain flow. User actions
//! ask the relevant state machine for a ticket; if one is issued the backend
//! call runs on a spawned tokio task whose outcome comes back as a
//! [`FlowEvent`]. Events are applied with [`Session::apply`] on the task that
//! owns the session, so state is never shared across tasks.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::ResearchBackend;
use crate::config::GuideConfig;
use crate::error::BackendError;
use crate::explain::{ExplainFlow, ExplainTicket, UploadTicket};
use crate::navigation::{PapersTicket, RoadmapNavigator, RoadmapTicket};
use crate::types::{
    DocumentHandle, DocumentUpload, ExplanationPayload, Level, PapersResponse, RoadmapResponse,
};

/// The outcome of one backend call, tagged with the ticket that dispatched it.
#[derive(Debug)]
pub enum FlowEvent {
    RoadmapSettled {
        ticket: RoadmapTicket,
        result: Result<RoadmapResponse, BackendError>,
    },
    PapersSettled {
        ticket: PapersTicket,
        result: Result<PapersResponse, BackendError>,
    },
    UploadSettled {
        ticket: UploadTicket,
        result: Result<DocumentHandle, BackendError>,
    },
    ExplainSettled {
        ticket: ExplainTicket,
        result: Result<ExplanationPayload, BackendError>,
    },
}

/// Receiving half of a session's event channel.
///
/// Kept separate from [`Session`] so a caller can wait on events and on user
/// input at the same time while still mutating the session in either branch.
pub struct FlowEvents {
    rx: mpsc::UnboundedReceiver<FlowEvent>,
}

impl FlowEvents {
    /// Wait for the next settled call.
    pub async fn recv(&mut self) -> Option<FlowEvent> {
        self.rx.recv().await
    }
}

pub struct Session<B: ResearchBackend + ?Sized + 'static> {
    backend: Arc<B>,
    navigator: RoadmapNavigator,
    explain: ExplainFlow,
    tx: mpsc::UnboundedSender<FlowEvent>,
    in_flight: usize,
}

impl<B: ResearchBackend + ?Sized + 'static> Session<B> {
    pub fn new(backend: Arc<B>, config: &GuideConfig) -> (Self, FlowEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            backend,
            navigator: RoadmapNavigator::new(config.roadmap.paper_count),
            explain: ExplainFlow::new(config.explain.default_level),
            tx,
            in_flight: 0,
        };
        (session, FlowEvents { rx })
    }

    pub fn navigator(&self) -> &RoadmapNavigator {
        &self.navigator
    }

    pub fn explain_flow(&self) -> &ExplainFlow {
        &self.explain
    }

    /// Number of spawned calls whose events have not been applied yet,
    /// including superseded ones.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn spawn<F>(&mut self, call: F)
    where
        F: std::future::Future<Output = FlowEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The receiver only disappears when the session owner is gone.
            let _ = tx.send(call.await);
        });
    }

    // ── Roadmap ───────────────────────────────────────────────

    /// Generate a roadmap for `topic`. Returns `false` for blank topics.
    pub fn generate_roadmap(&mut self, topic: &str) -> bool {
        let Some(ticket) = self.navigator.generate_roadmap(topic) else {
            return false;
        };
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            let result = backend.fetch_roadmap(&ticket.topic).await;
            FlowEvent::RoadmapSettled { ticket, result }
        });
        true
    }

    /// Select a concept by name. Returns `false` if no roadmap is ready.
    pub fn select_concept(&mut self, concept: &str) -> bool {
        let ticket = self.navigator.select_concept(concept);
        self.dispatch_papers(ticket)
    }

    /// Select a concept by its 1-based roadmap position.
    pub fn select_concept_at(&mut self, position: usize) -> bool {
        let ticket = self.navigator.select_concept_at(position);
        self.dispatch_papers(ticket)
    }

    fn dispatch_papers(&mut self, ticket: Option<PapersTicket>) -> bool {
        let Some(ticket) = ticket else {
            return false;
        };
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            let result = backend.fetch_papers(&ticket.concept, ticket.count).await;
            FlowEvent::PapersSettled { ticket, result }
        });
        true
    }

    pub fn set_paper_count(&mut self, count: u32) -> u32 {
        self.navigator.set_paper_count(count)
    }

    // ── Explain ───────────────────────────────────────────────

    pub fn upload(&mut self, upload: DocumentUpload) {
        let ticket = self.explain.begin_upload();
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            let result = backend.upload_document(upload).await;
            FlowEvent::UploadSettled { ticket, result }
        });
    }

    pub fn set_level(&mut self, level: Level) {
        self.explain.set_level(level);
    }

    /// Explain the current document. Returns `false` without a document or while loading.
    pub fn explain(&mut self) -> bool {
        let Some(ticket) = self.explain.begin_explain() else {
            return false;
        };
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            let result = backend.explain(&ticket.document, ticket.level).await;
            FlowEvent::ExplainSettled { ticket, result }
        });
        true
    }

    // ── Events ────────────────────────────────────────────────

    /// Apply one settled call. Returns `false` if it had been superseded.
    pub fn apply(&mut self, event: FlowEvent) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        let applied = match event {
            FlowEvent::RoadmapSettled { ticket, result } => {
                self.navigator.settle_roadmap(&ticket, result)
            }
            FlowEvent::PapersSettled { ticket, result } => {
                self.navigator.settle_papers(&ticket, result)
            }
            FlowEvent::UploadSettled { ticket, result } => {
                self.explain.settle_upload(&ticket, result)
            }
            FlowEvent::ExplainSettled { ticket, result } => {
                self.explain.settle_explain(&ticket, result)
            }
        };
        debug!(applied, in_flight = self.in_flight, "Flow event processed");
        applied
    }

    /// Wait for one settled call and apply it.
    ///
    /// Returns `None` when nothing is in flight, otherwise whether the event was applied.
    pub async fn next_event(&mut self, events: &mut FlowEvents) -> Option<bool> {
        if self.in_flight == 0 {
            return None;
        }
        let event = events.recv().await?;
        Some(self.apply(event))
    }

    /// Apply events until every spawned call has settled.
    pub async fn settle_all(&mut self, events: &mut FlowEvents) {
        while self.in_flight > 0 {
            match events.recv().await {
                Some(event) => {
                    self.apply(event);
                }
                None => break,
            }
        }
    }
}
