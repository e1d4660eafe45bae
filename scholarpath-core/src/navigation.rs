//! Roadmap navigation state machine.
//!
//! Owns the staged flow topic -> roadmap -> concept selection -> papers.
//! The machine never performs I/O itself: each transition that needs the
//! backend hands out a ticket, and the caller reports the outcome back with
//! `settle_*`. Tickets carry a generation number, so a completion that was
//! superseded by a newer request of the same kind is discarded.

use tracing::{debug, info, warn};

use crate::config::MAX_PAPER_COUNT;
use crate::error::BackendError;
use crate::types::{ConceptNode, Paper, PapersResponse, RoadmapResponse};

pub const ROADMAP_EMPTY_MESSAGE: &str = "No conceptual roadmap could be generated for this topic.";
pub const ROADMAP_FAILED_MESSAGE: &str = "Failed to generate roadmap. Please try again.";
pub const PAPERS_UNAVAILABLE_MESSAGE: &str = "Papers not available yet for this topic.";
pub const PAPERS_FAILED_MESSAGE: &str = "Failed to fetch papers.";

/// Why a roadmap could not be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadmapFailure {
    /// The backend answered, but with an empty conceptual path.
    Empty,
    /// The request itself failed.
    Transport,
}

impl RoadmapFailure {
    pub fn message(&self) -> &'static str {
        match self {
            RoadmapFailure::Empty => ROADMAP_EMPTY_MESSAGE,
            RoadmapFailure::Transport => ROADMAP_FAILED_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoadmapStage {
    Idle,
    Loading,
    Ready(Vec<ConceptNode>),
    Failed(RoadmapFailure),
}

/// Paper state for the selected concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperStage {
    Loading,
    Ready(Vec<Paper>),
    /// `papers_available = false`: a valid answer, not an error.
    Unavailable,
    Failed,
}

impl PaperStage {
    /// Classify the outcome of a papers request.
    pub fn from_result(result: Result<PapersResponse, BackendError>) -> Self {
        match result {
            Ok(response) if !response.papers_available => PaperStage::Unavailable,
            Ok(response) => PaperStage::Ready(response.papers),
            Err(_) => PaperStage::Failed,
        }
    }

    /// The message shown instead of papers, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            PaperStage::Unavailable => Some(PAPERS_UNAVAILABLE_MESSAGE),
            PaperStage::Failed => Some(PAPERS_FAILED_MESSAGE),
            PaperStage::Loading | PaperStage::Ready(_) => None,
        }
    }
}

/// Flattened view of where the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    RoadmapLoading,
    RoadmapError,
    RoadmapReady,
    PapersLoading,
    PapersReady,
    PapersError,
}

impl std::fmt::Display for NavigationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationState::Idle => write!(f, "idle"),
            NavigationState::RoadmapLoading => write!(f, "roadmap loading"),
            NavigationState::RoadmapError => write!(f, "roadmap error"),
            NavigationState::RoadmapReady => write!(f, "roadmap ready"),
            NavigationState::PapersLoading => write!(f, "papers loading"),
            NavigationState::PapersReady => write!(f, "papers ready"),
            NavigationState::PapersError => write!(f, "papers error"),
        }
    }
}

/// A dispatched roadmap request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadmapTicket {
    generation: u64,
    pub topic: String,
}

/// A dispatched paper request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PapersTicket {
    generation: u64,
    pub concept: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    concept: String,
    papers: PaperStage,
}

#[derive(Debug, Clone)]
pub struct RoadmapNavigator {
    topic: Option<String>,
    roadmap: RoadmapStage,
    selection: Option<Selection>,
    paper_count: u32,
    roadmap_generation: u64,
    papers_generation: u64,
}

impl Default for RoadmapNavigator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl RoadmapNavigator {
    pub fn new(paper_count: u32) -> Self {
        Self {
            topic: None,
            roadmap: RoadmapStage::Idle,
            selection: None,
            paper_count: paper_count.clamp(1, MAX_PAPER_COUNT),
            roadmap_generation: 0,
            papers_generation: 0,
        }
    }

    // ── Transitions ───────────────────────────────────────────

    /// Start generating a roadmap. Blank topics are ignored.
    ///
    /// Clears the roadmap, its error, the selection, and any papers, from
    /// any state. Outstanding roadmap and paper requests are superseded.
    pub fn generate_roadmap(&mut self, topic: &str) -> Option<RoadmapTicket> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }

        self.roadmap_generation += 1;
        self.papers_generation += 1;
        self.topic = Some(topic.to_string());
        self.roadmap = RoadmapStage::Loading;
        self.selection = None;
        info!(topic, generation = self.roadmap_generation, "Generating roadmap");

        Some(RoadmapTicket {
            generation: self.roadmap_generation,
            topic: topic.to_string(),
        })
    }

    /// Apply the outcome of a roadmap request. Returns `false` if the ticket was stale.
    pub fn settle_roadmap(
        &mut self,
        ticket: &RoadmapTicket,
        result: Result<RoadmapResponse, BackendError>,
    ) -> bool {
        if ticket.generation != self.roadmap_generation || self.roadmap != RoadmapStage::Loading {
            debug!(
                topic = %ticket.topic,
                generation = ticket.generation,
                current = self.roadmap_generation,
                "Discarding superseded roadmap response"
            );
            return false;
        }

        self.roadmap = match result {
            Ok(response) if response.conceptual_path.is_empty() => {
                info!(topic = %ticket.topic, "Backend returned an empty roadmap");
                RoadmapStage::Failed(RoadmapFailure::Empty)
            }
            Ok(response) => {
                info!(
                    topic = %ticket.topic,
                    concepts = response.conceptual_path.len(),
                    "Roadmap ready"
                );
                RoadmapStage::Ready(response.conceptual_path)
            }
            Err(e) => {
                warn!(topic = %ticket.topic, error = %e, "Roadmap request failed");
                RoadmapStage::Failed(RoadmapFailure::Transport)
            }
        };
        true
    }

    /// Select a concept and start loading its papers.
    ///
    /// Only valid once a roadmap is ready. The name is matched against the
    /// roadmap's concepts ignoring case; unknown or blank names are ignored.
    pub fn select_concept(&mut self, concept: &str) -> Option<PapersTicket> {
        let RoadmapStage::Ready(nodes) = &self.roadmap else {
            debug!(concept, "Ignoring concept selection without a ready roadmap");
            return None;
        };
        let wanted = concept.trim();
        let Some(node) = nodes
            .iter()
            .find(|node| !wanted.is_empty() && node.concept.eq_ignore_ascii_case(wanted))
        else {
            debug!(concept, "Ignoring selection of a concept outside the roadmap");
            return None;
        };
        let concept = node.concept.clone();

        self.papers_generation += 1;
        self.selection = Some(Selection {
            concept: concept.clone(),
            papers: PaperStage::Loading,
        });
        info!(concept = %concept, count = self.paper_count, "Loading papers");

        Some(PapersTicket {
            generation: self.papers_generation,
            concept,
            count: self.paper_count,
        })
    }

    /// Select the concept at a 1-based position in the roadmap.
    pub fn select_concept_at(&mut self, position: usize) -> Option<PapersTicket> {
        let concept = self
            .concepts()
            .get(position.checked_sub(1)?)
            .map(|node| node.concept.clone())?;
        self.select_concept(&concept)
    }

    /// Apply the outcome of a paper request. Returns `false` if the ticket was stale.
    pub fn settle_papers(
        &mut self,
        ticket: &PapersTicket,
        result: Result<PapersResponse, BackendError>,
    ) -> bool {
        let current = ticket.generation == self.papers_generation;
        let Some(selection) = self.selection.as_mut().filter(|s| {
            current && s.papers == PaperStage::Loading && s.concept == ticket.concept
        }) else {
            debug!(
                concept = %ticket.concept,
                generation = ticket.generation,
                current = self.papers_generation,
                "Discarding superseded papers response"
            );
            return false;
        };

        if let Err(e) = &result {
            warn!(concept = %ticket.concept, error = %e, "Papers request failed");
        }
        selection.papers = PaperStage::from_result(result);
        match &selection.papers {
            PaperStage::Ready(papers) => {
                info!(concept = %ticket.concept, papers = papers.len(), "Papers ready");
            }
            PaperStage::Unavailable => info!(concept = %ticket.concept, "Papers not available yet"),
            PaperStage::Loading | PaperStage::Failed => {}
        }
        true
    }

    /// Set how many papers to request per concept, clamped to `1..=30`.
    ///
    /// Returns the count actually applied. Affects the next selection only.
    pub fn set_paper_count(&mut self, count: u32) -> u32 {
        let clamped = count.clamp(1, MAX_PAPER_COUNT);
        if clamped != count {
            warn!(requested = count, applied = clamped, "Paper count out of range");
        }
        self.paper_count = clamped;
        clamped
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> NavigationState {
        match (&self.roadmap, &self.selection) {
            (RoadmapStage::Idle, _) => NavigationState::Idle,
            (RoadmapStage::Loading, _) => NavigationState::RoadmapLoading,
            (RoadmapStage::Failed(_), _) => NavigationState::RoadmapError,
            (RoadmapStage::Ready(_), None) => NavigationState::RoadmapReady,
            (RoadmapStage::Ready(_), Some(selection)) => match selection.papers {
                PaperStage::Loading => NavigationState::PapersLoading,
                PaperStage::Ready(_) => NavigationState::PapersReady,
                PaperStage::Unavailable | PaperStage::Failed => NavigationState::PapersError,
            },
        }
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn roadmap(&self) -> &RoadmapStage {
        &self.roadmap
    }

    /// Concepts of the ready roadmap, in learning order. Empty otherwise.
    pub fn concepts(&self) -> &[ConceptNode] {
        match &self.roadmap {
            RoadmapStage::Ready(concepts) => concepts,
            _ => &[],
        }
    }

    pub fn roadmap_error(&self) -> Option<&'static str> {
        match &self.roadmap {
            RoadmapStage::Failed(failure) => Some(failure.message()),
            _ => None,
        }
    }

    pub fn roadmap_loading(&self) -> bool {
        self.roadmap == RoadmapStage::Loading
    }

    pub fn selected_concept(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.concept.as_str())
    }

    pub fn paper_stage(&self) -> Option<&PaperStage> {
        self.selection.as_ref().map(|s| &s.papers)
    }

    /// Papers for the selected concept. Empty unless they are ready.
    pub fn papers(&self) -> &[Paper] {
        match self.paper_stage() {
            Some(PaperStage::Ready(papers)) => papers,
            _ => &[],
        }
    }

    pub fn paper_error(&self) -> Option<&'static str> {
        self.paper_stage().and_then(PaperStage::message)
    }

    pub fn papers_loading(&self) -> bool {
        self.paper_stage() == Some(&PaperStage::Loading)
    }

    pub fn paper_count(&self) -> u32 {
        self.paper_count
    }

    /// Whether any request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.roadmap_loading() || self.papers_loading()
    }
}
