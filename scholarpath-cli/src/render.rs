//! Terminal views of navigator and explain-flow state.
//!
//! Every function returns a `String` so the REPL, the one-shot commands and
//! the tests all go through the same code.

use scholarpath_core::config::GuideConfig;
use scholarpath_core::explain::ExplainFlow;
use scholarpath_core::navigation::{PaperStage, RoadmapNavigator, RoadmapStage};
use scholarpath_core::sanitize::sanitize;
use scholarpath_core::types::{
    AdvancedExplanation, ConceptNode, EasyExplanation, Explanation, ExplanationPayload, Figure,
    IntermediateExplanation, Paper,
};
use url::Url;

use crate::markdown::{MarkdownStyle, ansi, render_markdown, wrap};

const ROADMAP_LOADING: &str = "Creating conceptual roadmap...";
const PAPERS_LOADING: &str = "Fetching papers from arXiv...";
const NO_FIGURE_EXPLANATION: &str = "No explanation available.";

pub struct Renderer {
    style: MarkdownStyle,
    /// Origin that figure image paths are resolved against.
    base: Option<Url>,
}

impl Renderer {
    pub fn new(config: &GuideConfig) -> Self {
        Self {
            style: MarkdownStyle::new(config.ui.wrap_width, config.ui.color),
            base: config.backend.parsed_base_url().ok(),
        }
    }

    fn heading(&self, text: &str) -> String {
        self.style.paint(text, ansi::BOLD_ON, ansi::BOLD_OFF)
    }

    fn dim(&self, text: &str) -> String {
        self.style.paint(text, ansi::DIM_ON, ansi::DIM_OFF)
    }

    fn error(&self, text: &str) -> String {
        self.style.paint(text, ansi::RED, ansi::RESET)
    }

    fn notice(&self, text: &str) -> String {
        self.style.paint(text, ansi::YELLOW, ansi::RESET)
    }

    fn paragraph(&self, text: &str, indent: usize) -> String {
        let margin = " ".repeat(indent);
        wrap(text, self.style.width, &margin, &margin)
    }

    // ── Roadmap ───────────────────────────────────────────────

    pub fn roadmap(&self, nav: &RoadmapNavigator) -> String {
        match nav.roadmap() {
            RoadmapStage::Idle => self.dim("Enter a research goal with `topic <goal>`."),
            RoadmapStage::Loading => self.dim(ROADMAP_LOADING),
            RoadmapStage::Failed(failure) => self.error(failure.message()),
            RoadmapStage::Ready(concepts) => {
                let topic = nav.topic().unwrap_or_default();
                let mut out = vec![self.heading(&format!("Conceptual Path to Reach \"{topic}\""))];
                for (index, node) in concepts.iter().enumerate() {
                    let selected = nav.selected_concept() == Some(node.concept.as_str());
                    out.push(self.concept_card(index + 1, node, selected));
                }
                out.push(self.dim("Pick a concept with `select <number>`."));
                out.join("\n\n")
            }
        }
    }

    fn concept_card(&self, position: usize, node: &ConceptNode, selected: bool) -> String {
        let marker = if selected {
            self.style.paint("\u{25b6}", ansi::GREEN, ansi::RESET)
        } else {
            " ".to_string()
        };
        let title = self.heading(&format!("{position}. {}", node.concept));
        format!("{marker} {title}\n{}", self.paragraph(&node.explanation, 5))
    }

    // ── Papers ────────────────────────────────────────────────

    /// The paper list for the selected concept, or an empty string without a selection.
    pub fn papers(&self, nav: &RoadmapNavigator) -> String {
        match (nav.selected_concept(), nav.paper_stage()) {
            (Some(concept), Some(stage)) => self.paper_stage(concept, stage),
            _ => String::new(),
        }
    }

    pub fn paper_stage(&self, concept: &str, stage: &PaperStage) -> String {
        let header = self.heading(&format!("Papers for: {concept}"));
        let body = match stage {
            PaperStage::Loading => self.dim(PAPERS_LOADING),
            PaperStage::Unavailable => self.notice(stage.message().unwrap_or_default()),
            PaperStage::Failed => self.error(stage.message().unwrap_or_default()),
            PaperStage::Ready(papers) if papers.is_empty() => {
                self.notice("The backend returned no papers for this concept.")
            }
            PaperStage::Ready(papers) => papers
                .iter()
                .map(|paper| self.paper_card(paper))
                .collect::<Vec<_>>()
                .join("\n\n"),
        };
        format!("{header}\n\n{body}")
    }

    pub fn paper_card(&self, paper: &Paper) -> String {
        let badge = self.style.paint(&format!("[{}]", paper.stage), ansi::CYAN, ansi::RESET);
        let lines = [
            format!("{badge} {}", self.heading(&paper.title)),
            format!("    Year: {}", paper.year),
            self.paragraph(&format!("Why this paper exists: {}", paper.why_exists), 4),
            self.paragraph(&format!("Read after: {}", paper.read_after), 4),
            format!("    Read paper \u{2192} {}", paper.link),
        ];
        lines.join("\n")
    }

    // ── Explanations ──────────────────────────────────────────

    /// Document, level and progress of the explain flow, followed by the visible explanation.
    pub fn explain_status(&self, flow: &ExplainFlow) -> String {
        let mut out = Vec::new();
        match flow.document() {
            Some(document) => out.push(format!("Document: {document}")),
            None => out.push(self.dim("No document uploaded. Use `upload <path.pdf>`.")),
        }
        out.push(format!("Level: {}", flow.level()));
        if flow.uploading() {
            out.push(self.dim("Uploading document..."));
        }
        if flow.loading() {
            out.push(self.dim("Generating explanation..."));
        }
        if let Some(message) = flow.error() {
            out.push(self.error(message));
        }
        if let Some(explanation) = flow.visible_explanation() {
            out.push(String::new());
            if flow.document() != Some(&explanation.document) {
                out.push(self.notice(&format!(
                    "Explanation of earlier document: {}",
                    explanation.document
                )));
            }
            out.push(self.explanation(explanation));
        }
        out.join("\n")
    }

    pub fn explanation(&self, explanation: &Explanation) -> String {
        match &explanation.payload {
            ExplanationPayload::Easy(body) => self.easy_view(body),
            ExplanationPayload::Intermediate(body) => self.intermediate_view(body),
            ExplanationPayload::Advanced(body) => self.advanced_view(body),
        }
    }

    fn section(&self, title: &str, markdown: &str) -> String {
        format!("{}\n{}", self.heading(title), render_markdown(markdown, &self.style))
    }

    fn easy_view(&self, body: &EasyExplanation) -> String {
        self.section("Paper Summary", &body.explanation)
    }

    fn intermediate_view(&self, body: &IntermediateExplanation) -> String {
        let mut out = vec![self.section(
            "Methodology (Conceptual Overview)",
            &body.method_explanation,
        )];
        if !body.figures.is_empty() {
            out.push(self.heading("Architecture & Flow Diagrams"));
            out.extend(body.figures.iter().map(|figure| self.figure_card(figure)));
            if let Some(summary) = body.figures_summary.as_deref().filter(|s| !s.trim().is_empty())
            {
                out.push(render_markdown(summary, &self.style));
            }
        }
        out.join("\n\n")
    }

    fn advanced_view(&self, body: &AdvancedExplanation) -> String {
        [
            self.section("Methodology (Technical)", &body.methodology_text),
            self.section(
                "Equation Explanation",
                &body.equation_explanations.join("\n\n"),
            ),
            self.section("Results & Evaluation", &body.results_explanation),
        ]
        .join("\n\n")
    }

    pub fn figure_card(&self, figure: &Figure) -> String {
        let caption = if figure.caption.trim().is_empty() {
            "Figure"
        } else {
            figure.caption.trim()
        };
        let explanation = sanitize(&figure.explanation);
        let body = match &explanation {
            Some(text) => wrap(text, self.style.width, "  \u{2502} ", "  \u{2502} "),
            None => format!("  \u{2502} {}", self.dim(NO_FIGURE_EXPLANATION)),
        };
        format!(
            "  \u{250c} {}\n  \u{2502} {}\n{body}",
            self.heading(caption),
            self.dim(&self.resolve_image_url(&figure.image_url)),
        )
    }

    /// Resolve a server-relative image path against the backend origin.
    pub fn resolve_image_url(&self, image_url: &str) -> String {
        self.base
            .as_ref()
            .and_then(|base| base.join(image_url).ok())
            .map(String::from)
            .unwrap_or_else(|| image_url.to_string())
    }
}
