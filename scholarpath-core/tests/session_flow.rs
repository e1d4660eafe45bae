//! Integration tests for the session driver.
//!
//! These exercise the navigator and explain flow end-to-end through
//! `Session` with a `MockBackend`, including calls that settle out of order.

use scholarpath_core::client::{BackendCall, MockBackend};
use scholarpath_core::config::GuideConfig;
use scholarpath_core::explain::EXPLAIN_FAILED_MESSAGE;
use scholarpath_core::navigation::{
    NavigationState, PAPERS_FAILED_MESSAGE, PAPERS_UNAVAILABLE_MESSAGE, ROADMAP_EMPTY_MESSAGE,
    ROADMAP_FAILED_MESSAGE,
};
use scholarpath_core::session::{FlowEvents, Session};
use scholarpath_core::types::{
    ConceptNode, DocumentHandle, DocumentUpload, EasyExplanation, ExplanationPayload, Level, Paper,
    PapersResponse, RoadmapResponse,
};
use std::sync::Arc;
use std::time::Duration;

fn session(mock: &Arc<MockBackend>) -> (Session<MockBackend>, FlowEvents) {
    Session::new(Arc::clone(mock), &GuideConfig::default())
}

fn gnn_roadmap() -> RoadmapResponse {
    let names = [
        "Graph signal processing",
        "Spectral graph convolutions",
        "Message passing neural networks",
    ];
    RoadmapResponse {
        goal: Some("graph neural networks".into()),
        conceptual_path: names
            .iter()
            .map(|name| ConceptNode {
                concept: name.to_string(),
                explanation: format!("{name} motivated the next step."),
            })
            .collect(),
    }
}

fn paper(title: &str, stage: &str) -> Paper {
    Paper {
        title: title.into(),
        year: "2020".into(),
        stage: stage.into(),
        why_exists: "...".into(),
        read_after: "none".into(),
        link: "https://arxiv.org/abs/2001.00001".into(),
    }
}

fn available(papers: Vec<Paper>) -> PapersResponse {
    PapersResponse {
        concept: None,
        papers_available: true,
        papers,
    }
}

fn easy(text: &str) -> ExplanationPayload {
    ExplanationPayload::Easy(EasyExplanation {
        explanation: text.into(),
    })
}

#[tokio::test]
async fn test_end_to_end_roadmap_then_papers() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_roadmap(Ok(gnn_roadmap()));
    mock.queue_papers(
        "Spectral graph convolutions",
        Ok(available(vec![paper("X", "foundational")])),
    );

    let (mut session, mut events) = session(&mock);
    assert!(session.generate_roadmap("graph neural networks"));
    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().state(), NavigationState::RoadmapReady);
    assert_eq!(session.navigator().concepts().len(), 3);

    assert!(session.select_concept_at(2));
    assert_eq!(session.navigator().state(), NavigationState::PapersLoading);
    session.settle_all(&mut events).await;

    let nav = session.navigator();
    assert_eq!(nav.state(), NavigationState::PapersReady);
    assert_eq!(nav.selected_concept(), Some("Spectral graph convolutions"));
    assert_eq!(nav.papers().len(), 1);
    assert_eq!(nav.papers()[0].stage, "foundational");

    assert_eq!(
        mock.calls(),
        vec![
            BackendCall::Roadmap {
                topic: "graph neural networks".into()
            },
            BackendCall::Papers {
                concept: "Spectral graph convolutions".into(),
                count: 5
            },
        ]
    );
}

#[tokio::test]
async fn test_blank_topic_issues_no_request() {
    let mock = Arc::new(MockBackend::new());
    let (mut session, mut events) = session(&mock);
    assert!(!session.generate_roadmap("   "));
    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().state(), NavigationState::Idle);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_empty_roadmap_surfaces_not_available() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_roadmap(Ok(RoadmapResponse::default()));
    let (mut session, mut events) = session(&mock);

    session.generate_roadmap("something obscure");
    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().state(), NavigationState::RoadmapError);
    assert_eq!(session.navigator().roadmap_error(), Some(ROADMAP_EMPTY_MESSAGE));
}

#[tokio::test]
async fn test_roadmap_transport_failure_then_retry() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_roadmap(Err(MockBackend::transport_error("/topic/roadmap")))
        .queue_roadmap(Ok(gnn_roadmap()));
    let (mut session, mut events) = session(&mock);

    session.generate_roadmap("gnn");
    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().roadmap_error(), Some(ROADMAP_FAILED_MESSAGE));

    session.generate_roadmap("gnn");
    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().state(), NavigationState::RoadmapReady);
    assert!(session.navigator().roadmap_error().is_none());
}

#[tokio::test]
async fn test_papers_unavailable_is_distinct_from_failure() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_roadmap(Ok(gnn_roadmap()))
        .queue_papers(
            "Graph signal processing",
            Ok(PapersResponse {
                concept: None,
                papers_available: false,
                papers: vec![],
            }),
        )
        .queue_papers(
            "Message passing neural networks",
            Err(MockBackend::transport_error("/topic/papers")),
        );
    let (mut session, mut events) = session(&mock);
    session.generate_roadmap("gnn");
    session.settle_all(&mut events).await;

    session.select_concept_at(1);
    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().paper_error(), Some(PAPERS_UNAVAILABLE_MESSAGE));
    assert!(session.navigator().papers().is_empty());

    session.select_concept_at(3);
    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().paper_error(), Some(PAPERS_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_slow_previous_concept_does_not_overwrite_newer() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_roadmap(Ok(gnn_roadmap()))
        .queue_papers_after(
            "Graph signal processing",
            Duration::from_millis(150),
            Ok(available(vec![paper("Slow A", "Core")])),
        )
        .queue_papers_after(
            "Spectral graph convolutions",
            Duration::from_millis(10),
            Ok(available(vec![paper("Fast B", "Core")])),
        );
    let (mut session, mut events) = session(&mock);
    session.generate_roadmap("gnn");
    session.settle_all(&mut events).await;

    session.select_concept_at(1);
    session.select_concept_at(2);
    assert_eq!(session.in_flight(), 2);

    // B settles first and is applied.
    let first = events.recv().await.unwrap();
    assert!(session.apply(first));
    assert_eq!(session.navigator().papers()[0].title, "Fast B");

    // A settles later and is discarded.
    let second = events.recv().await.unwrap();
    assert!(!session.apply(second));
    assert_eq!(session.navigator().selected_concept(), Some("Spectral graph convolutions"));
    assert_eq!(session.navigator().papers()[0].title, "Fast B");
    assert_eq!(session.in_flight(), 0);
}

#[tokio::test]
async fn test_slow_previous_concept_while_newer_still_loading() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_roadmap(Ok(gnn_roadmap()))
        .queue_papers_after(
            "Graph signal processing",
            Duration::from_millis(10),
            Ok(available(vec![paper("A", "Core")])),
        )
        .queue_papers_after(
            "Spectral graph convolutions",
            Duration::from_millis(150),
            Ok(available(vec![paper("B", "Core")])),
        );
    let (mut session, mut events) = session(&mock);
    session.generate_roadmap("gnn");
    session.settle_all(&mut events).await;

    session.select_concept_at(1);
    session.select_concept_at(2);

    let first = events.recv().await.unwrap();
    assert!(!session.apply(first));
    assert_eq!(session.navigator().state(), NavigationState::PapersLoading);
    assert!(session.navigator().papers().is_empty());

    session.settle_all(&mut events).await;
    assert_eq!(session.navigator().papers()[0].title, "B");
}

#[tokio::test]
async fn test_explanation_follows_dispatch_time_document() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_upload(Ok(DocumentHandle::new("first")))
        .queue_upload(Ok(DocumentHandle::new("second")))
        .queue_explanation_after(
            Duration::from_millis(100),
            Ok(easy("Explains the first paper in plain words.")),
        );
    let (mut session, mut events) = session(&mock);

    assert!(!session.explain());
    session.upload(DocumentUpload::new("first.pdf", b"%PDF".to_vec()));
    session.settle_all(&mut events).await;

    assert!(session.explain());
    session.upload(DocumentUpload::new("second.pdf", b"%PDF".to_vec()));
    session.settle_all(&mut events).await;

    let flow = session.explain_flow();
    assert_eq!(flow.document(), Some(&DocumentHandle::new("second")));
    let shown = flow.visible_explanation().unwrap();
    assert_eq!(shown.document, DocumentHandle::new("first"));
    assert_eq!(shown.level, Level::Easy);
    assert!(mock.calls().contains(&BackendCall::Explain {
        file_id: "first".into(),
        level: Level::Easy
    }));
}

#[tokio::test]
async fn test_explain_failure_recovers() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_upload(Ok(DocumentHandle::new("doc")))
        .queue_explanation(Err(MockBackend::transport_error("/explain")))
        .queue_explanation(Ok(easy("Second attempt works out fine.")));
    let (mut session, mut events) = session(&mock);

    session.upload(DocumentUpload::new("doc.pdf", vec![]));
    session.settle_all(&mut events).await;

    session.explain();
    session.settle_all(&mut events).await;
    assert!(!session.explain_flow().loading());
    assert_eq!(session.explain_flow().error(), Some(EXPLAIN_FAILED_MESSAGE));

    session.explain();
    session.settle_all(&mut events).await;
    assert!(session.explain_flow().error().is_none());
    assert!(session.explain_flow().visible_explanation().is_some());
}

#[tokio::test]
async fn test_level_switch_hides_previous_tier() {
    let mock = Arc::new(MockBackend::new());
    mock.queue_upload(Ok(DocumentHandle::new("doc")))
        .queue_explanation(Ok(easy("Plain-language overview of the paper.")));
    let (mut session, mut events) = session(&mock);

    session.upload(DocumentUpload::new("doc.pdf", vec![]));
    session.settle_all(&mut events).await;
    session.explain();
    session.settle_all(&mut events).await;
    assert!(session.explain_flow().visible_explanation().is_some());

    session.set_level(Level::Advanced);
    assert!(session.explain_flow().visible_explanation().is_none());
}
