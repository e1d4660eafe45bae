//! Integration tests for `HttpBackend` against an in-process axum server.

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use scholarpath_core::client::{HttpBackend, ResearchBackend};
use scholarpath_core::config::BackendConfig;
use scholarpath_core::error::BackendError;
use scholarpath_core::types::{DocumentHandle, DocumentUpload, ExplanationPayload, Level};
use serde_json::{Value, json};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn backend(base_url: &str) -> HttpBackend {
    let config = BackendConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..Default::default()
    };
    HttpBackend::new(&config).unwrap()
}

async fn roadmap(Json(body): Json<Value>) -> Json<Value> {
    let topic = body["topic"].as_str().unwrap_or_default().to_string();
    Json(json!({
        "goal": topic,
        "conceptual_path": [
            {"concept": "Recurrent networks", "explanation": "Sequence modelling."},
            {"concept": "Attention", "explanation": "Direct access to all positions."}
        ]
    }))
}

async fn papers(Json(body): Json<Value>) -> Json<Value> {
    let concept = body["concept"].as_str().unwrap_or_default();
    let count = body["count"].as_u64().unwrap_or_default();
    if concept == "nothing" {
        return Json(json!({"concept": concept, "papers_available": false, "papers": []}));
    }
    Json(json!({
        "concept": format!("{concept}:{count}"),
        "papers_available": true,
        "papers": [{
            "title": "Attention Is All You Need",
            "year": "2017",
            "link": "http://arxiv.org/abs/1706.03762v7",
            "stage": "Foundational",
            "why_exists": "Removes recurrence.",
            "read_after": "Sequence to sequence learning."
        }]
    }))
}

async fn upload(headers: HeaderMap, body: Bytes) -> (StatusCode, Json<Value>) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let body = String::from_utf8_lossy(&body);
    if content_type.starts_with("multipart/form-data")
        && body.contains("name=\"file\"")
        && body.contains("filename=\"paper.pdf\"")
        && body.contains("%PDF-1.7")
    {
        (StatusCode::OK, Json(json!({"file_id": "3f2a"})))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({"detail": "Only PDF files allowed"})))
    }
}

async fn explain_easy(Path(file_id): Path<String>) -> Json<Value> {
    Json(json!({"level": "easy", "explanation": format!("Summary of {file_id}")}))
}

async fn explain_intermediate(Path(_file_id): Path<String>) -> Json<Value> {
    Json(json!({
        "level": "intermediate",
        "method_explanation": "Encoder and decoder stacks.",
        "figures": [{"image_url": "/figures/3f2a_1.png", "caption": "Figure 1: The Transformer"}],
        "figures_summary": "The diagrams show the data flow."
    }))
}

async fn explain_advanced(Path(file_id): Path<String>) -> Json<Value> {
    if file_id == "mismatch" {
        return Json(json!({"level": "easy", "explanation": "wrong tier"}));
    }
    Json(json!({
        "level": "advanced",
        "methodology_text": "Scaled dot-product attention.",
        "equation_explanations": ["softmax(QK^T / sqrt(d))V", "PE(pos, 2i)"],
        "results_explanation": "BLEU 28.4 on WMT14 En-De."
    }))
}

fn app() -> Router {
    Router::new()
        .route("/", get(|| async { Json(json!({"status": "backend running"})) }))
        .route("/topic/roadmap", post(roadmap))
        .route("/topic/papers", post(papers))
        .route("/upload", post(upload))
        .route("/explain/easy_llm/{file_id}", post(explain_easy))
        .route("/explain/intermediate/{file_id}", post(explain_intermediate))
        .route("/explain/advanced/{file_id}", post(explain_advanced))
}

#[tokio::test]
async fn test_health() {
    let base = serve(app()).await;
    assert!(backend(&base).health().await.is_ok());
}

#[tokio::test]
async fn test_fetch_roadmap_sends_topic() {
    let base = serve(app()).await;
    let response = backend(&base).fetch_roadmap("transformers").await.unwrap();
    assert_eq!(response.goal.as_deref(), Some("transformers"));
    assert_eq!(response.conceptual_path.len(), 2);
    assert_eq!(response.conceptual_path[1].concept, "Attention");
}

#[tokio::test]
async fn test_fetch_papers_sends_concept_and_count() {
    let base = serve(app()).await;
    let response = backend(&base).fetch_papers("Attention", 10).await.unwrap();
    assert!(response.papers_available);
    assert_eq!(response.concept.as_deref(), Some("Attention:10"));
    assert_eq!(response.papers[0].year, "2017");
    assert_eq!(response.papers[0].stage, "Foundational");
}

#[tokio::test]
async fn test_fetch_papers_unavailable_is_success() {
    let base = serve(app()).await;
    let response = backend(&base).fetch_papers("nothing", 5).await.unwrap();
    assert!(!response.papers_available);
    assert!(response.papers.is_empty());
}

#[tokio::test]
async fn test_upload_sends_multipart_file() {
    let base = serve(app()).await;
    let handle = backend(&base)
        .upload_document(DocumentUpload::new("paper.pdf", b"%PDF-1.7 body".to_vec()))
        .await
        .unwrap();
    assert_eq!(handle, DocumentHandle::new("3f2a"));
}

#[tokio::test]
async fn test_upload_rejection_is_status_error() {
    let base = serve(app()).await;
    let err = backend(&base)
        .upload_document(DocumentUpload::new("notes.txt", b"hello".to_vec()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BackendError::Status {
            endpoint: "/upload".into(),
            status: 400
        }
    );
}

#[tokio::test]
async fn test_explain_each_tier() {
    let base = serve(app()).await;
    let client = backend(&base);
    let doc = DocumentHandle::new("3f2a");

    match client.explain(&doc, Level::Easy).await.unwrap() {
        ExplanationPayload::Easy(body) => assert_eq!(body.explanation, "Summary of 3f2a"),
        other => panic!("unexpected payload {other:?}"),
    }
    match client.explain(&doc, Level::Intermediate).await.unwrap() {
        ExplanationPayload::Intermediate(body) => {
            assert_eq!(body.figures[0].image_url, "/figures/3f2a_1.png");
            assert_eq!(
                body.figures_summary.as_deref(),
                Some("The diagrams show the data flow.")
            );
        }
        other => panic!("unexpected payload {other:?}"),
    }
    match client.explain(&doc, Level::Advanced).await.unwrap() {
        ExplanationPayload::Advanced(body) => assert_eq!(body.equation_explanations.len(), 2),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn test_explain_encodes_file_id() {
    let base = serve(app()).await;
    let payload = backend(&base)
        .explain(&DocumentHandle::new("a b"), Level::Easy)
        .await
        .unwrap();
    assert_eq!(
        payload,
        ExplanationPayload::Easy(scholarpath_core::types::EasyExplanation {
            explanation: "Summary of a b".into()
        })
    );
}

#[tokio::test]
async fn test_explain_rejects_mismatched_tier() {
    let base = serve(app()).await;
    let err = backend(&base)
        .explain(&DocumentHandle::new("mismatch"), Level::Advanced)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Decode { .. }));
}

#[tokio::test]
async fn test_server_error_is_status() {
    let failing = Router::new().route(
        "/topic/roadmap",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "LLM exploded") }),
    );
    let base = serve(failing).await;
    let err = backend(&base).fetch_roadmap("gnn").await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Status {
            endpoint: "/topic/roadmap".into(),
            status: 500
        }
    );
}

#[tokio::test]
async fn test_non_json_body_is_decode_error() {
    let odd = Router::new().route("/topic/papers", post(|| async { "not json" }));
    let base = serve(odd).await;
    let err = backend(&base).fetch_papers("gnn", 5).await.unwrap_err();
    assert!(matches!(err, BackendError::Decode { .. }));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend(&format!("http://{addr}"))
        .fetch_roadmap("gnn")
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport { .. }));
}
