//! End-to-end tests over the router with a canned LLM backend.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use knownet_common::config::KnownetConfig;
use knownet_kg::store::KgStore;
use knownet_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse, LlmRouter, TextStream};
use knownet_web::router::build_router;
use knownet_web::state::AppState;

const ANNOTATED_ANSWER: &str = "[coenzyme Q10|Dietary Supplement]($N1) may \
    [TREATS]($R1, $N1, $N2) [Diabetes|Disease]($N2). || [\"coenzyme Q10\"]";

struct CannedBackend;

#[async_trait]
impl LlmBackend for CannedBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            content: ANNOTATED_ANSWER.to_string(),
            model: "canned".to_string(),
            prompt_tokens: 10,
            completion_tokens: 20,
        })
    }

    async fn complete_stream(&self, _req: LlmRequest) -> Result<TextStream, LlmError> {
        let chunks: Vec<Result<String, LlmError>> = ANNOTATED_ANSWER
            .split_inclusive(' ')
            .map(|c| Ok(c.to_string()))
            .collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }

    fn model_id(&self) -> &str {
        "canned"
    }

    fn is_local(&self) -> bool {
        true
    }
}

fn test_router() -> axum::Router {
    let config = KnownetConfig::default();
    let mut llm = LlmRouter::new(config.llm.provider.clone(), config.llm.clone());
    llm.register_backend(config.llm.provider.clone(), Arc::new(CannedBackend));
    build_router(AppState::new(config, KgStore::demo(), llm))
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_ping_and_health() {
    let app = test_router();

    let resp = app
        .clone()
        .oneshot(Request::get("/api/_ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["ok"], true);

    let resp = app
        .oneshot(Request::get("/api/_health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health = body_json(resp).await;
    assert_eq!(health["model"], "canned");
    assert!(health["kg"]["node_count"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_verify_endpoint() {
    let app = test_router();
    let resp = app
        .oneshot(post_json(
            "/api/verify",
            json!({ "triples": [["coenzyme Q10", "treat", "Diabetes"],
                                ["moon dust", "cures", "everything"]] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["status"], "supported");
    assert_eq!(results[0]["ui_hint"], "solid");
    assert_eq!(results[1]["status"], "unsure");
}

#[tokio::test]
async fn test_recommend_endpoint() {
    let app = test_router();
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/recommend",
            json!({ "head": "coenzyme Q10", "k": 3, "whitelist": ["TREATS"] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let suggestions = body["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["tail"]["name"], "Diabetes");

    let resp = app
        .oneshot(post_json("/api/recommend", json!({ "head": "  " })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_data_endpoint_returns_subgraph() {
    let app = test_router();
    let resp = app
        .oneshot(post_json(
            "/api/data",
            json!({
                "input_type": "new_conversation",
                "data": { "triples": [["coenzyme Q10", "TREATS", "Diabetes"]] }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "success");
    let nodes = body["data"]["vis_res"]["nodes"].as_array().unwrap();
    let edges = body["data"]["vis_res"]["edges"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["relation"], "TREATS");
    // Follow-ups exclude entities already on screen.
    for rec in body["data"]["recommendation"].as_array().unwrap() {
        assert!(!rec["text"].as_str().unwrap().contains("and Diabetes"));
    }
}

#[tokio::test]
async fn test_data_endpoint_rejects_unknown_input_type() {
    let app = test_router();
    let resp = app
        .oneshot(post_json("/api/data", json!({ "input_type": "telepathy" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_stream_builds_session_graph() {
    let app = test_router();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/chat",
            json!({
                "id": "sess-1",
                "messages": [{ "role": "user", "content": "Can CoQ10 help with diabetes?" }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-session-id").unwrap().to_str().unwrap(),
        "sess-1"
    );
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let streamed = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(streamed, ANNOTATED_ANSWER);

    // Extraction runs after the body finishes; give the task a beat.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let resp = app
        .oneshot(Request::get("/api/graph/sess-1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let view = body_json(resp).await;
    assert_eq!(view["active_step"], 0);
    assert_eq!(view["question_entities"][0], "coenzyme Q10");
    let nodes = view["nodes"].as_array().unwrap();
    let edges = view["edges"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(edges.len(), 1);
    // Verification against the demo KG marks the edge as supported.
    assert_eq!(edges[0]["verification"], "supported");
    assert_eq!(edges[0]["stroke"], "solid");
    assert_eq!(edges[0]["label"], "TREATS | 1");
}

#[tokio::test]
async fn test_graph_step_and_layout_endpoints() {
    let app = test_router();

    // Seed a session via chat.
    let _ = app
        .clone()
        .oneshot(post_json(
            "/api/chat",
            json!({
                "id": "sess-2",
                "messages": [{ "role": "user", "content": "CoQ10 and diabetes?" }]
            }),
        ))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let resp = app
        .clone()
        .oneshot(post_json("/api/graph/sess-2/layout", json!({ "direction": "LR" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let view = body_json(resp).await;
    assert_eq!(view["direction"], "LR");
    let nodes = view["nodes"].as_array().unwrap();
    assert!(!nodes.is_empty());
    assert_eq!(nodes[0]["source_anchor"], "right");

    // Steps clamp to what the session has actually reached.
    let resp = app
        .clone()
        .oneshot(post_json("/api/graph/sess-2/step", json!({ "step": 42 })))
        .await
        .unwrap();
    let view = body_json(resp).await;
    assert_eq!(view["active_step"], 0);

    let resp = app
        .oneshot(
            Request::get("/api/graph/no-such-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
