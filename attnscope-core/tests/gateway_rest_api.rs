//! Integration tests for the gateway HTTP endpoints.
//!
//! The analyzer is an in-memory fake; no model is loaded.

use attnscope_core::gateway::{GatewayState, gateway_router};
use attnscope_core::{
    AggregationMode, AnalysisError, AnalysisResult, Analyzer, Candidate, Prediction,
    RenderConfig, ServerConfig, Token, TokenizerInfo,
};
use axum::body::Body;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower::ServiceExt;

/// Weights the last character-token fully; fails on the text "boom".
struct FakeAnalyzer {
    loaded: AtomicBool,
}

impl Analyzer for FakeAnalyzer {
    fn analyze(&self, text: &str, mode: AggregationMode) -> Result<AnalysisResult, AnalysisError> {
        if text == "boom" {
            return Err(AnalysisError::inference("forward pass exploded"));
        }
        self.loaded.store(true, Ordering::SeqCst);
        let tokens: Vec<Token> = text
            .chars()
            .enumerate()
            .map(|(i, c)| Token::new(c.to_string(), i as u32))
            .collect();
        let mut weights = vec![0.0; tokens.len()];
        if let Some(last) = weights.last_mut() {
            *last = 1.0;
        }
        Ok(AnalysisResult {
            tokens,
            weights,
            mode,
            tokenizer_info: TokenizerInfo {
                model_name: "fake".into(),
                tokenizer_type: "CharTokenizer".into(),
                vocab_size: Some(256),
                special_tokens_count: 2,
            },
            prediction: Prediction::from_candidates(vec![
                Candidate {
                    token: "<&>".into(),
                    token_id: 42,
                    probability: 0.9,
                    rank: 1,
                },
                Candidate {
                    token: "x".into(),
                    token_id: 7,
                    probability: 0.05,
                    rank: 2,
                },
            ]),
        })
    }

    fn default_mode(&self) -> AggregationMode {
        AggregationMode::ColumnSumNormalized
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

fn make_state(max_body_bytes: usize) -> GatewayState {
    let analyzer = Arc::new(FakeAnalyzer {
        loaded: AtomicBool::new(false),
    });
    let server = ServerConfig {
        max_body_bytes,
        ..ServerConfig::default()
    };
    GatewayState::new(analyzer, RenderConfig::default(), &server)
}

fn make_request(uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn make_post_request(uri: &str, body: String) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send_json(
    state: GatewayState,
    req: axum::http::Request<Body>,
) -> (axum::http::StatusCode, serde_json::Value) {
    let app = gateway_router(state);
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

// --- /health ---

#[tokio::test]
async fn test_health_before_and_after_first_analysis() {
    let state = make_state(64 * 1024);
    let (status, json) = send_json(state.clone(), make_request("/health")).await;
    assert_eq!(status, 200);
    assert_eq!(json["model_loaded"], false);
    assert_eq!(json["default_mode"], "column_sum_normalized");
    assert!(json.get("uptime_secs").is_some());

    let body = serde_json::json!({ "text": "hi" }).to_string();
    let _ = send_json(state.clone(), make_post_request("/visualize", body)).await;

    let (_, json) = send_json(state, make_request("/health")).await;
    assert_eq!(json["model_loaded"], true);
}

// --- /visualize ---

#[tokio::test]
async fn test_visualize_uses_server_default_mode() {
    let body = serde_json::json!({ "text": "abc" }).to_string();
    let (status, json) = send_json(make_state(64 * 1024), make_post_request("/visualize", body)).await;
    assert_eq!(status, 200);
    assert_eq!(json["success"], true);
    assert_eq!(json["mode"], "column_sum_normalized");
    assert_eq!(json["token_count"], 3);
    assert_eq!(json["weights"], serde_json::json!([0.0, 0.0, 1.0]));
    assert!(
        json["token_details_html"]
            .as_str()
            .unwrap()
            .contains("min-max scaled")
    );
}

#[tokio::test]
async fn test_visualize_response_shape() {
    let body = serde_json::json!({ "text": "a<b", "mode": "last_token_distribution" }).to_string();
    let (_, json) = send_json(make_state(64 * 1024), make_post_request("/visualize", body)).await;

    assert_eq!(json["tokens"][1]["text"], "<");
    assert_eq!(json["tokens"][1]["id"], 1);
    let html = json["html"].as_str().unwrap();
    assert!(html.contains("&lt;"));
    assert!(html.contains("rgb(255, 0, 0)"));
    assert!(html.contains("rgb(255, 255, 255)"));

    assert_eq!(json["prediction"]["token"], "<&>");
    assert_eq!(json["prediction"]["token_id"], 42);
    assert_eq!(json["prediction"]["top_candidates"][1]["rank"], 2);

    let info = &json["tokenizer_info"];
    assert_eq!(info["model_name"], "fake");
    assert_eq!(info["tokenizer_type"], "CharTokenizer");
    assert_eq!(info["vocab_size"], 256);
    assert_eq!(info["special_tokens_count"], 2);
    assert!(json["token_details_html"].as_str().unwrap().contains("sum-ok"));
}

#[tokio::test]
async fn test_visualize_analysis_error_is_structured() {
    let body = serde_json::json!({ "text": "boom" }).to_string();
    let (status, json) = send_json(make_state(64 * 1024), make_post_request("/visualize", body)).await;
    assert_eq!(status, 200);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "INFERENCE_FAILED");
    assert!(json["error"].as_str().unwrap().contains("exploded"));
}

#[tokio::test]
async fn test_visualize_missing_text_is_empty_input() {
    let (status, json) = send_json(
        make_state(64 * 1024),
        make_post_request("/visualize", "{}".to_string()),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["code"], "EMPTY_INPUT");
}

#[tokio::test]
async fn test_visualize_unknown_mode_is_bad_request() {
    let body = serde_json::json!({ "text": "abc", "mode": "rows" }).to_string();
    let (status, json) = send_json(make_state(64 * 1024), make_post_request("/visualize", body)).await;
    assert_eq!(status, 400);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_visualize_body_limit() {
    let body = serde_json::json!({ "text": "a".repeat(4096) }).to_string();
    let (status, json) = send_json(make_state(1024), make_post_request("/visualize", body)).await;
    assert_eq!(status, 413);
    assert_eq!(json["success"], false);
}
