use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::{Router, routing::post};
use http_body_util::BodyExt;
use server::{AppState, get_app};
use std::sync::Arc;
use tower::ServiceExt;

/// Canned delta-protocol backend. Each test spins one up on an ephemeral
/// port and points the app at it.
#[derive(Clone)]
enum Canned {
    Json(String),
    Sse(String),
    Error(u16, String),
}

impl IntoResponse for Canned {
    fn into_response(self) -> axum::response::Response {
        match self {
            Canned::Json(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Canned::Sse(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/event-stream")],
                body,
            )
                .into_response(),
            Canned::Error(status, body) => (
                StatusCode::from_u16(status).unwrap(),
                body,
            )
                .into_response(),
        }
    }
}

async fn spawn_upstream(canned: Canned) -> String {
    let app = Router::new().route(
        "/chat/completions",
        post(move || async move { canned }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{addr}")
}

fn build_app(upstream_base_url: String) -> Router {
    get_app(Arc::new(AppState {
        upstream_base_url,
        provider_prefix: None,
    }))
}

fn post_request(uri: &str, body: serde_json::Value, api_key: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn parse_sse_events(body: &str) -> Vec<(String, String)> {
    let mut events = Vec::new();
    let mut current_event = String::new();
    let mut current_data = String::new();

    for line in body.lines() {
        if line.starts_with("event:") {
            current_event = line["event:".len()..].trim().to_string();
        } else if line.starts_with("data:") {
            current_data = line["data:".len()..].trim().to_string();
        } else if line.is_empty() && (!current_event.is_empty() || !current_data.is_empty()) {
            events.push((current_event.clone(), current_data.clone()));
            current_event.clear();
            current_data.clear();
        }
    }

    if !current_event.is_empty() || !current_data.is_empty() {
        events.push((current_event, current_data));
    }

    events
}

/// Expected input estimate for a tool-less request of plain user texts.
fn estimated_input_tokens(texts: &[&str]) -> i32 {
    let converted = request::ChatCompletionsRequest {
        messages: texts
            .iter()
            .map(|text| request::Message::text(request::Role::User, *text))
            .collect(),
        max_tokens: None,
        model: "claude-x".to_string(),
        stop: None,
        stream: false,
        stream_options: None,
        temperature: None,
        top_p: None,
        user: None,
        tools: None,
        tool_choice: None,
    };
    tokens::estimate_input_tokens(&converted)
}

#[tokio::test]
async fn non_streaming_text_round_trip() {
    let upstream = spawn_upstream(Canned::Json(
        r#"{"choices":[{"message":{"content":"Hi!"},"finish_reason":"stop"}],
            "usage":{"prompt_tokens":99,"completion_tokens":99,"total_tokens":198}}"#
            .to_string(),
    ))
    .await;
    let app = build_app(upstream);

    let body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "messages": [{"role": "user", "content": "Hello!"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, Some("sk-test")))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let json = body_json(response).await;
    assert_eq!(json["type"], "message");
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["content"][0]["type"], "text");
    assert_eq!(json["content"][0]["text"], "Hi!");
    assert_eq!(json["stop_reason"], "end_turn");
    assert!(json["stop_sequence"].is_null());
    assert!(json["id"].as_str().unwrap().starts_with("msg_"));

    // Usage is computed locally, not copied from the upstream figures.
    assert_eq!(
        json["usage"]["output_tokens"],
        tokens::count_tokens("Hi!") as i64
    );
    assert_eq!(
        json["usage"]["input_tokens"],
        estimated_input_tokens(&["Hello!"]) as i64
    );
}

#[tokio::test]
async fn non_streaming_malformed_tool_arguments_degrade_to_empty_input() {
    let upstream = spawn_upstream(Canned::Json(
        r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"t1","type":"function","function":{"name":"lookup","arguments":"{bad json"}}
        ]},"finish_reason":"tool_calls"}]}"#
            .to_string(),
    ))
    .await;
    let app = build_app(upstream);

    let body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "messages": [{"role": "user", "content": "Look it up"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, Some("sk-test")))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let json = body_json(response).await;
    assert_eq!(json["stop_reason"], "tool_use");
    assert_eq!(json["content"][0]["type"], "tool_use");
    assert_eq!(json["content"][0]["id"], "t1");
    assert_eq!(json["content"][0]["input"], serde_json::json!({}));
}

#[tokio::test]
async fn streaming_text_produces_complete_event_sequence() {
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
        "data: {bad frame\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"!\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":9,\"completion_tokens\":2,\"total_tokens\":11}}\n\n",
        "data: [DONE]\n\n",
    );
    let upstream = spawn_upstream(Canned::Sse(sse.to_string())).await;
    let app = build_app(upstream);

    let body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "stream": true,
        "messages": [{"role": "user", "content": "Hello!"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, Some("sk-test")))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let events = parse_sse_events(&String::from_utf8(bytes.to_vec()).unwrap());
    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();

    assert_eq!(
        names,
        vec![
            "message_start",
            "content_block_start",
            "content_block_delta",
            "content_block_delta",
            "content_block_stop",
            "message_delta",
            "message_stop",
        ]
    );

    let start: serde_json::Value = serde_json::from_str(&events[0].1).unwrap();
    assert_eq!(start["message"]["model"], "claude-x");
    assert_eq!(
        start["message"]["usage"]["input_tokens"],
        estimated_input_tokens(&["Hello!"]) as i64
    );

    let delta: serde_json::Value = serde_json::from_str(&events[2].1).unwrap();
    assert_eq!(delta["delta"]["type"], "text_delta");
    assert_eq!(delta["delta"]["text"], "Hi");

    // Locally tokenized output count, not the upstream's completion_tokens.
    let message_delta: serde_json::Value = serde_json::from_str(&events[5].1).unwrap();
    assert_eq!(message_delta["delta"]["stop_reason"], "end_turn");
    assert_eq!(
        message_delta["usage"]["output_tokens"],
        tokens::count_tokens("Hi!") as i64
    );
}

#[tokio::test]
async fn streaming_tool_call_produces_one_tool_block() {
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"c1\",\"type\":\"function\",\"function\":{\"name\":\"f\",\"arguments\":\"\"}}]},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"a\\\":\"}}]},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"1}\"}}]},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    let upstream = spawn_upstream(Canned::Sse(sse.to_string())).await;
    let app = build_app(upstream);

    let body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "stream": true,
        "messages": [{"role": "user", "content": "Look it up"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, Some("sk-test")))
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let events = parse_sse_events(&String::from_utf8(bytes.to_vec()).unwrap());
    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();

    assert_eq!(
        names,
        vec![
            "message_start",
            "content_block_start",
            "content_block_delta",
            "content_block_delta",
            "content_block_stop",
            "message_delta",
            "message_stop",
        ]
    );

    let start: serde_json::Value = serde_json::from_str(&events[1].1).unwrap();
    assert_eq!(start["index"], 0);
    assert_eq!(start["content_block"]["type"], "tool_use");
    assert_eq!(start["content_block"]["id"], "c1");
    assert_eq!(start["content_block"]["name"], "f");

    let first: serde_json::Value = serde_json::from_str(&events[2].1).unwrap();
    assert_eq!(first["delta"]["type"], "input_json_delta");
    assert_eq!(first["delta"]["partial_json"], "{\"a\":");
    let second: serde_json::Value = serde_json::from_str(&events[3].1).unwrap();
    assert_eq!(second["delta"]["partial_json"], "1}");

    let message_delta: serde_json::Value = serde_json::from_str(&events[5].1).unwrap();
    assert_eq!(message_delta["delta"]["stop_reason"], "tool_use");
    assert_eq!(
        message_delta["usage"]["output_tokens"],
        tokens::count_tokens("{\"a\":1}") as i64
    );
}

#[tokio::test]
async fn streaming_upstream_failure_emits_single_error_event() {
    let upstream =
        spawn_upstream(Canned::Error(503, "backend is down".to_string())).await;
    let app = build_app(upstream);

    let body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "stream": true,
        "messages": [{"role": "user", "content": "Hello!"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, Some("sk-test")))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let events = parse_sse_events(&String::from_utf8(bytes.to_vec()).unwrap());
    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["message_start", "error"]);

    let error: serde_json::Value = serde_json::from_str(&events[1].1).unwrap();
    assert_eq!(error["type"], "error");
    assert_eq!(error["error"]["type"], "api_error");
    assert_eq!(error["error"]["message"], "backend is down");
}

#[tokio::test]
async fn non_streaming_upstream_failure_relays_status_and_body() {
    let upstream =
        spawn_upstream(Canned::Error(429, "rate limited".to_string())).await;
    let app = build_app(upstream);

    let body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "messages": [{"role": "user", "content": "Hello!"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, Some("sk-test")))
        .await
        .unwrap();
    assert_eq!(response.status(), 429);

    let json = body_json(response).await;
    assert_eq!(json["type"], "error");
    assert_eq!(json["error"]["type"], "api_error");
    assert_eq!(json["error"]["message"], "rate limited");
}

#[tokio::test]
async fn count_tokens_matches_streaming_estimate() {
    let sse = "data: [DONE]\n\n";
    let upstream = spawn_upstream(Canned::Sse(sse.to_string())).await;
    let app = build_app(upstream);

    let tools = serde_json::json!([{
        "name": "lookup",
        "description": "Look something up",
        "input_schema": {"type": "object"}
    }]);

    let count_body = serde_json::json!({
        "model": "claude-x",
        "messages": [{"role": "user", "content": "Hello!"}],
        "system": "Be brief.",
        "tools": tools.clone()
    });

    let response = app
        .clone()
        .oneshot(post_request(
            "/v1/messages/count_tokens",
            count_body,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let counted = body_json(response).await["input_tokens"].as_i64().unwrap();

    let stream_body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "stream": true,
        "messages": [{"role": "user", "content": "Hello!"}],
        "system": "Be brief.",
        "tools": tools
    });

    let response = app
        .oneshot(post_request("/v1/messages", stream_body, Some("sk-test")))
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let events = parse_sse_events(&String::from_utf8(bytes.to_vec()).unwrap());

    let start: serde_json::Value = serde_json::from_str(&events[0].1).unwrap();
    assert_eq!(start["message"]["usage"]["input_tokens"].as_i64().unwrap(), counted);
}

#[tokio::test]
async fn missing_api_key_is_unauthorized() {
    let app = build_app("http://127.0.0.1:1".to_string());

    let body = serde_json::json!({
        "model": "claude-x",
        "max_tokens": 100,
        "messages": [{"role": "user", "content": "Hello!"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let json = body_json(response).await;
    assert_eq!(json["error"]["type"], "authentication_error");
}

#[tokio::test]
async fn non_claude_model_is_rejected() {
    let app = build_app("http://127.0.0.1:1".to_string());

    let body = serde_json::json!({
        "model": "gpt-4o",
        "max_tokens": 100,
        "messages": [{"role": "user", "content": "Hello!"}]
    });

    let response = app
        .oneshot(post_request("/v1/messages", body, Some("sk-test")))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let json = body_json(response).await;
    assert_eq!(json["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn malformed_body_is_invalid_request() {
    let app = build_app("http://127.0.0.1:1".to_string());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .header("x-api-key", "sk-test")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 400);

    let json = body_json(response).await;
    assert_eq!(json["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = build_app("http://127.0.0.1:1".to_string());

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/v1/models")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 404);

    let json = body_json(response).await;
    assert_eq!(json["error"]["type"], "not_found");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_app("http://127.0.0.1:1".to_string());

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 200);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}
