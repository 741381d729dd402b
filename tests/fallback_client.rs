//! Integration tests for model fallback against a mocked Gemini endpoint
//!
//! Every test runs the real reqwest backend against wiremock, so the error
//! envelope parsing, not-found classification and candidate ordering are all
//! exercised over HTTP.

use groundsense::config::Config;
use groundsense::error::GenerationError;
use groundsense::gemini::{GenerateRequest, ModelFallbackClient};
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, extra: &str) -> Config {
    Config::from_str(&format!(
        r#"
[server]
host = "127.0.0.1"
port = 3000

[gemini]
base_url = "{}/v1beta"
{}
"#,
        server.uri(),
        extra
    ))
    .expect("should parse test config")
}

fn client_for(server: &MockServer, extra: &str) -> ModelFallbackClient {
    let config = config_for(server, extra);
    ModelFallbackClient::from_config(&config.gemini, "test-key").expect("client should build")
}

fn model_path(model: &str) -> String {
    format!("/v1beta/models/{}:generateContent", model)
}

fn not_found(model: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": {
            "code": 404,
            "message": format!("models/{} is not found for API version v1beta", model),
            "status": "NOT_FOUND"
        }
    }))
}

fn success(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    }))
}

async fn mount(server: &MockServer, model: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path(model_path(model)))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fourth_candidate_answers_after_three_not_found() {
    let server = MockServer::start().await;
    mount(&server, "gemini-1.5-flash-latest", not_found("gemini-1.5-flash-latest"), 1).await;
    mount(&server, "gemini-1.5-flash", not_found("gemini-1.5-flash"), 1).await;
    mount(&server, "gemini-1.5-pro-latest", not_found("gemini-1.5-pro-latest"), 1).await;
    mount(&server, "gemini-1.5-pro", success("Recharge is falling in Punjab."), 1).await;
    mount(&server, "gemini-pro", success("should not be reached"), 0).await;

    let client = client_for(&server, "");
    let generation = client
        .generate(&GenerateRequest::text("Explain recharge trends"))
        .await
        .expect("fourth candidate should answer");

    assert_eq!(generation.text, "Recharge is falling in Punjab.");
    assert_eq!(generation.model, "gemini-1.5-pro");
    assert_eq!(
        generation.attempted_models(),
        vec![
            "gemini-1.5-flash-latest",
            "gemini-1.5-flash",
            "gemini-1.5-pro-latest",
            "gemini-1.5-pro"
        ]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_authentication_error_is_not_retried() {
    let server = MockServer::start().await;
    mount(
        &server,
        "gemini-1.5-flash-latest",
        ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })),
        1,
    )
    .await;
    mount(&server, "gemini-1.5-flash", success("unreachable"), 0).await;

    let err = client_for(&server, "")
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();

    match err {
        GenerationError::Api { model, message } => {
            assert_eq!(model, "gemini-1.5-flash-latest");
            assert_eq!(
                message,
                "400 INVALID_ARGUMENT: API key not valid. Please pass a valid API key."
            );
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_exhaustion_reports_last_candidate() {
    let server = MockServer::start().await;
    for model in ["primary-x", "fallback-y", "fallback-z"] {
        mount(&server, model, not_found(model), 1).await;
    }

    let client = client_for(
        &server,
        r#"
primary_model = "primary-x"
fallback_models = ["fallback-y", "fallback-z"]
"#,
    );
    let err = client
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.model(), Some("fallback-z"));
    match err {
        GenerationError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.to_string().contains("fallback-z is not found"));
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_duplicate_model_names_sent_once() {
    let server = MockServer::start().await;
    mount(&server, "gemini-pro", not_found("gemini-pro"), 1).await;
    mount(&server, "gemini-1.5-pro", success("ok"), 1).await;

    let client = client_for(
        &server,
        r#"
primary_model = "gemini-pro"
fallback_models = ["gemini-pro", "gemini-1.5-pro", "gemini-pro"]
"#,
    );
    let generation = client.generate(&GenerateRequest::text("hi")).await.unwrap();

    assert_eq!(generation.attempted_models(), vec!["gemini-pro", "gemini-1.5-pro"]);
}

#[tokio::test]
async fn test_plain_404_body_counts_as_not_found() {
    let server = MockServer::start().await;
    mount(
        &server,
        "a",
        ResponseTemplate::new(404).set_body_string("Not Found"),
        1,
    )
    .await;
    mount(&server, "b", success("ok"), 1).await;

    let client = client_for(
        &server,
        r#"
primary_model = "a"
fallback_models = ["b"]
"#,
    );
    let generation = client.generate(&GenerateRequest::text("hi")).await.unwrap();
    assert_eq!(generation.model, "b");
}

#[tokio::test]
async fn test_success_without_text_is_fatal() {
    let server = MockServer::start().await;
    mount(
        &server,
        "a",
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })),
        1,
    )
    .await;
    mount(&server, "b", success("unreachable"), 0).await;

    let client = client_for(
        &server,
        r#"
primary_model = "a"
fallback_models = ["b"]
"#,
    );
    let err = client
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse { ref model, .. } if model == "a"));
}

#[tokio::test]
async fn test_timeout_is_fatal() {
    let server = MockServer::start().await;
    mount(
        &server,
        "slow",
        success("late").set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    mount(&server, "b", success("unreachable"), 0).await;

    let client = client_for(
        &server,
        r#"
primary_model = "slow"
fallback_models = ["b"]
request_timeout_seconds = 1
"#,
    );
    let err = client
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GenerationError::Timeout {
            model: "slow".to_string(),
            timeout_seconds: 1
        }
    );
}

#[tokio::test]
async fn test_client_scope_skips_models_tried_by_earlier_call() {
    let server = MockServer::start().await;
    mount(&server, "a", not_found("a"), 1).await;
    mount(&server, "b", success("ok"), 1).await;
    mount(&server, "c", success("from c"), 1).await;

    let client = client_for(
        &server,
        r#"
primary_model = "a"
fallback_models = ["b", "c"]
attempted_scope = "client"
"#,
    );

    let first = client.generate(&GenerateRequest::text("one")).await.unwrap();
    assert_eq!(first.model, "b");

    let second = client.generate(&GenerateRequest::text("two")).await.unwrap();
    assert_eq!(second.model, "c");
    assert_eq!(second.attempted_models(), vec!["c"]);

    let third = client
        .generate(&GenerateRequest::text("three"))
        .await
        .unwrap_err();
    assert_eq!(third, GenerationError::NoCandidates);
}

#[tokio::test]
async fn test_request_carries_key_prompt_and_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(model_path("gemini-1.5-flash-latest")))
        .and(query_param("key", "test-key"))
        .and(body_string_contains("Which blocks are over-exploited?"))
        .and(body_string_contains("\"maxOutputTokens\":1024"))
        .and(body_string_contains("BLOCK_MEDIUM_AND_ABOVE"))
        .respond_with(success("matched"))
        .expect(1)
        .mount(&server)
        .await;

    let generation = client_for(&server, "")
        .generate(&GenerateRequest::text("Which blocks are over-exploited?"))
        .await
        .unwrap();
    assert_eq!(generation.text, "matched");
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Nothing listens on this port once the listener is dropped
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = Config::from_str(&format!(
        "[server]\nhost = \"127.0.0.1\"\nport = 3000\n\n[gemini]\nbase_url = \"http://127.0.0.1:{}/v1beta\"\n",
        port
    ))
    .unwrap();
    let client = ModelFallbackClient::from_config(&config.gemini, "test-key").unwrap();

    let err = client
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Transport { .. }), "{:?}", err);
    assert!(!err.to_string().contains("test-key"));
}
