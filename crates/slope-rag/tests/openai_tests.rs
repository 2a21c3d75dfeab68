use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

use slope_rag::generator::{Generator, OpenAiGenerator};
use slope_rag::prompt::GroundingPrompt;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/v1/")
}

fn prompt() -> GroundingPrompt {
    GroundingPrompt { system: "sys".into(), user: "question".into() }
}

#[tokio::test]
async fn sends_chat_request_and_returns_content() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["authorization"], "Bearer sk-test");
            assert_eq!(body["model"], "qwen-sft");
            assert_eq!(body["messages"][0]["role"], "system");
            assert_eq!(body["messages"][1]["content"], "question");
            assert_eq!(body["max_tokens"], 64);
            Json(json!({"choices": [{"message": {"role": "assistant", "content": "{\"risk_level\": \"low\"}"}}]}))
        }),
    );
    let base = serve(router).await;
    let generator = OpenAiGenerator::new(&base, "sk-test", "qwen-sft", 64).unwrap();
    assert_eq!(generator.generate(&prompt()).await.unwrap(), "{\"risk_level\": \"low\"}");
}

#[tokio::test]
async fn http_error_is_reported() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
    );
    let base = serve(router).await;
    let generator = OpenAiGenerator::new(&base, "k", "m", 16).unwrap();
    let err = generator.generate(&prompt()).await.unwrap_err();
    assert!(err.to_string().contains("503"));
}
