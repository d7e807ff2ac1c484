use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use focusia::config::Config;
use focusia::runtime::build_pipeline_with;
use focusia::server::{router, AppState};
use focusia_core::generate::{
    ChatError, ChatErrorKind, ChatRequest, CompletionRequest, GenerationBackend,
};

const CORPUS: &str = r#"[
  {"topic": "Pomodoro", "content": "25 dakika çalış, 5 dakika mola ver."},
  {"topic": "Telefon", "content": "Telefonu başka bir odaya koy, bildirimleri kapat."}
]"#;

struct FixedBackend(Result<String, ChatError>);

#[async_trait]
impl GenerationBackend for FixedBackend {
    fn model(&self) -> &str {
        "fixed"
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<String, ChatError> {
        self.0.clone()
    }

    async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
        anyhow::bail!("completion not scripted")
    }
}

/// Build a pipeline over a temp corpus and serve it on an ephemeral port.
async fn spawn_server(tmp: &TempDir, chat: Result<String, ChatError>) -> String {
    let corpus = tmp.path().join("focus_tips.json");
    fs::write(&corpus, CORPUS).unwrap();

    let mut config = Config::default();
    config.embedding.provider = "hashing".to_string();
    config.corpus.path = corpus;
    config.index.persist_dir = tmp.path().join("index_db");
    config.retrieval.k = 2;
    config.retrieval.fetch_k = 2;

    let runtime = build_pipeline_with(&config, Arc::new(FixedBackend(chat)))
        .await
        .unwrap();
    let app = router(AppState {
        pipeline: runtime.pipeline,
        units: runtime.units,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_ask(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health_reports_unit_count() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(&tmp, Ok("tamam".into())).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["units"], 2);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_ask_returns_text_and_sources() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(
        &tmp,
        Ok("1. Telefonu sessize al\n2. Bildirimleri kapat\n3. Odayı değiştir".into()),
    )
    .await;

    let (status, body) = post_ask(&base, json!({"query": "telefon bildirimleri"})).await;
    assert_eq!(status, 200);

    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("- Telefonu sessize al"));
    assert!(text.contains("egzersiz"));

    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["topic"], "Telefon");
    assert!(sources[0]["snippet"].as_str().unwrap().starts_with("Telefon"));
}

#[tokio::test]
async fn test_blank_query_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(&tmp, Ok("tamam".into())).await;

    for body in [json!({"query": "   "}), json!({})] {
        let (status, body) = post_ask(&base, body).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "bad_request");
        assert_eq!(body["error"]["message"], "Lütfen kısa bir durum cümlesi yaz.");
    }
}

#[tokio::test]
async fn test_malformed_body_uses_error_contract() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(&tmp, Ok("tamam".into())).await;
    let client = reqwest::Client::new();

    let cases = [
        (Some("application/json"), "{ not json"),
        (Some("application/json"), r#"{"query": 42}"#),
        (None, r#"{"query": "odak"}"#),
    ];
    for (content_type, raw) in cases {
        let mut request = client.post(format!("{}/ask", base)).body(raw);
        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }
        let resp = request.send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 400, "body: {}", raw);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_generation_failure_is_bad_gateway_and_server_survives() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(
        &tmp,
        Err(ChatError::new(ChatErrorKind::Unavailable, "model loading")),
    )
    .await;

    let (status, body) = post_ask(&base, json!({"query": "odaklanamıyorum"})).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "generation_failed");

    let health = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(health.status().as_u16(), 200);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_server(&tmp, Ok("tamam".into())).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/health", base))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
