use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use focusia::config::EmbeddingConfig;
use focusia::embedding::create_provider;

async fn handle_embed(State(calls): State<Arc<AtomicUsize>>) -> (StatusCode, Json<Value>) {
    calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "model loading"})),
    )
}

async fn spawn_failing_ollama(calls: Arc<AtomicUsize>) -> String {
    let app = Router::new()
        .route("/api/embed", post(handle_embed))
        .with_state(calls);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn ollama_config(url: String) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: "ollama".to_string(),
        model: Some("nomic-embed-text".to_string()),
        dims: Some(768),
        url: Some(url),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_embedding_failure_is_not_retried_by_default() {
    let calls = Arc::new(AtomicUsize::new(0));
    let url = spawn_failing_ollama(calls.clone()).await;
    let provider = create_provider(&ollama_config(url)).unwrap();

    let started = Instant::now();
    let err = provider
        .embed(&["telefon dikkatimi dağıtıyor".to_string()])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("503"), "got: {}", err);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_explicit_retries_are_honored() {
    let calls = Arc::new(AtomicUsize::new(0));
    let url = spawn_failing_ollama(calls.clone()).await;
    let config = EmbeddingConfig {
        max_retries: 1,
        ..ollama_config(url)
    };
    let provider = create_provider(&config).unwrap();

    assert!(provider.embed(&["odak".to_string()]).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Uses the default local model, which is downloaded on first run.
#[cfg(feature = "local-embeddings-fastembed")]
#[tokio::test]
#[ignore = "downloads the all-minilm-l6-v2 model"]
async fn test_default_embedder_matches_inflected_words() {
    use focusia::index::build_or_load;
    use focusia_core::mmr::MmrParams;
    use focusia_core::retrieve::search;

    let tmp = tempfile::TempDir::new().unwrap();
    let corpus = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("focus_tips.json");
    let provider = create_provider(&EmbeddingConfig::default()).unwrap();
    let index = build_or_load(&corpus, &tmp.path().join("index_db"), provider.as_ref())
        .await
        .unwrap();

    let params = MmrParams {
        k: 3,
        fetch_k: 10,
        lambda_mult: 0.7,
    };
    let hits = search(
        index.store().as_ref(),
        provider.as_ref(),
        "telefonum sürekli dikkatimi dağıtıyor",
        &params,
    )
    .await
    .unwrap();

    assert!(
        hits.iter().any(|h| h.unit.topic == "Telefon"),
        "got: {:?}",
        hits.iter().map(|h| &h.unit.topic).collect::<Vec<_>>()
    );
}
