//! OpenAI and Ollama embedding providers against a local stub server.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qbot_rag::config::EmbeddingConfig;
use qbot_rag::embedding::{EmbeddingProvider, OllamaProvider, OpenAIProvider};
use qbot_rag::error::RagError;

/// Stub behavior: the first `fail_first` requests get `status`, the rest
/// get `dims`-wide vectors, one per input.
#[derive(Clone)]
struct Stub {
    hits: Arc<AtomicUsize>,
    fail_first: usize,
    status: StatusCode,
    dims: usize,
    auth: Arc<parking_lot::Mutex<Option<String>>>,
}

impl Stub {
    fn healthy(dims: usize) -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            fail_first: 0,
            status: StatusCode::OK,
            dims,
            auth: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    fn failing(status: StatusCode, fail_first: usize, dims: usize) -> Self {
        Self {
            fail_first,
            status,
            ..Self::healthy(dims)
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Returns an error response while still inside the failure window.
    fn gate(&self) -> Option<Response> {
        let n = self.hits.fetch_add(1, Ordering::SeqCst);
        (n < self.fail_first).then(|| (self.status, "busy").into_response())
    }
}

fn input_count(body: &serde_json::Value) -> usize {
    body["input"].as_array().map(|a| a.len()).unwrap_or(0)
}

async fn ollama_embed(State(stub): State<Stub>, Json(body): Json<serde_json::Value>) -> Response {
    if let Some(failure) = stub.gate() {
        return failure;
    }
    assert_eq!(body["model"], "nomic-embed-text");
    let embeddings: Vec<Vec<f32>> = (0..input_count(&body))
        .map(|i| vec![i as f32 + 1.0; stub.dims])
        .collect();
    Json(serde_json::json!({ "embeddings": embeddings })).into_response()
}

async fn openai_embed(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if let Some(failure) = stub.gate() {
        return failure;
    }
    *stub.auth.lock() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    // Reverse order; the client must sort by `index`.
    let data: Vec<serde_json::Value> = (0..input_count(&body))
        .rev()
        .map(|i| serde_json::json!({ "index": i, "embedding": vec![i as f32 + 1.0; stub.dims] }))
        .collect();
    Json(serde_json::json!({ "data": data })).into_response()
}

async fn spawn_stub(stub: Stub) -> String {
    let app = Router::new()
        .route("/api/embed", post(ollama_embed))
        .route("/v1/embeddings", post(openai_embed))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn embedding_config(provider: &str, model: &str, url: String, max_retries: u32) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: provider.to_string(),
        model: Some(model.to_string()),
        dims: Some(4),
        url: Some(url),
        max_retries,
        timeout_secs: 5,
        ..EmbeddingConfig::default()
    }
}

fn texts() -> Vec<String> {
    vec!["Hạ Long Bay".to_string(), "Cô Tô island".to_string()]
}

#[tokio::test]
async fn ollama_returns_one_vector_per_input() {
    let stub = Stub::healthy(4);
    let url = spawn_stub(stub.clone()).await;
    let provider =
        OllamaProvider::new(&embedding_config("ollama", "nomic-embed-text", url, 0)).unwrap();

    let vectors = provider.embed(&texts()).await.unwrap();
    assert_eq!(vectors.len(), 2);
    assert!(vectors.iter().all(|v| v.len() == 4));
    assert_eq!(vectors[1][0], 2.0);
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn client_error_fails_without_retry() {
    let stub = Stub::failing(StatusCode::BAD_REQUEST, usize::MAX, 4);
    let url = spawn_stub(stub.clone()).await;
    let provider =
        OllamaProvider::new(&embedding_config("ollama", "nomic-embed-text", url, 3)).unwrap();

    let err = provider.embed(&texts()).await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(ref m) if m.contains("400")), "{}", err);
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn server_error_is_retried() {
    let stub = Stub::failing(StatusCode::SERVICE_UNAVAILABLE, 1, 4);
    let url = spawn_stub(stub.clone()).await;
    let provider =
        OllamaProvider::new(&embedding_config("ollama", "nomic-embed-text", url, 1)).unwrap();

    let vectors = provider.embed(&texts()).await.unwrap();
    assert_eq!(vectors.len(), 2);
    assert_eq!(stub.hits(), 2);
}

#[tokio::test]
async fn rate_limit_gives_up_after_max_retries() {
    let stub = Stub::failing(StatusCode::TOO_MANY_REQUESTS, usize::MAX, 4);
    let url = spawn_stub(stub.clone()).await;
    let provider =
        OllamaProvider::new(&embedding_config("ollama", "nomic-embed-text", url, 1)).unwrap();

    let err = provider.embed(&texts()).await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(ref m) if m.contains("429")), "{}", err);
    assert_eq!(stub.hits(), 2);
}

#[tokio::test]
async fn wrong_dimensionality_is_rejected() {
    let stub = Stub::healthy(3);
    let url = spawn_stub(stub.clone()).await;
    let provider =
        OllamaProvider::new(&embedding_config("ollama", "nomic-embed-text", url, 0)).unwrap();

    let err = provider.embed(&texts()).await.unwrap_err();
    assert!(
        matches!(err, RagError::Embedding(ref m) if m.contains("dimension mismatch")),
        "{}",
        err
    );
}

#[tokio::test]
async fn openai_orders_by_index_and_sends_key() {
    let stub = Stub::healthy(4);
    let url = spawn_stub(stub.clone()).await;
    std::env::set_var("OPENAI_API_KEY", "sk-test");
    let provider =
        OpenAIProvider::new(&embedding_config("openai", "text-embedding-3-small", url, 0)).unwrap();

    let vectors = provider.embed(&texts()).await.unwrap();
    assert_eq!(vectors[0], vec![1.0; 4]);
    assert_eq!(vectors[1], vec![2.0; 4]);
    assert_eq!(stub.auth.lock().as_deref(), Some("Bearer sk-test"));
}

#[tokio::test]
async fn unreachable_endpoint_is_an_embedding_error() {
    let provider = OllamaProvider::new(&embedding_config(
        "ollama",
        "nomic-embed-text",
        "http://127.0.0.1:1".to_string(),
        0,
    ))
    .unwrap();

    let err = provider.embed(&texts()).await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(ref m) if m.contains("connection error")));
}
