//! axum router: `POST /ingest`, `POST /ask`, `GET /health`, `GET /`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use slope_rag::{App, IngestReport, QueryResponse};

#[derive(Clone)]
pub struct AppState {
    app: Arc<App>,
    data_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(app: App, data_dir: PathBuf) -> Self {
        Self { app: Arc::new(app), data_dir: Arc::new(data_dir) }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Internal failure, rendered as `500 {"detail": message}`.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/ask", post(ask))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn ingest(State(state): State<AppState>) -> Result<Json<IngestReport>, ApiError> {
    Ok(Json(state.app.ingest.ingest(&state.data_dir).await?))
}

async fn ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Result<Json<QueryResponse>, ApiError> {
    Ok(Json(state.app.pipeline.run(&req.question).await?))
}

async fn index() -> Html<&'static str> {
    Html(DEMO_PAGE)
}

const DEMO_PAGE: &str = r#"<!doctype html>
<html lang="zh">
<head>
<meta charset="utf-8">
<title>边坡稳定性问答</title>
<style>
body { font-family: sans-serif; max-width: 760px; margin: 2em auto; }
textarea { width: 100%; height: 5em; }
pre { background: #f4f4f4; padding: 1em; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>边坡稳定性问答</h1>
<textarea id="q" placeholder="例如：降雨对边坡稳定性有什么影响？"></textarea>
<p><button id="ask">提问</button> <button id="ingest">重新导入文档</button></p>
<pre id="out"></pre>
<script>
const out = document.getElementById("out");
async function call(path, body) {
  out.textContent = "...";
  const resp = await fetch(path, { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify(body || {}) });
  out.textContent = JSON.stringify(await resp.json(), null, 2);
}
document.getElementById("ask").onclick = () => call("/ask", { question: document.getElementById("q").value });
document.getElementById("ingest").onclick = () => call("/ingest");
</script>
</body>
</html>
"#;
