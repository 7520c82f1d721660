//! Async HTTP Server Module
//!
//! JSON query service over the proving engine, built on axum.
//!
//! # Endpoints
//!
//! - `POST /prove` - Does the conclusion follow from the premises?
//! - `POST /solve` - Is the constraint set satisfiable?
//! - `GET /health` - Health check
//! - `GET /stats` - Engine and cache statistics
//!
//! # Example
//!
//! ```rust,ignore
//! use entail::query::Engine;
//! use entail::server::{ServerConfig, run_server};
//! use entail::solver::SolverLimits;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Engine::new(None, SolverLimits::default());
//!     let config = ServerConfig::new(8080);
//!     run_server(engine, config).await.unwrap();
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{EntailError, ErrorResponse};
use crate::query::{Engine, ProveRequest, SolveRequest};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the async HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Enable CORS for all origins
    pub cors_permissive: bool,
}

impl ServerConfig {
    /// Create a new server configuration with the specified port
    pub fn new(port: u16) -> Self {
        Self { port, host: "0.0.0.0".to_string(), cors_permissive: true }
    }

    /// Set the host to bind to
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set CORS permissiveness
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, EntailError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| EntailError::config(format!("invalid bind address {}:{}", self.host, self.port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(8080)
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the server
pub struct AppState {
    /// The proving engine; internally synchronized
    pub engine: Engine,
    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: Engine, config: ServerConfig) -> Self {
        Self { engine, config }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;

// ============================================================================
// Error Handling
// ============================================================================

/// A typed error rendered as a JSON body with its mapped HTTP status
pub struct ApiError(EntailError);

impl From<EntailError> for ApiError {
    fn from(err: EntailError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Handle POST /prove
async fn prove(
    State(state): State<SharedState>,
    Json(request): Json<ProveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let verdict = state.engine.prove(&request)?;
    Ok(Json(verdict))
}

/// Handle POST /solve
async fn solve(
    State(state): State<SharedState>,
    Json(request): Json<SolveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let verdict = state.engine.solve(&request)?;
    Ok(Json(verdict))
}

/// Serve the HTML query form at /
async fn index_page() -> Html<&'static str> {
    Html(r#"<!DOCTYPE html>
<html>
<head>
    <title>Entail Query Endpoint</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
               max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #333; }
        pre { background: #f5f5f5; padding: 15px; overflow-x: auto; }
        code { background: #f5f5f5; }
    </style>
</head>
<body>
    <h1>Entail Query Endpoint</h1>
    <p>POST a JSON query to <code>/prove</code> or <code>/solve</code>:</p>
    <pre>{
    "premises": ["H(s)", "Implies(H(s), M(s))"],
    "conclusion": "M(s)",
    "aliases": {"H": "Human", "M": "Mortal", "s": "socrates"}
}</pre>
    <h3>Endpoints</h3>
    <ul>
        <li><code>POST /prove</code> - Does the conclusion follow from the premises?</li>
        <li><code>POST /solve</code> - Is the constraint set satisfiable?</li>
        <li><code>GET /health</code> - Health check</li>
        <li><code>GET /stats</code> - Engine statistics</li>
    </ul>
</body>
</html>"#)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Engine statistics endpoint
async fn stats(State(state): State<SharedState>) -> impl IntoResponse {
    let json = serde_json::json!({
        "status": "ok",
        "cached_verdicts": state.engine.cache_len(),
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], json.to_string())
}

// ============================================================================
// Server Setup
// ============================================================================

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/", get(index_page))
        .route("/prove", post(prove))
        .route("/solve", post(solve))
        .route("/health", get(health_check))
        .route("/stats", get(stats));

    if state.config.cors_permissive {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_origin(Any)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// Run the async HTTP server
///
/// This function blocks until the server is shut down (via Ctrl+C).
pub async fn run_server(engine: Engine, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(engine, config));
    let app = create_router(state);

    eprintln!("Query server listening on http://{}", addr);
    eprintln!("  Endpoints:");
    eprintln!("  - POST /prove   - Does the conclusion follow from the premises?");
    eprintln!("  - POST /solve   - Is the constraint set satisfiable?");
    eprintln!("  - GET  /health  - Health check");
    eprintln!("  - GET  /stats   - Engine statistics");
    eprintln!();
    eprintln!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("Server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        eprintln!("warning: cannot install Ctrl+C handler: {}", err);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProofCache;
    use crate::solver::SolverLimits;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn test_app() -> Router {
        let engine = Engine::new(Some(ProofCache::in_memory().unwrap()), SolverLimits::default());
        let state = Arc::new(AppState::new(engine, ServerConfig::default()));
        create_router(state)
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let response = test_app()
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cached_verdicts"], 0);
    }

    #[tokio::test]
    async fn test_prove_modus_ponens() {
        let body = r#"{
            "premises": ["H(s)", "Implies(H(s), M(s))"],
            "conclusion": "M(s)"
        }"#;
        let response = test_app().oneshot(json_post("/prove", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["proven"], true);
        assert_eq!(json["reason"], "proved");
    }

    #[tokio::test]
    async fn test_prove_refuted_includes_counterexample() {
        let body = r#"{
            "premises": ["H(s)", "Implies(H(s), M(s))"],
            "conclusion": "Not(M(s))"
        }"#;
        let response = test_app().oneshot(json_post("/prove", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["proven"], false);
        assert_eq!(json["reason"], "refuted");
        assert_eq!(json["counterexample"]["M(s)"], true);
    }

    #[tokio::test]
    async fn test_solve_returns_model() {
        let body = r#"{
            "constraints": ["x + y == 10", "x > 3", "y > 2"]
        }"#;
        let response = test_app().oneshot(json_post("/solve", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["satisfiable"], true);
        let x = json["model"]["x"].as_i64().unwrap();
        let y = json["model"]["y"].as_i64().unwrap();
        assert_eq!(x + y, 10);
    }

    #[tokio::test]
    async fn test_declaration_conflict_maps_to_bad_request() {
        let body = r#"{
            "premises": ["s(a)"],
            "conclusion": "s(a)",
            "type_hints": {"s": "individual"}
        }"#;
        let response = test_app().oneshot(json_post("/prove", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["code"], "DeclarationConflict");
    }

    #[tokio::test]
    async fn test_empty_constraints_rejected() {
        let response = test_app().oneshot(json_post("/solve", r#"{"constraints": []}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_index_page_serves_html() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
