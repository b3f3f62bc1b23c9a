//! HTTP API
//!
//! axum router over the inspection store. Owner endpoints authenticate with a
//! bearer token; blocking SQLite calls run on the blocking pool.

mod error;
mod handlers;
mod middleware;

pub use error::{ApiError, ApiResult};
pub use handlers::{ANALYSIS_UNAVAILABLE, CurrentUser};
pub use middleware::REQUEST_ID_HEADER;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tracing::{info, warn};

use crate::analysis::AnalysisService;
use crate::auth::{FirebaseVerifier, SharedVerifier};
use crate::config::Config;
use crate::storage::{Database, SharedDatabase, UploadStore};
use crate::types::Result;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDatabase,
    pub uploads: UploadStore,
    /// `None` when no model API key was configured
    pub analysis: Option<Arc<AnalysisService>>,
    pub verifier: SharedVerifier,
    pub base_url: Arc<str>,
    pub cors_origins: Arc<[String]>,
}

impl AppState {
    pub fn new(
        db: SharedDatabase,
        uploads: UploadStore,
        analysis: Option<AnalysisService>,
        verifier: SharedVerifier,
        base_url: &str,
    ) -> Self {
        Self {
            db,
            uploads,
            analysis: analysis.map(Arc::new),
            verifier,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            cors_origins: Arc::from(vec!["*".to_string()]),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::from(origins);
        self
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.cors_origins.iter().any(|o| o == "*" || o == origin)
    }

    /// Assemble state from configuration
    ///
    /// A missing model key is not fatal: the server starts and uploads are
    /// recorded as failed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database.path)?;
        db.initialize()?;

        let uploads = UploadStore::new(&config.server.upload_dir)?;

        let analysis = match AnalysisService::from_config(&config.llm) {
            Ok(service) => Some(service),
            Err(err) => {
                warn!(error = %err, "Analysis service initialization failed");
                None
            }
        };

        let verifier: SharedVerifier = Arc::new(FirebaseVerifier::new(&config.auth)?);

        Ok(Self::new(
            Arc::new(db),
            uploads,
            analysis,
            verifier,
            &config.server.base_url,
        )
        .with_cors_origins(config.server.cors_origins.clone()))
    }
}

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/my-inspections", get(handlers::my_inspections))
        .route("/inspections", get(handlers::list_inspections))
        .route(
            "/inspections/:id",
            get(handlers::get_inspection).delete(handlers::delete_inspection),
        )
        .route("/inspections/:id/export", get(handlers::export_inspection))
        .route("/uploads/:file", get(handlers::serve_upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(from_fn_with_state(state.clone(), middleware::cors))
        .layer(from_fn(middleware::request_context))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let router = build_router(state, config.server.max_upload_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, base_url = %config.server.base_url, "Quality Control Inspector API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ImageInput, VisionProvider};
    use crate::auth::{INVALID_HEADER_FORMAT, StaticVerifier};
    use crate::types::QcError;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderValue, Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "qcinspect-test-boundary";

    struct FixedProvider {
        reply: std::result::Result<String, String>,
    }

    #[async_trait]
    impl VisionProvider for FixedProvider {
        async fn invoke(&self, model_id: &str, _prompt: &str, _image: &ImageInput) -> Result<String> {
            self.reply
                .clone()
                .map_err(|message| QcError::model(model_id, message))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Harness {
        _dir: TempDir,
        state: AppState,
        router: Router,
    }

    impl Harness {
        fn new(reply: Option<std::result::Result<&str, &str>>) -> Self {
            let dir = TempDir::new().unwrap();
            let db = Database::open_in_memory().unwrap();
            db.initialize().unwrap();
            let uploads = UploadStore::new(dir.path().join("uploads")).unwrap();

            let analysis = reply.map(|reply| {
                let provider = Arc::new(FixedProvider {
                    reply: reply.map(str::to_string).map_err(str::to_string),
                });
                AnalysisService::new(provider, vec!["m1".to_string()]).unwrap()
            });

            let verifier = StaticVerifier::new()
                .with_token("alice-token", "alice")
                .with_token("bob-token", "bob");

            let state = AppState::new(
                Arc::new(db),
                uploads,
                analysis,
                Arc::new(verifier),
                "http://testserver/",
            );
            let router = build_router(state.clone(), 1024 * 1024);

            Self {
                _dir: dir,
                state,
                router,
            }
        }

        async fn send(&self, req: Request<Body>) -> Response {
            self.router.clone().oneshot(req).await.unwrap()
        }

        async fn get(&self, uri: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder().uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }

        async fn upload(&self, token: &str, file_name: &str, bytes: &[u8]) -> Response {
            let mut body = Vec::new();
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

            let req = Request::builder()
                .method("POST")
                .uri("/upload")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap();
            self.send(req).await
        }

        async fn upload_json(&self, token: &str, file_name: &str) -> Value {
            let resp = self.upload(token, file_name, b"fake-image").await;
            assert_eq!(resp.status(), StatusCode::OK);
            body_json(resp).await
        }
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const GOOD_REPLY: &str = r#"```json
{"defects": [{"name": "Scratch", "description": "Edge", "severity": "High", "confidence": 0.9}],
 "severity_breakdown": {"critical": 0, "high": 1, "medium": 0, "low": 0},
 "overall_severity": "High", "quality_issues": [], "recommendations": ["Polish"]}
```"#;

    #[tokio::test]
    async fn test_health_and_banner() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));

        let resp = h.get("/health", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"status": "healthy"}));

        let banner = body_json(h.get("/", None).await).await;
        assert_eq!(banner["env_check"]["database"], "OK");
        assert_eq!(banner["env_check"]["analysis_service"], "OK");
        assert_eq!(banner["env_check"]["base_url"], "http://testserver");

        let h = Harness::new(None);
        let banner = body_json(h.get("/", None).await).await;
        assert_eq!(
            banner["env_check"]["analysis_service"],
            "Failed (check GOOGLE_API_KEY)"
        );
    }

    #[tokio::test]
    async fn test_auth_failures() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));

        let resp = h.get("/my-inspections", None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(resp).await["detail"],
            "Missing Authorization Header"
        );

        let req = Request::builder()
            .uri("/my-inspections")
            .header(header::AUTHORIZATION, "Token abc")
            .body(Body::empty())
            .unwrap();
        let resp = h.send(req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(resp).await["detail"],
            "Invalid Authorization Header Format"
        );

        let req = Request::builder()
            .uri("/my-inspections")
            .header(
                header::AUTHORIZATION,
                HeaderValue::from_bytes(b"Bearer \xffabc").unwrap(),
            )
            .body(Body::empty())
            .unwrap();
        let resp = h.send(req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["detail"], INVALID_HEADER_FORMAT);

        let resp = h.get("/my-inspections", Some("stolen")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["detail"], "Invalid or Expired Token");
    }

    #[tokio::test]
    async fn test_upload_completed() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));
        let record = h.upload_json("alice-token", "widget.png").await;

        assert_eq!(record["status"], "completed");
        assert_eq!(record["user_id"], "alice");
        assert_eq!(record["analysis_result"]["overall_severity"], "High");
        assert_eq!(record["analysis_result"]["severity_breakdown"]["high"], 1);

        let image_path = record["image_path"].as_str().unwrap();
        assert!(image_path.ends_with(".png"));
        assert_eq!(
            record["image_url"],
            format!("http://testserver/uploads/{image_path}")
        );
        assert!(h.state.uploads.root().join(image_path).exists());
    }

    #[tokio::test]
    async fn test_upload_model_failure_is_recorded() {
        let h = Harness::new(Some(Err("429 RESOURCE_EXHAUSTED")));
        let record = h.upload_json("alice-token", "widget.jpg").await;

        assert_eq!(record["status"], "failed");
        assert!(
            record["analysis_result"]["error"]
                .as_str()
                .unwrap()
                .contains("Daily Quota Exceeded")
        );
    }

    #[tokio::test]
    async fn test_upload_empty_error_is_completed() {
        let h = Harness::new(Some(Ok(r#"{"error": "", "overall_severity": "Low"}"#)));
        let record = h.upload_json("alice-token", "widget.jpg").await;

        assert_eq!(record["status"], "completed");
        assert_eq!(record["analysis_result"]["error"], "");
    }

    #[tokio::test]
    async fn test_upload_removed_when_insert_fails() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));
        h.state
            .db
            .connection()
            .unwrap()
            .execute_batch("DROP TABLE inspection_profiles")
            .unwrap();

        let resp = h.upload("alice-token", "widget.png", b"fake-image").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let leftover = std::fs::read_dir(h.state.uploads.root()).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_upload_without_analysis_service() {
        let h = Harness::new(None);
        let record = h.upload_json("alice-token", "widget").await;

        assert_eq!(record["status"], "failed");
        assert_eq!(record["analysis_result"]["error"], ANALYSIS_UNAVAILABLE);
        assert!(record["image_path"].as_str().unwrap().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{BOUNDARY}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::AUTHORIZATION, "Bearer alice-token")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let resp = h.send(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listings_and_ownership() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));
        let first = h.upload_json("alice-token", "a.png").await;
        let second = h.upload_json("bob-token", "b.png").await;

        let mine = body_json(h.get("/my-inspections", Some("alice-token")).await).await;
        let mine = mine.as_array().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["id"], first["id"]);
        assert!(mine[0]["image_url"].as_str().is_some());

        let all = body_json(h.get("/inspections", None).await).await;
        let all = all.as_array().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["id"], second["id"]);

        let page = body_json(h.get("/inspections?skip=1&limit=1", None).await).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["id"], first["id"]);

        let uri = format!("/inspections/{}", first["id"]);
        let resp = h.get(&uri, Some("alice-token")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = h.get(&uri, Some("bob-token")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(resp).await["detail"],
            "Not authorized to access this inspection"
        );

        let resp = h.get("/inspections/9999", Some("alice-token")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["detail"], "Inspection not found");
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_file() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));
        let record = h.upload_json("alice-token", "a.png").await;
        let uri = format!("/inspections/{}", record["id"]);
        let image = h
            .state
            .uploads
            .root()
            .join(record["image_path"].as_str().unwrap());

        let delete = |token: &'static str| {
            Request::builder()
                .method("DELETE")
                .uri(uri.clone())
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let resp = h.send(delete("bob-token")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(resp).await["detail"],
            "Not authorized to delete this inspection"
        );

        let resp = h.send(delete("alice-token")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(!image.exists());

        let resp = h.send(delete("alice-token")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_file() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));
        let record = h.upload_json("alice-token", "a.png").await;
        std::fs::remove_file(
            h.state
                .uploads
                .root()
                .join(record["image_path"].as_str().unwrap()),
        )
        .unwrap();

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/inspections/{}", record["id"]))
            .header(header::AUTHORIZATION, "Bearer alice-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(h.send(req).await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_export_markdown() {
        let h = Harness::new(Some(Ok(GOOD_REPLY)));
        let record = h.upload_json("alice-token", "a.png").await;
        let id = record["id"].as_i64().unwrap();

        let resp = h
            .get(&format!("/inspections/{id}/export"), Some("alice-token"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(
            resp.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/markdown")
        );
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=inspection_report_{id}.md").as_str()
        );

        let text = body_text(resp).await;
        assert!(text.contains(&format!("**Inspection ID:** {id}")));
        assert!(text.contains("| Scratch | Edge | High | 0.9 |"));

        let resp = h
            .get(&format!("/inspections/{id}/export"), Some("bob-token"))
            .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_serve_upload() {
        let h = Harness::new(None);
        let record = h.upload_json("alice-token", "a.png").await;
        let image_path = record["image_path"].as_str().unwrap();

        let resp = h.get(&format!("/uploads/{image_path}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(body_text(resp).await, "fake-image");

        let resp = h.get("/uploads/missing.png", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["detail"], "File not found");

        let resp = h.get("/uploads/..%2Fsecret", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cors_and_request_id() {
        let h = Harness::new(None);

        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/upload")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let resp = h.send(preflight).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );

        let req = Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();
        let resp = h.send(req).await;
        assert_eq!(resp.headers()[REQUEST_ID_HEADER], "req-42");

        let resp = h.get("/health", None).await;
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn test_restricted_origins() {
        let h = Harness::new(None);
        let state = h
            .state
            .clone()
            .with_cors_origins(vec!["http://localhost:3000".to_string()]);
        assert!(state.allows_origin("http://localhost:3000"));
        assert!(!state.allows_origin("http://evil.example"));
    }
}
