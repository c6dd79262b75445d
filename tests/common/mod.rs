#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::DefaultBodyLimit,
    http::{Method, Request, StatusCode},
    Router,
};
use inc_manager::{
    auth::{USER_ID_HEADER, USER_ROLE_HEADER},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    inspection::SessionStore,
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const INSPECTOR: &str = "inspector-01";
pub const ADMIN: &str = "admin-01";
pub const BOUNDARY: &str = "inc-manager-test-boundary";

/// Three records over two receiving notices (48213 twice, 48214 once).
pub const RECEIVING_LIST: &str = "\
03/03/2025  48213  001 MPR.02199  PARAFUSO SEXTAVADO  UN  12,5  10 ACME  0  7731
03/03/2025  48214  001 MPR.03001  ARRUELA LISA  UN  200  11 FIXA  0  7732
03/03/2025  48213  002 MPR.02200  PORCA  M8  UN  40  10 ACME  0  7731
RELATORIO DE RECEBIMENTO - PAGINA 1
";

/// Who a request is sent as.
#[derive(Clone, Copy)]
pub enum Caller<'a> {
    Anonymous,
    User(&'a str),
    Admin(&'a str),
}

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let upload_dir = tempfile::tempdir().expect("create upload dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.upload_dir = upload_dir.path().to_string_lossy().into_owned();
        cfg.max_upload_bytes = 64 * 1024;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            SessionStore::new(),
            &cfg,
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", inc_manager::api_v1_routes())
            .layer(DefaultBodyLimit::max(cfg.max_upload_bytes))
            .with_state(state.clone());

        Self {
            router,
            state,
            upload_dir,
            _event_task: event_task,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is JSON")
        };
        (status, json)
    }

    fn builder(method: Method, uri: &str, caller: Caller<'_>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match caller {
            Caller::Anonymous => builder,
            Caller::User(id) => builder.header(USER_ID_HEADER, id),
            Caller::Admin(id) => builder
                .header(USER_ID_HEADER, id)
                .header(USER_ROLE_HEADER, "admin"),
        }
    }

    /// Send a JSON request and decode the JSON response.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        caller: Caller<'_>,
    ) -> (StatusCode, Value) {
        let mut builder = Self::builder(method, uri, caller);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };
        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Send a `multipart/form-data` request whose parts are `(field, filename, bytes)`.
    pub async fn upload(
        &self,
        uri: &str,
        parts: &[(&str, &str, &[u8])],
        caller: Caller<'_>,
    ) -> (StatusCode, Value) {
        let request = Self::builder(Method::POST, uri, caller)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("failed to build request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, caller: Caller<'_>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, caller).await
    }

    pub async fn post(&self, uri: &str, body: Value, caller: Caller<'_>) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), caller).await
    }

    pub async fn put(&self, uri: &str, body: Value, caller: Caller<'_>) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body), caller).await
    }

    pub async fn delete(&self, uri: &str, caller: Caller<'_>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None, caller).await
    }

    /// Registers a CRM token for `inspector` and imports `contents` as `filename`.
    pub async fn start_inspection(
        &self,
        inspector: &str,
        filename: &str,
        contents: &[u8],
    ) -> (StatusCode, Value) {
        let (status, _) = self
            .post(
                "/api/v1/inspection/crm-token",
                serde_json::json!({ "link": "https://crm.example.com/os?id=7&token=c0ffee42" }),
                Caller::User(inspector),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        self.upload(
            "/api/v1/inspection/import",
            &[("file", filename, contents)],
            Caller::User(inspector),
        )
        .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
