// Vault Ledger - Web Server
// REST + HTML views over the vault pipeline (axum)

use crate::config::LedgerConfig;
use crate::error::Result as LedgerResult;
use crate::ledger;
use crate::processor::TransactionProcessor;
use crate::report::{self, BookkeepingReport};
use crate::rules::Classify;
use crate::transaction::{Transaction, TransactionType};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    config: Arc<LedgerConfig>,
    classifier: Arc<dyn Classify>,
    /// Serializes ledger refreshes: one writer per process
    refresh_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: LedgerConfig, classifier: Arc<dyn Classify>) -> Self {
        AppState {
            config: Arc::new(config),
            classifier,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    fn processor(&self) -> LedgerResult<TransactionProcessor> {
        TransactionProcessor::with_classifier(
            self.config.vault_dir.clone(),
            self.config.ledger_dir.clone(),
            self.classifier.clone(),
        )
    }

    fn read_transactions(&self) -> LedgerResult<Vec<Transaction>> {
        self.processor()?.read_csv_files()
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Result of a manual ledger refresh
#[derive(Serialize)]
struct ProcessResponse {
    status: &'static str,
    message: &'static str,
}

const READ_FAILURE: &str = "Failed to read transaction files";

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/bookkeeping - Grouped transactions + summary
async fn bookkeeping_api(State(state): State<AppState>) -> Response {
    match state.read_transactions() {
        Ok(transactions) => {
            let report = BookkeepingReport::build(&transactions);
            (StatusCode::OK, Json(ApiResponse::ok(report))).into_response()
        }
        Err(e) => {
            log::error!("Error reading CSV files: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::err(READ_FAILURE)),
            )
                .into_response()
        }
    }
}

/// GET /api/bookkeeping/:kind - Transactions of one type
async fn bookkeeping_by_kind(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Response {
    let Some(kind) = TransactionType::from_label(&kind) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::err(format!("Unknown transaction type: {}", kind))),
        )
            .into_response();
    };

    match state.read_transactions() {
        Ok(transactions) => {
            let filtered: Vec<Transaction> = transactions
                .into_iter()
                .filter(|tx| tx.kind() == kind)
                .collect();
            (StatusCode::OK, Json(ApiResponse::ok(filtered))).into_response()
        }
        Err(e) => {
            log::error!("Error filtering transactions by {}: {}", kind, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::err(READ_FAILURE)),
            )
                .into_response()
        }
    }
}

/// POST /api/bookkeeping/process - Rebuild the ledger snapshot
async fn process_transactions(State(state): State<AppState>) -> Response {
    let _guard = state.refresh_lock.lock().await;

    let outcome = state
        .processor()
        .and_then(|processor| ledger::run_with(&processor));

    match outcome {
        Ok(_) => (
            StatusCode::OK,
            Json(ProcessResponse {
                status: "success",
                message: "Transactions processed successfully",
            }),
        )
            .into_response(),
        Err(e) => {
            log::error!("Error processing transactions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProcessResponse {
                    status: "error",
                    message: "Failed to process transactions",
                }),
            )
                .into_response()
        }
    }
}

// ============================================================================
// HTML Handlers
// ============================================================================

/// GET /bookkeeping - HTML report
async fn bookkeeping_page(State(state): State<AppState>) -> Response {
    let year = report::current_year();

    match state.read_transactions() {
        Ok(transactions) => {
            let report = BookkeepingReport::build(&transactions);
            Html(report::render_bookkeeping_page(&report, year)).into_response()
        }
        Err(e) => {
            log::error!("Error reading CSV files: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(report::render_error_page(READ_FAILURE, year)),
            )
                .into_response()
        }
    }
}

/// GET /ledger - Current snapshot, or the placeholder when none exists
async fn ledger_page(State(state): State<AppState>) -> Response {
    let year = report::current_year();

    match ledger::read_snapshot(&state.config.ledger_dir) {
        Ok(snapshot) => Html(report::render_ledger_page(snapshot.as_deref(), year)).into_response(),
        Err(e) => {
            log::error!("Could not read ledger file: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(report::render_error_page("Failed to read ledger", year)),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/bookkeeping", get(bookkeeping_api))
        .route("/bookkeeping/process", post(process_transactions))
        .route("/bookkeeping/:kind", get(bookkeeping_by_kind))
        .with_state(state.clone());

    Router::new()
        .route("/bookkeeping", get(bookkeeping_page))
        .route("/ledger", get(ledger_page))
        .with_state(state)
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

/// Bind `config.bind_addr` and serve until the process stops
pub async fn serve(config: LedgerConfig, classifier: Arc<dyn Classify>) -> anyhow::Result<()> {
    use anyhow::Context;

    let addr = config.bind_addr.clone();
    log::info!(
        "Serving vault {} / ledger {}",
        config.vault_dir.display(),
        config.ledger_dir.display()
    );

    let app = router(AppState::new(config, classifier));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleEngine;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Fixture {
        _root: TempDir,
        config: LedgerConfig,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let root = TempDir::new().unwrap();
        let vault = root.path().join("vault");
        fs::create_dir(&vault).unwrap();
        for (name, content) in files {
            fs::write(vault.join(name), content).unwrap();
        }
        let config = LedgerConfig::with_dirs(vault, root.path().join("ledger"));
        Fixture {
            _root: root,
            config,
        }
    }

    fn app(config: &LedgerConfig) -> Router {
        router(AppState::new(
            config.clone(),
            Arc::new(RuleEngine::with_builtin_rules()),
        ))
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    const SCENARIO: &str = "id,type,amount\nT1,Payment,100.50\nT2,Fee,2.00\nT3,Transfer,oops\n";

    #[tokio::test]
    async fn test_health() {
        let fx = fixture(&[]);
        let (status, body) = call(app(&fx.config), Method::GET, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn test_bookkeeping_api_scenario() {
        let fx = fixture(&[("ledger.csv", SCENARIO)]);
        let (status, body) = call(app(&fx.config), Method::GET, "/api/bookkeeping").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("transactions").is_none(), "report is nested under data");
        let data = &json["data"];
        assert_eq!(data["count"], 3);
        assert_eq!(data["summary"]["total_transactions"], 3);
        assert_eq!(data["summary"]["net_liquidity"], 102.5);
        assert_eq!(data["summary"]["transfers_sum"], 0.0);
        assert_eq!(data["transactions"]["Payments"][0]["transaction_id"], "T1");
        assert_eq!(data["transactions"]["Transfers"][0]["amount"], "oops");
    }

    #[tokio::test]
    async fn test_missing_vault_is_error_envelope() {
        let fx = fixture(&[]);
        let mut config = fx.config.clone();
        config.vault_dir = config.vault_dir.join("does-not-exist");

        let (status, body) = call(app(&config), Method::GET, "/api/bookkeeping").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], READ_FAILURE);
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_missing_vault_html_is_error_page() {
        let fx = fixture(&[]);
        let mut config = fx.config.clone();
        config.vault_dir = config.vault_dir.join("does-not-exist");

        let (status, body) = call(app(&config), Method::GET, "/bookkeeping").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains(READ_FAILURE));
    }

    #[tokio::test]
    async fn test_bookkeeping_page() {
        let fx = fixture(&[("ledger.csv", SCENARIO)]);
        let (status, body) = call(app(&fx.config), Method::GET, "/bookkeeping").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<td>Fees</td><td>1</td><td>2.00</td>"));
        assert!(body.contains("Net liquidity: 102.50"));
    }

    #[tokio::test]
    async fn test_filter_by_kind() {
        let fx = fixture(&[("ledger.csv", SCENARIO)]);

        let (status, body) = call(app(&fx.config), Method::GET, "/api/bookkeeping/fees").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["transaction_id"], "T2");

        let (status, _) = call(app(&fx.config), Method::GET, "/api/bookkeeping/refunds").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_process_then_ledger_page() {
        let fx = fixture(&[("ledger.csv", SCENARIO)]);

        let (_, before) = call(app(&fx.config), Method::GET, "/ledger").await;
        assert!(before.contains("No Ledger Available"));

        let (status, body) =
            call(app(&fx.config), Method::POST, "/api/bookkeeping/process").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "success");

        let (status, after) = call(app(&fx.config), Method::GET, "/ledger").await;
        assert_eq!(status, StatusCode::OK);
        assert!(after.contains("# FK Master Ledger"));
        assert!(after.contains("class=\"ledger-content\""));
    }

    #[tokio::test]
    async fn test_process_failure_reports_error() {
        let fx = fixture(&[("bad.csv", "id,description\nT1,no amount\n")]);

        let (status, body) =
            call(app(&fx.config), Method::POST, "/api/bookkeeping/process").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn test_method_gating() {
        let fx = fixture(&[]);

        let (status, _) = call(app(&fx.config), Method::GET, "/api/bookkeeping/process").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(app(&fx.config), Method::POST, "/api/bookkeeping").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
