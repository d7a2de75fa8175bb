//! # API REST
//!
//! REST API implementation for the denials service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialisation, CORS, status-code mapping)
//!
//! Business logic lives in `denials-core`; handlers only translate requests and errors.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use denials_core::analytics::{DenialAnalytics, DenialBucket};
use denials_core::config::{core_config_from_env_values, ENV_PATTERN_FILE, ENV_STORE_FILE};
use denials_core::corrections::{AutoCorrection, CorrectionKind};
use denials_core::edi::control_number_for;
use denials_core::models::DateRange;
use denials_core::patterns::{CorrectionRule, DenialCategory, DenialPattern, RuleAction};
use denials_core::recommendations::{ActionKind, Priority, RecommendedAction};
use denials_core::service::AppliedCorrections;
use denials_core::validation::{ClaimValidation, Severity, ValidationIssue};
use denials_core::{
    DenialAnalysis, DenialError, DenialService, InMemoryStore, Money, NonEmptyText,
    PatternCatalogue, Percentage,
};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DenialService>,
}

impl AppState {
    pub fn new(service: DenialService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DenialAnalysisReq {
    pub denial_reasons: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApplyCorrectionsReq {
    pub corrections: Vec<AutoCorrection>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BatchValidationReq {
    pub claim_ids: Vec<String>,
}

/// Inclusive reporting window.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// First day, `YYYY-MM-DD`.
    pub from: NaiveDate,
    /// Last day, `YYYY-MM-DD`.
    pub to: NaiveDate,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patterns,
        analyse_denial,
        apply_corrections,
        validate_claim,
        validate_batch,
        render_edi,
        denial_analytics,
    ),
    components(schemas(
        HealthRes,
        DenialAnalysisReq,
        ApplyCorrectionsReq,
        BatchValidationReq,
        DenialAnalysis,
        DenialPattern,
        CorrectionRule,
        DenialCategory,
        RuleAction,
        AutoCorrection,
        CorrectionKind,
        RecommendedAction,
        ActionKind,
        Priority,
        AppliedCorrections,
        ClaimValidation,
        ValidationIssue,
        Severity,
        DenialAnalytics,
        DenialBucket,
        DateRange,
        Money,
        Percentage,
        NonEmptyText,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patterns", get(list_patterns))
        .route("/claims/validation", post(validate_batch))
        .route("/claims/:id/denial-analysis", post(analyse_denial))
        .route("/claims/:id/corrections", post(apply_corrections))
        .route("/claims/:id/validation", post(validate_claim))
        .route("/claims/:id/edi/:payer_id", get(render_edi))
        .route("/denials/analytics", get(denial_analytics))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds the denial service from process configuration.
///
/// `lookup` is typically `|k| std::env::var(k).ok()`. The store starts empty unless
/// `DENIALS_STORE_FILE` names a JSON snapshot, and the standard pattern catalogue is used unless
/// `DENIALS_PATTERN_FILE` names a YAML catalogue.
///
/// # Errors
///
/// Returns an error if the thresholds are invalid or either file cannot be loaded.
pub fn service_from_env_values(
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<DenialService> {
    let cfg = Arc::new(core_config_from_env_values(&lookup)?);

    let catalogue = match non_blank(lookup(ENV_PATTERN_FILE)) {
        Some(path) => PatternCatalogue::load_yaml_file(&PathBuf::from(path))?,
        None => PatternCatalogue::standard(),
    };

    let store = match non_blank(lookup(ENV_STORE_FILE)) {
        Some(path) => InMemoryStore::load_json_file(&PathBuf::from(path))?,
        None => {
            tracing::warn!("{} not set, starting with an empty store", ENV_STORE_FILE);
            InMemoryStore::new()
        }
    };

    tracing::info!(
        "denial service ready: {} patterns, max batch size {}",
        catalogue.len(),
        cfg.max_batch_size()
    );

    Ok(DenialService::new(
        cfg,
        Arc::new(catalogue),
        Arc::new(store),
    ))
}

/// Maps a core error to a status code and a generic body, logging the detail.
fn error_response(context: &str, e: DenialError) -> (StatusCode, &'static str) {
    if e.is_not_found() {
        tracing::error!("{}: {:?}", context, e);
        return (StatusCode::NOT_FOUND, "Not found");
    }
    match e {
        DenialError::InvalidInput(_) | DenialError::Text(_) | DenialError::Range(_) => {
            tracing::error!("{}: {:?}", context, e);
            (StatusCode::BAD_REQUEST, "Bad request")
        }
        other => {
            tracing::error!("{}: {:?}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Denials REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/patterns",
    responses(
        (status = 200, description = "Denial pattern catalogue", body = [DenialPattern])
    )
)]
/// List the denial patterns the service matches against, in catalogue order.
#[axum::debug_handler]
async fn list_patterns(State(state): State<AppState>) -> Json<Vec<DenialPattern>> {
    Json(state.service.catalogue().patterns().to_vec())
}

#[utoipa::path(
    post,
    path = "/claims/{id}/denial-analysis",
    params(("id" = String, Path, description = "Claim identifier")),
    request_body = DenialAnalysisReq,
    responses(
        (status = 200, description = "Denial analysis", body = DenialAnalysis),
        (status = 404, description = "Claim not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Analyse a denied claim
///
/// Matches the denial reasons against the pattern catalogue, proposes corrections, scores the
/// appeal probability and recommends next actions. Nothing is written to the store.
#[axum::debug_handler]
async fn analyse_denial(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DenialAnalysisReq>,
) -> Result<Json<DenialAnalysis>, (StatusCode, &'static str)> {
    match state.service.analyse_denial(&id, &req.denial_reasons).await {
        Ok(analysis) => Ok(Json(analysis)),
        Err(e) => Err(error_response("Analyse denial error", e)),
    }
}

#[utoipa::path(
    post,
    path = "/claims/{id}/corrections",
    params(("id" = String, Path, description = "Claim identifier")),
    request_body = ApplyCorrectionsReq,
    responses(
        (status = 200, description = "Corrections applied", body = AppliedCorrections),
        (status = 400, description = "Blank corrected value"),
        (status = 404, description = "Claim not found"),
        (status = 500, description = "Corrections could not be applied")
    )
)]
/// Apply corrections to a claim
///
/// Writes the corrections onto the stored claim, marks it auto-corrected and records an audit
/// entry.
#[axum::debug_handler]
async fn apply_corrections(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ApplyCorrectionsReq>,
) -> Result<Json<AppliedCorrections>, (StatusCode, &'static str)> {
    match state.service.apply_corrections(&id, &req.corrections).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => Err(error_response("Apply corrections error", e)),
    }
}

#[utoipa::path(
    post,
    path = "/claims/{id}/validation",
    params(("id" = String, Path, description = "Claim identifier")),
    responses(
        (status = 200, description = "Validation result", body = ClaimValidation),
        (status = 404, description = "Claim not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn validate_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClaimValidation>, (StatusCode, &'static str)> {
    match state.service.validate_claim(&id).await {
        Ok(v) => Ok(Json(v)),
        Err(e) => Err(error_response("Validate claim error", e)),
    }
}

#[utoipa::path(
    post,
    path = "/claims/validation",
    request_body = BatchValidationReq,
    responses(
        (status = 200, description = "Validation results in request order", body = [ClaimValidation]),
        (status = 400, description = "Empty or oversized batch"),
        (status = 500, description = "Internal server error")
    )
)]
/// Validate several claims concurrently
///
/// Claims that cannot be loaded come back as invalid results rather than failing the batch.
#[axum::debug_handler]
async fn validate_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchValidationReq>,
) -> Result<Json<Vec<ClaimValidation>>, (StatusCode, &'static str)> {
    match state.service.validate_batch(&req.claim_ids).await {
        Ok(results) => Ok(Json(results)),
        Err(e) => Err(error_response("Validate batch error", e)),
    }
}

#[utoipa::path(
    get,
    path = "/claims/{id}/edi/{payer_id}",
    params(
        ("id" = String, Path, description = "Claim identifier"),
        ("payer_id" = String, Path, description = "Payer connection identifier")
    ),
    responses(
        (status = 200, description = "X12 837P interchange", body = String, content_type = "text/plain"),
        (status = 400, description = "Payer inactive or claim empty"),
        (status = 404, description = "Claim, provider or payer connection not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Render a claim as an 837P interchange for a payer
#[axum::debug_handler]
async fn render_edi(
    State(state): State<AppState>,
    Path((id, payer_id)): Path<(String, String)>,
) -> Result<String, (StatusCode, &'static str)> {
    let control_number = control_number_for(chrono::Utc::now());
    match state
        .service
        .render_edi(&id, &payer_id, control_number)
        .await
    {
        Ok(edi) => Ok(edi),
        Err(e) => Err(error_response("Render EDI error", e)),
    }
}

#[utoipa::path(
    get,
    path = "/denials/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Denial analytics for the window", body = DenialAnalytics),
        (status = 400, description = "Invalid date range"),
        (status = 500, description = "Internal server error")
    )
)]
/// Summarise denials within an inclusive date range
#[axum::debug_handler]
async fn denial_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<DenialAnalytics>, (StatusCode, &'static str)> {
    let range = match DateRange::new(query.from, query.to) {
        Ok(r) => r,
        Err(e) => return Err(error_response("Invalid analytics range", e)),
    };
    match state.service.denial_analytics(range).await {
        Ok(analytics) => Ok(Json(analytics)),
        Err(e) => Err(error_response("Denial analytics error", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use denials_core::store::StoreSnapshot;
    use denials_core::CoreConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn snapshot() -> StoreSnapshot {
        serde_json::from_value(json!({
            "claims": [{
                "id": "claim-600",
                "patient_id": "patient-1",
                "provider_id": "provider-1",
                "payer_id": "payer-1",
                "service_date": "2024-03-14",
                "processing_status": "denied",
                "line_items": [{
                    "id": "l1",
                    "procedure_code": "97140",
                    "diagnosis_codes": ["M54.5"],
                    "charge": 60000
                }]
            }],
            "providers": [{
                "id": "provider-1",
                "name": "Riverside Family Practice",
                "npi": "1234567890"
            }],
            "payer_connections": [
                {
                    "payer_id": "payer-1",
                    "name": "Acme Health",
                    "submitter_id": "SUB123",
                    "receiver_id": "RCV987"
                },
                {
                    "payer_id": "payer-old",
                    "name": "Legacy Mutual",
                    "submitter_id": "SUB000",
                    "receiver_id": "RCV000",
                    "active": false
                }
            ],
            "billing_codes": [{
                "code": "97140",
                "description": "Manual therapy",
                "default_fee": 25000
            }],
            "denials": [
                {
                    "id": "d1",
                    "claim_id": "claim-600",
                    "reason": "CO-97",
                    "amount": 60000,
                    "denial_date": "2024-03-20",
                    "auto_correctible": true
                },
                {
                    "id": "d2",
                    "claim_id": "claim-600",
                    "reason": "CO-197",
                    "amount": 1500,
                    "denial_date": "2024-04-02"
                }
            ]
        }))
        .expect("fixture snapshot should deserialise")
    }

    fn app_with_store(store: Arc<InMemoryStore>) -> Router {
        router(AppState::new(DenialService::new(
            Arc::new(CoreConfig::default()),
            Arc::new(PatternCatalogue::standard()),
            store,
        )))
    }

    fn app() -> Router {
        app_with_store(Arc::new(InMemoryStore::from_snapshot(snapshot())))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = app.oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        (status, bytes.to_vec())
    }

    fn as_json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("response should be JSON")
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["ok"], true);
    }

    #[tokio::test]
    async fn test_list_patterns_returns_catalogue() {
        let (status, body) = send(app(), "GET", "/patterns", None).await;
        assert_eq!(status, StatusCode::OK);
        let patterns = as_json(&body);
        let patterns = patterns.as_array().expect("array of patterns");
        assert_eq!(patterns.len(), PatternCatalogue::standard().len());
        assert_eq!(patterns[0]["denial_code"], "CO-97");
    }

    #[tokio::test]
    async fn test_analyse_denial() {
        let (status, body) = send(
            app(),
            "POST",
            "/claims/claim-600/denial-analysis",
            Some(json!({ "denial_reasons": ["CO-97: procedure bundled"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let analysis = as_json(&body);
        assert_eq!(analysis["claim_id"], "claim-600");
        assert_eq!(analysis["appeal_probability"], 95.0);
        assert_eq!(analysis["corrections"][0]["corrected_value"], "59");
        assert_eq!(analysis["recommended_actions"][0]["action"], "correct_and_resubmit");
        assert_eq!(analysis["recommended_actions"][1]["action"], "appeal");
    }

    #[tokio::test]
    async fn test_analyse_unknown_claim_is_404() {
        let (status, _) = send(
            app(),
            "POST",
            "/claims/ghost/denial-analysis",
            Some(json!({ "denial_reasons": ["CO-97"] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_apply_corrections_updates_store() {
        let store = Arc::new(InMemoryStore::from_snapshot(snapshot()));
        let app = app_with_store(store.clone());

        let (status, body) = send(
            app,
            "POST",
            "/claims/claim-600/corrections",
            Some(json!({
                "corrections": [{
                    "kind": "modifier_add",
                    "original_value": "",
                    "corrected_value": "59",
                    "confidence": 85.0,
                    "reason": "CO-97: Procedure bundled with another service"
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["applied"], 1);

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.claims[0].line_items[0].modifiers, vec!["59".to_string()]);
        assert_eq!(snapshot.audit_log.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_blank_correction_is_400() {
        let store = Arc::new(InMemoryStore::from_snapshot(snapshot()));
        let (status, _) = send(
            app_with_store(store.clone()),
            "POST",
            "/claims/claim-600/corrections",
            Some(json!({
                "corrections": [{
                    "kind": "modifier_add",
                    "original_value": "",
                    "corrected_value": "",
                    "confidence": 85.0,
                    "reason": "CO-97: Procedure bundled with another service"
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.claims[0].line_items[0].modifiers.is_empty());
        assert!(snapshot.audit_log.is_empty());
    }

    #[tokio::test]
    async fn test_validate_claim_and_batch() {
        let (status, body) = send(app(), "POST", "/claims/claim-600/validation", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["valid"], true);

        let (status, body) = send(
            app(),
            "POST",
            "/claims/validation",
            Some(json!({ "claim_ids": ["claim-600", "ghost"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = as_json(&body);
        assert_eq!(results[0]["claim_id"], "claim-600");
        assert_eq!(results[1]["claim_id"], "ghost");
        assert_eq!(results[1]["valid"], false);
    }

    #[tokio::test]
    async fn test_empty_batch_is_400() {
        let (status, _) = send(
            app(),
            "POST",
            "/claims/validation",
            Some(json!({ "claim_ids": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_render_edi() {
        let (status, body) = send(app(), "GET", "/claims/claim-600/edi/payer-1", None).await;
        assert_eq!(status, StatusCode::OK);
        let edi = String::from_utf8(body).expect("EDI should be UTF-8");
        assert!(edi.starts_with("ISA*"));
        assert!(edi.contains("CLM*claim-600*600.00"));

        let (status, _) = send(app(), "GET", "/claims/claim-600/edi/payer-old", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(app(), "GET", "/claims/claim-600/edi/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_denial_analytics() {
        let (status, body) = send(
            app(),
            "GET",
            "/denials/analytics?from=2024-03-01&to=2024-04-30",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let analytics = as_json(&body);
        assert_eq!(analytics["total_denials"], 2);
        assert_eq!(analytics["total_denied_amount"], 61500);
        assert_eq!(analytics["by_month"]["2024-04"]["count"], 1);

        let (status, _) = send(
            app(),
            "GET",
            "/denials/analytics?from=2024-05-01&to=2024-04-01",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_service_from_env_values_defaults() {
        let service = service_from_env_values(|_| None).expect("defaults should load");
        assert_eq!(service.catalogue().len(), PatternCatalogue::standard().len());
        assert_eq!(service.config().max_batch_size(), 100);
    }

    #[test]
    fn test_service_from_env_values_loads_store_file() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("store.json");
        InMemoryStore::from_snapshot(snapshot())
            .save_json_file(&path)
            .expect("Failed to write store");

        let path_str = path.to_string_lossy().to_string();
        let service = service_from_env_values(move |k| {
            (k == ENV_STORE_FILE).then(|| path_str.clone())
        })
        .expect("store file should load");
        assert_eq!(service.config().max_batch_size(), 100);
    }

    #[test]
    fn test_service_from_env_values_rejects_bad_threshold() {
        let result = service_from_env_values(|k| {
            (k == "DENIALS_APPEAL_THRESHOLD").then(|| "not-a-number".to_string())
        });
        assert!(result.is_err());
    }
}
