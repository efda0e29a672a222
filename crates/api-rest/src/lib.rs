//! # API REST
//!
//! REST API implementation for NeuroCast.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status mapping)
//!
//! Uses `api-shared` for the transport payload types. All pipeline work is
//! delegated to `ncast-core`; handlers only convert between wire payloads and
//! core types and map core errors onto HTTP statuses.

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    ErrorRes, HealthRes, HealthService, LedgerEntryRes, RunCaseReq, RunCaseRes, VerifyVtpReq,
    VerifyVtpRes,
};
use ncast_core::{
    CaseError, CaseInput, CommitOutcome, HexDigest, PipelineService, VerifiedTransferPacket,
};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineService>,
}

/// Builds the application state from the process environment.
///
/// This is the binary edge: environment variables are read here, once, and
/// never inside the core.
///
/// # Environment Variables
/// - `NCAST_ENVIRONMENT`: environment label stamped into packets (default: "demo")
/// - `NCAST_SIGNING_KEY_FILE`: PKCS#8 PEM signing key; ephemeral keypair when unset
/// - `NCAST_LEDGER_FILE`: JSONL commit ledger path; in-memory ledger when unset
///
/// # Errors
/// Fails when the signing key or ledger file cannot be loaded, or the
/// configuration is invalid.
pub fn state_from_env() -> anyhow::Result<AppState> {
    use ncast_core::{
        constants, CoreConfig, FileLedger, InMemoryLedger, LedgerStore, LocalRiskGate,
        SignerContext,
    };

    let environment = std::env::var("NCAST_ENVIRONMENT").unwrap_or_else(|_| "demo".into());
    let signing_key_pem = match std::env::var("NCAST_SIGNING_KEY_FILE") {
        Ok(path) => Some(
            std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("failed to read signing key file {path}: {e}"))?,
        ),
        Err(_) => None,
    };

    let cfg = CoreConfig::new(
        environment,
        true,
        signing_key_pem,
        constants::GATE_WARN_AT,
        constants::GATE_BLOCK_AT,
    )?;

    // The signer is constructed exactly once, here, and shared; an ephemeral
    // key means signatures only verify within this process.
    let signer = match cfg.signing_key_pem() {
        Some(pem) => SignerContext::from_pkcs8_pem(pem)?,
        None => SignerContext::generate(),
    };

    let store: Arc<dyn LedgerStore> = match std::env::var("NCAST_LEDGER_FILE") {
        Ok(path) => Arc::new(FileLedger::open(std::path::Path::new(&path))?),
        Err(_) => Arc::new(InMemoryLedger::new()),
    };

    let gate = LocalRiskGate::new(cfg.gate_warn_at(), cfg.gate_block_at())?;
    let pipeline = PipelineService::new(&cfg, Some(Arc::new(signer)), Arc::new(gate), store);

    Ok(AppState {
        pipeline: Arc::new(pipeline),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(health, run_case, verify_vtp, get_ledger_entry),
    components(schemas(
        HealthRes,
        RunCaseReq,
        RunCaseRes,
        VerifyVtpReq,
        VerifyVtpRes,
        LedgerEntryRes,
        ErrorRes,
    ))
)]
struct ApiDoc;

/// Builds the REST router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cases/run", post(run_case))
        .route("/vtp/verify", post(verify_vtp))
        .route("/ledger/:hash", get(get_ledger_entry))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorRes>);

fn error_res(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

fn map_case_error(err: CaseError) -> ApiError {
    match &err {
        CaseError::InvalidInput(_) | CaseError::Deserialization(_) | CaseError::Id(_) => {
            error_res(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        _ => {
            tracing::error!("pipeline error: {err:?}");
            error_res(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
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
/// Health check endpoint for the REST API.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/cases/run",
    request_body = RunCaseReq,
    responses(
        (status = 200, description = "Pipeline run completed", body = RunCaseRes),
        (status = 409, description = "Security gate vetoed the commit", body = RunCaseRes),
        (status = 422, description = "Invalid case input", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Runs the coordination pipeline over one case.
///
/// With `commit: true` the run ends with a gated ledger commit; a gate BLOCK
/// is surfaced as `409 Conflict` with `rejected_reason` set and nothing
/// written to the ledger.
///
/// # Errors
/// Returns `422 Unprocessable Entity` when the case payload is malformed or
/// fails intake validation, `500` for internal faults.
#[axum::debug_handler]
async fn run_case(
    State(state): State<AppState>,
    Json(req): Json<RunCaseReq>,
) -> Result<(StatusCode, Json<RunCaseRes>), ApiError> {
    let case: CaseInput = serde_json::from_value(req.case)
        .map_err(|e| error_res(StatusCode::UNPROCESSABLE_ENTITY, format!("invalid case: {e}")))?;

    let run = if req.commit {
        state.pipeline.run(&case)
    } else {
        state.pipeline.run_without_commit(&case)
    }
    .map_err(map_case_error)?;

    // A built packet always carries its integrity block.
    let hash = run
        .vtp
        .integrity
        .as_ref()
        .map(|i| i.hash.to_string())
        .unwrap_or_default();

    let (status, committed, transaction_id, commit_warning, rejected_reason) = match &run.commit {
        Some(CommitOutcome::Committed(record)) | Some(CommitOutcome::AlreadyCommitted(record)) => (
            StatusCode::OK,
            true,
            Some(record.transaction_id.to_string()),
            record.warning.clone(),
            None,
        ),
        Some(CommitOutcome::Rejected { reason, .. }) => {
            (StatusCode::CONFLICT, false, None, None, Some(reason.clone()))
        }
        None => (StatusCode::OK, false, None, None, None),
    };

    let vtp = serde_json::to_value(&run.vtp).map_err(|e| {
        tracing::error!("failed to serialize packet: {e}");
        error_res(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?;

    Ok((
        status,
        Json(RunCaseRes {
            run_id: run.run_id.to_string(),
            workflow_state: run.decision.state.to_string(),
            reason: run.decision.reason.clone(),
            hash,
            committed,
            transaction_id,
            commit_warning,
            rejected_reason,
            vtp,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/vtp/verify",
    request_body = VerifyVtpReq,
    responses(
        (status = 200, description = "Verification verdict", body = VerifyVtpRes),
        (status = 422, description = "Malformed packet", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Verifies a previously built packet.
///
/// Recomputes the content hash over the integrity-stripped body and checks
/// the stored signature against this process's signing key. An integrity
/// mismatch is a `200` with `false` fields, never an error status.
#[axum::debug_handler]
async fn verify_vtp(
    State(state): State<AppState>,
    Json(req): Json<VerifyVtpReq>,
) -> Result<Json<VerifyVtpRes>, ApiError> {
    let vtp: VerifiedTransferPacket = serde_json::from_value(req.vtp).map_err(|e| {
        error_res(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("invalid packet: {e}"),
        )
    })?;

    let verification = state.pipeline.verify(&vtp).map_err(map_case_error)?;
    Ok(Json(VerifyVtpRes {
        hash_valid: verification.hash_valid,
        signature_valid: verification.signature_valid,
    }))
}

#[utoipa::path(
    get,
    path = "/ledger/{hash}",
    params(
        ("hash" = String, Path, description = "Packet content hash (0x-prefixed or bare hex)")
    ),
    responses(
        (status = 200, description = "Ledger entry", body = LedgerEntryRes),
        (status = 404, description = "Hash not committed", body = ErrorRes),
        (status = 422, description = "Malformed hash", body = ErrorRes)
    )
)]
/// Looks up a committed packet hash in the ledger.
#[axum::debug_handler]
async fn get_ledger_entry(
    State(state): State<AppState>,
    AxumPath(hash): AxumPath<String>,
) -> Result<Json<LedgerEntryRes>, ApiError> {
    let hash = HexDigest::parse(&hash)
        .map_err(|e| error_res(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let record = state
        .pipeline
        .ledger()
        .get_commit(&hash)
        .map_err(map_case_error)?
        .ok_or_else(|| error_res(StatusCode::NOT_FOUND, "hash not committed"))?;

    Ok(Json(LedgerEntryRes {
        hash: record.hash.to_string(),
        transaction_id: record.transaction_id.to_string(),
        case_id: record.metadata.case_id,
        run_id: record.metadata.run_id.to_string(),
        workflow_state: record.metadata.workflow_state.to_string(),
        committed_at: record.committed_at,
        success: record.success,
        warning: record.warning,
    }))
}
