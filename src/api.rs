//! HTTP boundary: ingest, query, save, login, health.
//!
//! Handlers translate between the wire shapes (including the `hr` and `sugar`
//! alias fields some devices still send) and the crate's canonical types, and
//! map [`RelayError`] onto status codes: validation failures are `400` with an
//! error payload, storage failures `500`. An unknown device is not an error;
//! querying it returns `200` with an empty object.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tower_http::trace::TraceLayer;

use crate::config::AuthConfig;
use crate::error::RelayError;
use crate::ledger::RecordLedger;
use crate::record::Demographics;
use crate::snapshot::{DeviceSnapshot, Reading, SnapshotPatch};
use crate::store::DeviceStateStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DeviceStateStore>,
    pub ledger: Arc<RecordLedger>,
    pub auth: Arc<AuthConfig>,
}

/// Build the relay's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sensor-data", post(ingest))
        .route("/latest/:device_id", get(latest))
        .route("/submit", post(submit))
        .route("/login", post(login))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, Json<Value>);

fn error_response(err: RelayError) -> ApiError {
    let status = match err {
        RelayError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.public_message() })))
}

fn bad_payload(err: serde_json::Error) -> ApiError {
    error_response(RelayError::Validation(format!("invalid payload: {err}")))
}

/// Wire shape of an ingestion, aliases included.
#[derive(Debug, Default, Deserialize)]
struct IngestRequest {
    #[serde(default)]
    device_id: String,
    timestamp: Option<String>,
    seq: Option<u64>,
    #[serde(rename = "heartRate")]
    heart_rate: Option<Reading>,
    hr: Option<Reading>,
    spo2: Option<Reading>,
    temperature: Option<Reading>,
    ecg: Option<Reading>,
    glucose: Option<Reading>,
    sugar: Option<Reading>,
    bp_sys: Option<Reading>,
    bp_dia: Option<Reading>,
    bp: Option<Reading>,
    gsr: Option<Reading>,
    spiro: Option<Reading>,
}

impl IngestRequest {
    /// Normalize to canonical field names. The canonical name wins when a
    /// payload carries both it and its alias.
    fn into_patch(self) -> SnapshotPatch {
        SnapshotPatch {
            device_id: self.device_id,
            timestamp: self.timestamp,
            seq: self.seq,
            heart_rate: self.heart_rate.or(self.hr),
            spo2: self.spo2,
            temperature: self.temperature,
            ecg: self.ecg,
            glucose: self.glucose.or(self.sugar),
            bp_sys: self.bp_sys,
            bp_dia: self.bp_dia,
            bp: self.bp,
            gsr: self.gsr,
            spiro: self.spiro,
        }
    }
}

/// `POST /sensor-data`: merge one telemetry update into the device cache.
async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request: IngestRequest = serde_json::from_value(body).map_err(bad_payload)?;
    let patch = request.into_patch();
    state.store.upsert(&patch).map_err(error_response)?;
    tracing::debug!(device_id = %patch.device_id, "telemetry accepted");
    Ok(Json(json!({ "message": "Sensor data received" })))
}

/// `GET /latest/{device_id}`: the current snapshot, `{}` for unknown devices.
async fn latest(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<DeviceSnapshot> {
    Json(state.store.get(&device_id).unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    name: String,
    // Forms send age as a string, devices under test as a number; accept both.
    age: Option<Reading>,
    #[serde(default)]
    gender: String,
    #[serde(default)]
    device_id: String,
}

/// `POST /submit`: durably record one clinical encounter.
async fn submit(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request: SubmitRequest = serde_json::from_value(body).map_err(bad_payload)?;
    let demographics = Demographics {
        name: request.name,
        age: request.age.map(|a| a.to_string()).unwrap_or_default(),
        gender: request.gender,
    };

    let patient_number = state
        .ledger
        .save(demographics, request.device_id, &state.store)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "message": "Patient saved",
        "patientNumber": patient_number
    })))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// `POST /login`: check credentials against configuration. Unconfigured
/// credentials reject every attempt.
async fn login(State(state): State<AppState>, Json(body): Json<Value>) -> ApiError {
    let request: LoginRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => return bad_payload(err),
    };

    let ok = state.auth.enabled()
        && digest_eq(&request.username, &state.auth.username)
        && digest_eq(&request.password, &state.auth.password);
    if ok {
        (StatusCode::OK, Json(json!({ "message": "OK" })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })))
    }
}

/// Digest comparison keeps the check constant-time with respect to the
/// configured secret.
fn digest_eq(supplied: &str, expected: &str) -> bool {
    Sha256::digest(supplied.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// `GET /healthz`: liveness plus the number of devices seen.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "devices": state.store.device_count()
    }))
}
