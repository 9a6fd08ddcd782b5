//! In-process MediBridge API for integration tests.
//!
//! Serves the endpoints the client uses on an ephemeral port and records
//! every request that reaches it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use medibridge_core::{ApiClient, MedibridgeConfig};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const TOKEN: &str = "tok-clinic-1";
pub const MOBILE: &str = "9000000001";
pub const PASSWORD: &str = "secret";

/// What the drug search endpoint answers with.
#[derive(Debug, Clone)]
pub enum DrugReply {
    /// Filter the catalogue by case-insensitive name substring
    Catalogue,
    /// Return this body verbatim
    Body(Value),
    /// Fail with this status and an `{"error": ...}` body
    Status(StatusCode),
}

/// Requests observed by the mock server.
#[derive(Debug)]
pub struct MockState {
    pub catalogue: Mutex<Vec<Value>>,
    pub drug_reply: Mutex<DrugReply>,
    pub defer_ai_processing: AtomicBool,
    pub drug_search_hits: AtomicUsize,
    pub prescription_hits: AtomicUsize,
    pub drug_queries: Mutex<Vec<String>>,
    pub prescriptions: Mutex<Vec<Value>>,
}

impl MockState {
    fn new(catalogue: Vec<Value>) -> Self {
        Self {
            catalogue: Mutex::new(catalogue),
            drug_reply: Mutex::new(DrugReply::Catalogue),
            defer_ai_processing: AtomicBool::new(false),
            drug_search_hits: AtomicUsize::new(0),
            prescription_hits: AtomicUsize::new(0),
            drug_queries: Mutex::new(Vec::new()),
            prescriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn drug_search_hits(&self) -> usize {
        self.drug_search_hits.load(Ordering::SeqCst)
    }

    pub fn prescription_hits(&self) -> usize {
        self.prescription_hits.load(Ordering::SeqCst)
    }

    pub fn reply_with(&self, reply: DrugReply) {
        *self.drug_reply.lock() = reply;
    }
}

/// Running mock server. Shut down when dropped.
pub struct MockApi {
    pub base_url: String,
    pub state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockApi {
    /// Starts a server holding the standard test catalogue.
    pub async fn start() -> Self {
        Self::with_catalogue(standard_catalogue()).await
    }

    pub async fn with_catalogue(catalogue: Vec<Value>) -> Self {
        let state = Arc::new(MockState::new(catalogue));
        let app = Router::new()
            .route("/v1/auth/login", post(login))
            .route("/v1/clinic/drugs", get(list_drugs))
            .route("/v1/clinic/drugs/search", get(search_drugs))
            .route("/v1/clinic/patients/search", get(search_patients))
            .route("/v1/clinic/prescriptions/new", post(create_prescription))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock API");
        let addr = listener.local_addr().expect("mock API address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock API server");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            server,
        }
    }

    pub fn config(&self) -> MedibridgeConfig {
        MedibridgeConfig::for_testing(&self.base_url)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config().api).expect("build API client")
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn drug(id: &str, name: &str, strength: &str) -> Value {
    json!({ "id": id, "name": name, "type": "allopathy", "strength": strength })
}

pub fn standard_catalogue() -> Vec<Value> {
    vec![
        drug("D001", "Paracetamol", "500 mg"),
        drug("D002", "Amoxicillin", "250 mg"),
        drug("D003", "Amoxicillin Clavulanate", "625 mg"),
        drug("D004", "Cetirizine", "10 mg"),
        drug("D005", "Paracetamol Syrup", "120 mg/5 ml"),
    ]
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    mobile: String,
    password: String,
}

async fn login(Json(body): Json<LoginBody>) -> Response {
    if body.mobile == MOBILE && body.password == PASSWORD {
        Json(json!({ "token": TOKEN, "role": "Clinic" })).into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "invalid mobile or password")
    }
}

async fn list_drugs(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "missing token");
    }
    Json(Value::Array(state.catalogue.lock().clone())).into_response()
}

async fn search_drugs(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.drug_search_hits.fetch_add(1, Ordering::SeqCst);
    let query = params.get("q").cloned().unwrap_or_default();
    state.drug_queries.lock().push(query.clone());

    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "missing token");
    }

    let reply = state.drug_reply.lock().clone();
    match reply {
        DrugReply::Catalogue => {
            let needle = query.to_lowercase();
            let matches: Vec<Value> = state
                .catalogue
                .lock()
                .iter()
                .filter(|drug| {
                    drug["name"]
                        .as_str()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect();
            Json(Value::Array(matches)).into_response()
        }
        DrugReply::Body(body) => Json(body).into_response(),
        DrugReply::Status(status) => error(status, "drug search unavailable"),
    }
}

async fn search_patients(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "missing token");
    }
    let query = params.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    let results: Vec<&str> = ["PAT001 - Asha Patel", "PAT002 - Ravi Kumar"]
        .into_iter()
        .filter(|listing| listing.to_lowercase().contains(&query))
        .collect();
    Json(json!({ "results": results })).into_response()
}

async fn create_prescription(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.prescription_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "missing token");
    }
    state.prescriptions.lock().push(body);

    if state.defer_ai_processing.load(Ordering::SeqCst) {
        (
            StatusCode::ACCEPTED,
            Json(json!({ "message": "Prescription saved, translation pending" })),
        )
            .into_response()
    } else {
        Json(json!({ "message": "Prescription created" })).into_response()
    }
}
