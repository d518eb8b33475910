use crate::core::SessionEvent;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bookrec_core::catalog::OptionCatalog;
use bookrec_core::history::Recommendation;
use bookrec_core::orchestrator::{Orchestrator, SubmitError};
use bookrec_core::selection::{Field, Selection};
use bookrec_core::state::StateManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

#[derive(Clone)]
pub struct HttpState {
    pub state_manager: Arc<StateManager>,
    pub catalog: Arc<OptionCatalog>,
    pub orchestrator: Orchestrator,
    pub event_tx: mpsc::Sender<SessionEvent>,
}

#[derive(Serialize)]
struct ApiState {
    selection: Selection,
    loading: bool,
    history_len: usize,
    available_moods: Vec<String>,
}

#[derive(Serialize)]
struct ApiCatalog {
    genres: Vec<String>,
    moods: BTreeMap<String, Vec<String>>,
    levels: Vec<String>,
}

#[derive(Serialize)]
struct ApiHistoryEntry {
    label: String,
    #[serde(flatten)]
    entry: Recommendation,
}

#[derive(Deserialize)]
struct SelectBody {
    value: Option<String>,
}

#[derive(Serialize)]
struct SubmitOk {
    text: String,
}

#[derive(Serialize)]
struct ApiError {
    kind: String,
    message: String,
}

fn error_response(status: StatusCode, kind: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            kind: kind.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/catalog", get(get_catalog))
        .route("/api/history", get(get_history))
        .route("/api/select/:field", post(select))
        .route("/api/submit", post(submit))
        .with_state(state)
}

pub fn start_server(bind_address: String, port: u16, state: HttpState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(state);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_state(State(state): State<HttpState>) -> Json<ApiState> {
    let session = state.state_manager.snapshot().await;
    let selection = session.selection().clone();
    let available_moods = state.catalog.available_moods(&selection.genre).to_vec();
    Json(ApiState {
        loading: session.loading(),
        history_len: session.history().len(),
        selection,
        available_moods,
    })
}

async fn get_catalog(State(state): State<HttpState>) -> Json<ApiCatalog> {
    let catalog = &state.catalog;
    Json(ApiCatalog {
        genres: catalog.genres().to_vec(),
        moods: catalog
            .genres()
            .iter()
            .map(|g| (g.clone(), catalog.available_moods(g).to_vec()))
            .collect(),
        levels: catalog.levels().to_vec(),
    })
}

async fn get_history(State(state): State<HttpState>) -> Json<Vec<ApiHistoryEntry>> {
    let session = state.state_manager.snapshot().await;
    let history = session.history();
    Json(
        history
            .iter()
            .enumerate()
            .map(|(i, e)| ApiHistoryEntry {
                label: history.label(i),
                entry: e.clone(),
            })
            .collect(),
    )
}

async fn select(
    State(state): State<HttpState>,
    Path(field): Path<String>,
    Json(body): Json<SelectBody>,
) -> Response {
    let field: Field = match field.parse() {
        Ok(f) => f,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "unknown_field", format!("{}", e)),
    };
    let value = body.value;

    info!("HTTP API: select {} = {:?}", field, value);
    let (reply, applied) = oneshot::channel();
    let event = SessionEvent::SelectAndReply {
        field,
        value,
        reply,
    };
    if state.event_tx.send(event).await.is_err() {
        error!("Failed to forward select intent");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match applied.await {
        Ok(Ok(selection)) => Json(selection).into_response(),
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, "unknown_option", e.to_string()),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn submit(State(state): State<HttpState>) -> Response {
    info!("HTTP API: submit");
    match state.orchestrator.submit().await {
        Ok(text) => Json(SubmitOk { text }).into_response(),
        Err(e) => {
            let status = match e {
                SubmitError::Incomplete { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SubmitError::InFlight => StatusCode::CONFLICT,
                SubmitError::Transport { .. } | SubmitError::Semantic => StatusCode::BAD_GATEWAY,
            };
            error_response(status, e.kind(), e.user_message())
        }
    }
}
