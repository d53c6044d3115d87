//! Superfície HTTP do serviço

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use care_store::models::{Appointment, CareRequest};
use care_store::DataStore;
use chrono::Utc;
use serde_json::json;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::classifier::local_reference;
use crate::config::DashboardConfig;
use crate::error::IntakeError;
use crate::intake::{self, CareRequestForm, RegisterForm, Registration};
use crate::lifecycle::{AcceptOutcome, RequestLifecycle};
use crate::sessions::{DashboardSessions, DashboardView};

/// Estado compartilhado pelos handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub sessions: Arc<DashboardSessions>,
    pub config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, config: DashboardConfig) -> Self {
        let lifecycle = Arc::new(RequestLifecycle::new(store.clone(), config.intake.clone()));
        let sessions = Arc::new(DashboardSessions::new(
            store.clone(),
            lifecycle,
            config.clone(),
        ));
        Self {
            store,
            sessions,
            config: Arc::new(config),
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = match &self {
            IntakeError::DuplicatePatient { .. }
            | IntakeError::InvalidStateTransition(_)
            | IntakeError::OperationInProgress(_) => StatusCode::CONFLICT,
            IntakeError::NotFound(_) => StatusCode::NOT_FOUND,
            IntakeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IntakeError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        if self.is_notice() {
            warn!("{}", self);
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            error!("{}", self);
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Monta o roteador com as camadas de rastreamento, CORS, compressão e limite
pub fn router(state: AppState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/requests", post(submit_request))
        .route("/psychologists/:id/requests", get(pending_requests))
        .route(
            "/psychologists/:id/requests/:request_id/accept",
            post(accept_request),
        )
        .route(
            "/psychologists/:id/requests/:request_id/reject",
            post(reject_request),
        )
        .route(
            "/psychologists/:id/dashboard",
            post(open_dashboard)
                .get(dashboard_view)
                .delete(close_dashboard),
        )
        .route("/psychologists/:id/dashboard/focus", post(focus_dashboard))
        .route("/appointments/:id/advance", post(advance_appointment))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(ConcurrencyLimitLayer::new(max_concurrent_requests)),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": crate::built_info::PKG_VERSION }))
}

async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<Registration>), IntakeError> {
    let today = local_reference(Utc::now(), state.config.timezone).date();
    let registration =
        intake::register(state.store.as_ref(), &state.config.intake, form, today).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn submit_request(
    State(state): State<AppState>,
    Json(form): Json<CareRequestForm>,
) -> Result<(StatusCode, Json<CareRequest>), IntakeError> {
    let request = intake::submit_request(state.store.as_ref(), form).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn pending_requests(
    State(state): State<AppState>,
    Path(psychologist_id): Path<Uuid>,
) -> Result<Json<Vec<CareRequest>>, IntakeError> {
    let pending = state
        .sessions
        .lifecycle()
        .pending_requests(psychologist_id)
        .await?;
    Ok(Json(pending))
}

async fn accept_request(
    State(state): State<AppState>,
    Path((psychologist_id, request_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AcceptOutcome>, IntakeError> {
    let outcome = state
        .sessions
        .accept_request(psychologist_id, request_id)
        .await?;
    Ok(Json(outcome))
}

async fn reject_request(
    State(state): State<AppState>,
    Path((psychologist_id, request_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CareRequest>, IntakeError> {
    let rejected = state
        .sessions
        .reject_request(psychologist_id, request_id)
        .await?;
    Ok(Json(rejected))
}

async fn open_dashboard(
    State(state): State<AppState>,
    Path(psychologist_id): Path<Uuid>,
) -> StatusCode {
    state.sessions.open(psychologist_id);
    StatusCode::ACCEPTED
}

async fn dashboard_view(
    State(state): State<AppState>,
    Path(psychologist_id): Path<Uuid>,
) -> Result<Response, IntakeError> {
    let response = match state.sessions.view(psychologist_id)? {
        Some(view) => Json::<DashboardView>(view).into_response(),
        // Painel aberto, primeira recarga ainda em andamento
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

async fn focus_dashboard(
    State(state): State<AppState>,
    Path(psychologist_id): Path<Uuid>,
) -> Result<StatusCode, IntakeError> {
    state.sessions.focus(psychologist_id)?;
    Ok(StatusCode::ACCEPTED)
}

async fn close_dashboard(
    State(state): State<AppState>,
    Path(psychologist_id): Path<Uuid>,
) -> StatusCode {
    if state.sessions.close(psychologist_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn advance_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, IntakeError> {
    let appointment = state.store.advance_appointment(appointment_id).await?;
    Ok(Json(appointment))
}
