// src/main.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod directory;
mod session;
mod team_assignment;
mod workload;

mod auth_tests;

use auth::{has_any_role, AuthError, AuthService, Employee, Role, SeededCredentials};
use directory::SeededDirectory;
use session::{FileSessionStore, SessionManager, SessionStoreError};
use team_assignment::{ScheduleError, TeamAssignmentService};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not signed in")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Auth(AuthError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Auth(AuthError::Session(_)) | AppError::Session(_) => {
                error!("Session store failure: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "session storage error".to_string(),
                )
            }
            AppError::Schedule(ScheduleError::Forbidden { .. }) => {
                (StatusCode::FORBIDDEN, self.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    /// Path of the persisted session record (the one storage key).
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    /// Simulated identity-backend latency applied to credential calls.
    #[serde(default = "default_login_latency_ms")]
    pub login_latency_ms: u64,
    /// Assumed assignments-per-month capacity behind the workload bands.
    #[serde(default = "default_monthly_capacity")]
    pub monthly_capacity: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_session_file() -> PathBuf {
    PathBuf::from("staffdesk-session.json")
}
fn default_login_latency_ms() -> u64 {
    1000
}
fn default_monthly_capacity() -> u32 {
    8
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::from_env::<Config>()
    }
}

#[derive(Parser, Debug)]
#[command(name = "staffdesk-core", about = "Employee scheduling backend")]
struct Cli {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    session_file: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    auth: Arc<AuthService>,
    sessions: Arc<SessionManager>,
    schedule: Arc<TeamAssignmentService>,
}

impl AppState {
    /// The employee behind the active session, or 401.
    fn actor(&self) -> Result<Employee, AppError> {
        self.sessions.current().ok_or(AppError::Unauthorized)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {raw}")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting staffdesk server");

    let directory = Arc::new(SeededDirectory::new());
    let sessions = Arc::new(SessionManager::new(Arc::new(FileSessionStore::new(
        config.session_file.clone(),
    ))));
    if let Some(employee) = sessions.restore().context("restoring persisted session")? {
        info!("Resuming session for {}", employee.username);
    }

    let auth = Arc::new(AuthService::new(
        Arc::new(SeededCredentials::new()),
        sessions.clone(),
        Duration::from_millis(config.login_latency_ms),
    ));
    let schedule = Arc::new(TeamAssignmentService::new(
        directory,
        config.monthly_capacity,
    ));

    let state = AppState {
        auth,
        sessions,
        schedule,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/password", post(change_password))
        .route("/api/me", get(me))
        .route("/api/schedule/{date}", get(schedule_for_date))
        .route("/api/schedule/{date}/conflicts", get(conflicts_for_date))
        .route("/api/understaffed", get(understaffed))
        .route("/api/workload/{year}/{month}", get(workload_for_month))
        .route("/api/assignments", post(create_assignment))
        .route("/api/assignments/{id}", delete(remove_assignment))
        .route("/api/assignments/{id}/members", post(add_member))
        .route(
            "/api/assignments/{id}/members/{member_id}",
            delete(remove_member),
        )
        .route("/api/assignments/{id}/vehicle", put(set_vehicle))
        .route("/api/assignments/{id}/notes", put(set_notes))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Employee>, AppError> {
    let employee = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(employee))
}

async fn logout(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.auth.logout()?;
    Ok(Json(serde_json::json!({ "status": "signed out" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    username: String,
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .auth
        .change_password(
            &request.username,
            &request.current_password,
            &request.new_password,
        )
        .await?;
    Ok(Json(serde_json::json!({ "status": "password changed" })))
}

async fn me(State(state): State<AppState>) -> Result<Json<Employee>, AppError> {
    Ok(Json(state.actor()?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DaySchedule {
    date: NaiveDate,
    courses: Vec<directory::Course>,
    assignments: Vec<team_assignment::Assignment>,
    understaffed: bool,
    conflicts: Vec<workload::ScheduleConflict>,
}

async fn schedule_for_date(
    State(state): State<AppState>,
    Path(raw_date): Path<String>,
) -> Result<Json<DaySchedule>, AppError> {
    let actor = state.actor()?;
    let date = parse_date(&raw_date)?;
    let courses = state.schedule.courses_for_date(&actor, date)?;
    let assignments = state.schedule.assignments_for_date(&actor, date)?;
    let understaffed = !courses.is_empty() && assignments.is_empty();
    let conflicts = state.schedule.conflicts_for_date(&actor, date)?;
    Ok(Json(DaySchedule {
        date,
        courses,
        assignments,
        understaffed,
        conflicts,
    }))
}

async fn conflicts_for_date(
    State(state): State<AppState>,
    Path(raw_date): Path<String>,
) -> Result<Json<Vec<workload::ScheduleConflict>>, AppError> {
    let actor = state.actor()?;
    let date = parse_date(&raw_date)?;
    Ok(Json(state.schedule.conflicts_for_date(&actor, date)?))
}

async fn understaffed(
    State(state): State<AppState>,
) -> Result<Json<Vec<NaiveDate>>, AppError> {
    let actor = state.actor()?;
    Ok(Json(state.schedule.understaffed_dates(&actor)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkloadResponse {
    year: i32,
    month: u32,
    monthly_capacity: u32,
    members: Vec<workload::MemberWorkload>,
}

async fn workload_for_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<WorkloadResponse>, AppError> {
    let actor = state.actor()?;
    // The workload overview is a management view.
    if !has_any_role(actor.role, &[Role::Manager, Role::Admin]) {
        return Err(ScheduleError::Forbidden {
            required: Role::Manager,
        }
        .into());
    }
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(format!("invalid month: {month}")));
    }
    let members = state.schedule.workload_report(&actor, year, month)?;
    Ok(Json(WorkloadResponse {
        year,
        month,
        monthly_capacity: state.schedule.monthly_capacity(),
        members,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssignmentRequest {
    course_id: String,
    date: NaiveDate,
}

async fn create_assignment(
    State(state): State<AppState>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = state.actor()?;
    let id = state
        .schedule
        .create_assignment(&actor, &request.course_id, request.date)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn remove_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = state.actor()?;
    let changed = state.schedule.remove_assignment(&actor, &id)?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddMemberRequest {
    member_id: String,
}

async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = state.actor()?;
    let changed = state
        .schedule
        .assign_member(&actor, &id, &request.member_id)?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}

async fn remove_member(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = state.actor()?;
    let changed = state.schedule.remove_member(&actor, &id, &member_id)?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetVehicleRequest {
    vehicle_id: Option<String>,
}

async fn set_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetVehicleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = state.actor()?;
    let changed =
        state
            .schedule
            .assign_vehicle(&actor, &id, request.vehicle_id.as_deref())?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}

#[derive(Debug, Deserialize)]
struct SetNotesRequest {
    notes: String,
}

async fn set_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetNotesRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = state.actor()?;
    let changed = state.schedule.set_notes(&actor, &id, &request.notes)?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}
