use actix_web::{web, App, HttpServer, HttpResponse, Result, HttpRequest, middleware};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::config::Settings;
use crate::conflicts::{detect, Appointment, ConflictGroup, Person};
use crate::display::{render_report_html, render_setup_html};
use crate::parser::{read_appointments, read_people};

// In-memory snapshot; replaced wholesale on every upload
pub struct AppState {
    pub settings: Mutex<Settings>,
    pub people: Mutex<Option<Vec<Person>>>,
    pub appointments: Mutex<Option<Vec<Appointment>>>,
    pub admin_password: String,
    pub settings_path: Option<PathBuf>, // settings changes are written here
}

impl AppState {
    pub fn new(settings: Settings, admin_password: String) -> Self {
        Self {
            settings: Mutex::new(settings),
            people: Mutex::new(None),
            appointments: Mutex::new(None),
            admin_password,
            settings_path: None,
        }
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSide {
    People,
    Appointments,
}

#[derive(Deserialize)]
pub struct SourceSelection {
    side: SourceSide,
    source: String,
}

#[derive(Serialize, Deserialize)]
pub struct ConflictsResponse {
    pub conflicts: Vec<ConflictGroup>,
    pub people: usize,
    pub appointments: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| actix_web::error::ErrorInternalServerError("State lock poisoned"))
}

fn is_admin(req: &HttpRequest, state: &AppState) -> bool {
    let password = req
        .headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    password == state.admin_password
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"}))
}

fn setup_required() -> HttpResponse {
    HttpResponse::Conflict().json(serde_json::json!({"success": false, "error": "Finish setup first"}))
}

fn bad_request(error: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({"success": false, "error": error.to_string()}))
}

/// Writes settings to the configured file, if any
fn persist(state: &AppState, settings: &Settings) -> Result<()> {
    if let Some(path) = &state.settings_path {
        settings.save(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to save settings");
            actix_web::error::ErrorInternalServerError("Failed to save settings")
        })?;
        info!(path = %path.display(), "Settings saved");
    }
    Ok(())
}

/// Runs detection over the current snapshot, if both sides have been uploaded
fn current_report(state: &AppState) -> Result<Option<ConflictsResponse>> {
    let people = lock(&state.people)?;
    let appointments = lock(&state.appointments)?;

    match (people.as_ref(), appointments.as_ref()) {
        (Some(people), Some(appointments)) => Ok(Some(ConflictsResponse {
            conflicts: detect(people, appointments),
            people: people.len(),
            appointments: appointments.len(),
        })),
        _ => Ok(None),
    }
}

// Admin login endpoint
async fn admin_login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

async fn get_settings(state: web::Data<AppState>) -> Result<HttpResponse> {
    let settings = lock(&state.settings)?;
    Ok(HttpResponse::Ok().json(&*settings))
}

// Replaces the column mapping; the current snapshot was read with the old one
async fn update_settings(
    req: HttpRequest,
    body: web::Json<Settings>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    let settings = body.into_inner();
    if let Err(e) = settings.validate() {
        return Ok(bad_request(e));
    }

    let mut current = lock(&state.settings)?;
    persist(&state, &settings)?;
    *current = settings;
    *lock(&state.people)? = None;
    *lock(&state.appointments)? = None;
    info!("Settings updated, snapshot cleared");

    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// Picks a new source for one side; that side's columns and snapshot are reset
async fn select_source(
    req: HttpRequest,
    body: web::Json<SourceSelection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    let SourceSelection { side, source } = body.into_inner();
    let mut current = lock(&state.settings)?;
    let mut updated = current.clone();
    // A refused selection still clears that side's source
    let selected = match side {
        SourceSide::People => updated.select_people_source(source),
        SourceSide::Appointments => updated.select_appointments_source(source),
    };

    persist(&state, &updated)?;
    *current = updated;
    match side {
        SourceSide::People => *lock(&state.people)? = None,
        SourceSide::Appointments => *lock(&state.appointments)? = None,
    }
    info!(?side, "Source selection changed");

    match selected {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "settings": &*current
        }))),
        Err(e) => Ok(bad_request(e)),
    }
}

async fn upload_people(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    // Settings stay locked until the parsed rows are stored
    let settings = lock(&state.settings)?;
    if !settings.is_setup_done() {
        return Ok(setup_required());
    }

    match read_people(&body[..], &settings) {
        Ok(people) => {
            let count = people.len();
            *lock(&state.people)? = Some(people);
            info!(count, "People uploaded");
            Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "count": count})))
        }
        Err(e) => Ok(bad_request(format!("Failed to process CSV: {}", e))),
    }
}

async fn upload_appointments(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    // Settings stay locked until the parsed rows are stored
    let settings = lock(&state.settings)?;
    if !settings.is_setup_done() {
        return Ok(setup_required());
    }

    match read_appointments(&body[..], &settings) {
        Ok(appointments) => {
            let count = appointments.len();
            *lock(&state.appointments)? = Some(appointments);
            info!(count, "Appointments uploaded");
            Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "count": count})))
        }
        Err(e) => Ok(bad_request(format!("Failed to process CSV: {}", e))),
    }
}

async fn get_conflicts(state: web::Data<AppState>) -> Result<HttpResponse> {
    match current_report(&state)? {
        Some(report) => Ok(HttpResponse::Ok().json(report)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "No data available"}))),
    }
}

// HTML report page, or the setup page until the column mapping is complete
async fn index(state: web::Data<AppState>) -> Result<HttpResponse> {
    let missing = lock(&state.settings)?.missing_fields();
    if !missing.is_empty() {
        return Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_setup_html(&missing)));
    }

    match current_report(&state)? {
        Some(report) => Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_report_html(&report.conflicts))),
        None => Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(
                "<!DOCTYPE html><html><body>\
                 <h2>Upload people and appointments to check for conflicts.</h2>\
                 </body></html>",
            )),
    }
}

/// Registers every route; shared by the server and the handler tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/api/login", web::post().to(admin_login))
        .route("/api/settings", web::get().to(get_settings))
        .route("/api/settings", web::post().to(update_settings))
        .route("/api/settings/source", web::post().to(select_source))
        .route("/api/upload/people", web::post().to(upload_people))
        .route("/api/upload/appointments", web::post().to(upload_appointments))
        .route("/api/conflicts", web::get().to(get_conflicts));
}

pub async fn start_server(
    port: u16,
    admin_password: String,
    settings: Settings,
    settings_path: PathBuf,
) -> std::io::Result<()> {
    let app_state =
        web::Data::new(AppState::new(settings, admin_password).with_settings_path(settings_path));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
