use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use include_dir::{include_dir, Dir};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    credentials,
    gemini::ListingGenerator,
    models::{Condition, CredentialRequest, ItemPhoto, OptionsResponse, Platform, SelectionRequest, UnknownCondition, UploadError},
    presenter::Presentation,
    prompt::build_prompt,
    session::{SessionStore, SessionView, Status},
};

static STATIC_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/static");

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub generator: Arc<dyn ListingGenerator>,
    pub stored_key: Option<Arc<str>>,
}

impl AppState {
    fn stored_key(&self) -> Option<&str> {
        self.stored_key.as_deref()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session not found")]
    SessionNotFound,
    #[error("upload an item photo first")]
    MissingPhoto,
    #[error("a listing is already being generated for this session")]
    GenerationPending,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Condition(#[from] UnknownCondition),
    #[error("bad form data: {0}")]
    Form(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::SessionNotFound => StatusCode::NOT_FOUND,
            ApiError::GenerationPending => StatusCode::CONFLICT,
            ApiError::MissingPhoto | ApiError::Upload(_) | ApiError::Condition(_) | ApiError::Form(_) => {
                StatusCode::BAD_REQUEST
            }
        };
        warn!("⚠️ Request rejected ({}): {}", status, self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/options", get(options))
        .route("/api/generate", post(generate_once))
        .route("/api/session", post(create_session))
        .route("/api/session/:id", get(get_session).delete(end_session))
        .route("/api/session/:id/image", post(upload_image))
        .route("/api/session/:id/selection", put(update_selection))
        .route("/api/session/:id/credential", put(set_credential))
        .route("/api/session/:id/credential/override", post(request_override))
        .route("/api/session/:id/generate", post(generate))
        .layer(DefaultBodyLimit::disable())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn index() -> Response {
    match STATIC_DIR.get_file("index.html").and_then(|f| f.contents_utf8()) {
        Some(page) => Html(page).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn options() -> Json<OptionsResponse> {
    Json(OptionsResponse::default())
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let session = state.sessions.create();
    info!("🆕 Session {} started ({} active)", session.id, state.sessions.len());
    (StatusCode::CREATED, Json(session.view(state.stored_key())))
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    let session = state.sessions.get(&id).ok_or(ApiError::SessionNotFound)?;
    Ok(Json(session.view(state.stored_key())))
}

pub async fn end_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    if state.sessions.end(&id) {
        info!("👋 Session {} ended", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound)
    }
}

/// Form fields from a multipart upload: the `image` part plus any text fields.
struct UploadForm {
    photo: Option<ItemPhoto>,
    fields: HashMap<String, String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm { photo: None, fields: HashMap::new() };
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::Form(e.body_text()))? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await.map_err(|e| ApiError::Form(e.body_text()))?;
            form.photo = Some(ItemPhoto::from_upload(&file_name, bytes)?);
        } else {
            let value = field.text().await.map_err(|e| ApiError::Form(e.body_text()))?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

pub async fn upload_image(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SessionView>, ApiError> {
    if state.sessions.get(&id).is_none() {
        return Err(ApiError::SessionNotFound);
    }
    let photo = read_upload_form(multipart).await?.photo.ok_or(ApiError::MissingPhoto)?;
    info!("📷 Session {} uploaded '{}' ({}x{})", id, photo.file_name, photo.width, photo.height);

    let stored = state.stored_key();
    state
        .sessions
        .update(&id, |s| {
            s.upload(photo);
            s.view(stored)
        })
        .map(Json)
        .ok_or(ApiError::SessionNotFound)
}

pub async fn update_selection(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SelectionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let stored = state.stored_key();
    state
        .sessions
        .update(&id, |s| {
            s.select(body.condition, body.platform);
            s.view(stored)
        })
        .map(Json)
        .ok_or(ApiError::SessionNotFound)
}

pub async fn request_override(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    let stored = state.stored_key();
    state
        .sessions
        .update(&id, |s| {
            s.request_override();
            s.view(stored)
        })
        .map(Json)
        .ok_or(ApiError::SessionNotFound)
}

pub async fn set_credential(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<CredentialRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let stored = state.stored_key();
    state
        .sessions
        .update(&id, |s| {
            s.set_typed_key(body.api_key);
            s.view(stored)
        })
        .map(Json)
        .ok_or(ApiError::SessionNotFound)
}

pub async fn generate(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<Presentation>, ApiError> {
    let stored = state.stored_key();

    // Claim the session before the call so the lock is not held across the await.
    let claimed = state
        .sessions
        .update(&id, |s| {
            if s.status == Status::Pending {
                return Err(ApiError::GenerationPending);
            }
            let Some((credential, source)) = s.credential(stored) else {
                s.finish(Presentation::missing_credential());
                return Ok(None);
            };
            let photo = s.photo.clone().ok_or(ApiError::MissingPhoto)?;
            s.start_generation();
            Ok(Some((credential, source, photo, s.condition, s.platform.clone())))
        })
        .ok_or(ApiError::SessionNotFound)??;

    let Some((credential, source, photo, condition, platform)) = claimed else {
        info!("🔑 Session {} has no API key, skipping generation", id);
        return Ok(Json(Presentation::missing_credential()));
    };

    // Released as interrupted if this future is dropped before the call returns.
    let pending = state.sessions.guard_pending(id);

    info!("🚀 Session {} generating listing: condition={}, platform={}, key={:?} ({:?})", id, condition, platform, credential, source);
    let prompt = build_prompt(condition, &platform);
    let outcome = state.generator.generate(&credential, &prompt, &photo).await;
    let presentation = Presentation::from_outcome(outcome, &photo);

    if !pending.complete(presentation.clone()) {
        warn!("⚠️ Session {} ended while its listing was generating", id);
    }
    Ok(Json(presentation))
}

/// Stateless variant: image, condition, platform and an optional key in one form.
pub async fn generate_once(State(state): State<AppState>, multipart: Multipart) -> Result<Json<Presentation>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let condition = match form.fields.get("condition") {
        Some(label) => label.parse::<Condition>()?,
        None => Condition::default(),
    };
    let platform = form
        .fields
        .get("platform")
        .map(|label| Platform::from_label(label))
        .unwrap_or_default();
    let typed = form.fields.get("api_key").map(String::as_str).filter(|k| !k.trim().is_empty());

    let Some((credential, _)) = credentials::resolve(state.stored_key(), typed.is_some(), typed) else {
        info!("🔑 One-shot request without an API key, skipping generation");
        return Ok(Json(Presentation::missing_credential()));
    };
    let photo = form.photo.ok_or(ApiError::MissingPhoto)?;

    info!("🚀 One-shot listing for '{}': condition={}, platform={}", photo.file_name, condition, platform);
    let prompt = build_prompt(condition, &platform);
    let outcome = state.generator.generate(&credential, &prompt, &photo).await;
    Ok(Json(Presentation::from_outcome(outcome, &photo)))
}
