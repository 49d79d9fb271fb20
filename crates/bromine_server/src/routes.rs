//! Note endpoints.
//!
//! `POST /notes` is an upsert keyed by `localId`; `PUT` replaces the mutable
//! fields; `DELETE` succeeds for unknown and malformed ids.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use bromine_core::{core_version, CoverImage, Note, NoteDraft, NoteId, NotePatch};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/:id", put(update_note).delete(delete_note))
        .route("/palette", get(palette))
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state.with_notes(|service| service.list()).await?;
    Ok(Json(notes))
}

async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<NoteDraft>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(draft) = payload?;
    let note = state.with_notes(move |service| service.create(&draft)).await?;
    Ok(Json(note))
}

async fn update_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<NotePatch>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let id = parse_note_id(&raw_id)?;
    let Json(patch) = payload?;
    let note = state
        .with_notes(move |service| service.update(id, &patch))
        .await?;
    Ok(Json(note))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    // An id that does not parse names no note, which counts as already deleted.
    if let Ok(id) = NoteId::parse_str(&raw_id) {
        state.with_notes(move |service| service.delete(id)).await?;
    }
    Ok(Json(json!({ "message": "Note Deleted" })))
}

async fn palette(State(state): State<AppState>) -> Json<Vec<CoverImage>> {
    Json(state.palette().entries().to_vec())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": core_version(),
    }))
}

/// Malformed ids cannot name a stored note, so they read as unknown.
fn parse_note_id(raw: &str) -> Result<NoteId, ApiError> {
    NoteId::parse_str(raw).map_err(|_| ApiError::NotFound(format!("note not found: {raw}")))
}
