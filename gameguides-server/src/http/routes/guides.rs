//! Guide endpoints
//!
//! `GET /guides/{id}` accepts an id or a slug; `PUT` and `DELETE` take ids only.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::http::error::{ApiError, Operation};
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;
use crate::models::{CreateGuide, Guide, UpdateGuide};

/// Guide response, in the camelCase shape the site reads
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub video_url: Option<String>,
    pub cover_image: String,
    pub featured: bool,
    pub published_date: String,
    pub created_at: String,
    pub updated_at: String,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<Guide> for GuideResponse {
    fn from(g: Guide) -> Self {
        Self {
            id: g.id.to_hex(),
            title: g.title,
            slug: g.slug,
            content: g.content,
            video_url: g.video_url,
            cover_image: g.cover_image,
            featured: g.featured,
            published_date: timestamp(g.published_date),
            created_at: timestamp(g.created_at),
            updated_at: timestamp(g.updated_at),
        }
    }
}

/// Delete confirmation
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /guides - list all guides, newest first
async fn list_guides(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GuideResponse>>, ApiError> {
    let guides = state
        .guides
        .list()
        .await
        .map_err(ApiError::during(Operation::List))?;

    Ok(Json(guides.into_iter().map(GuideResponse::from).collect()))
}

/// POST /guides - create a new guide
async fn create_guide(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateGuide>,
) -> Result<(StatusCode, Json<GuideResponse>), ApiError> {
    let guide = state
        .guides
        .create(req)
        .await
        .map_err(ApiError::during(Operation::Create))?;

    Ok((StatusCode::CREATED, Json(GuideResponse::from(guide))))
}

/// GET /guides/{id} - get a single guide by id or slug
async fn get_guide(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GuideResponse>, ApiError> {
    let guide = state
        .guides
        .get(&id)
        .await
        .map_err(ApiError::during(Operation::Get))?;

    Ok(Json(GuideResponse::from(guide)))
}

/// PUT /guides/{id} - partial update
async fn update_guide(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateGuide>,
) -> Result<Json<GuideResponse>, ApiError> {
    let guide = state
        .guides
        .update(&id, req)
        .await
        .map_err(ApiError::during(Operation::Update))?;

    Ok(Json(GuideResponse::from(guide)))
}

/// DELETE /guides/{id} - hard delete
async fn delete_guide(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .guides
        .delete(&id)
        .await
        .map_err(ApiError::during(Operation::Delete))?;

    Ok(Json(MessageResponse {
        message: "Guide successfully deleted",
    }))
}

/// Guide routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/guides", get(list_guides).post(create_guide))
        .route(
            "/guides/{id}",
            get(get_guide).put(update_guide).delete(delete_guide),
        )
}
