//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the story endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use story_weaver_core::domain::{ShareInfo, Story, StoryInput};
use story_weaver_core::error::StoryError;
use tracing::{debug, error};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

/// Content type of synthesized speech.
const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Content type of stored illustrations.
const IMAGE_CONTENT_TYPE: &str = "image/png";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        health_handler,
        create_story_handler,
        list_stories_handler,
        get_story_handler,
        delete_story_handler,
        toggle_favorite_handler,
        regenerate_illustration_handler,
        share_story_handler,
        narrate_story_handler,
        story_audio_handler,
        story_illustration_handler,
        speech_handler,
    ),
    components(
        schemas(
            SignupRequest, LoginRequest, AuthResponse, CreateStoryRequest, StoryResponse,
            FavoriteResponse, IllustrationResponse, ShareResponse, ShareData, SpeechRequest,
            HealthResponse
        )
    ),
    tags(
        (name = "Story Weaver API", description = "Generate, illustrate, narrate and share children's stories.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The body of a story generation request. Missing or null fields are reported
/// as validation errors.
#[derive(Deserialize, ToSchema, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateStoryRequest {
    pub theme: Option<String>,
    pub characters: Option<Vec<String>>,
    #[serde(alias = "age_group")]
    pub age_group: Option<String>,
    pub title: Option<String>,
}

impl From<CreateStoryRequest> for StoryInput {
    fn from(req: CreateStoryRequest) -> Self {
        StoryInput {
            theme: req.theme.unwrap_or_default(),
            characters: req.characters.unwrap_or_default(),
            age_group: req.age_group.unwrap_or_default(),
            title: req.title,
        }
    }
}

/// A story as returned to the client.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub theme: String,
    pub characters: Vec<String>,
    pub age_group: String,
    pub author_id: Uuid,
    pub is_favorite: bool,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            title: story.title,
            content: story.content,
            theme: story.theme,
            characters: story.characters,
            age_group: story.age_group,
            author_id: story.author_id,
            is_favorite: story.is_favorite,
            image_url: story.image_url,
            audio_url: story.audio_url,
            created_at: story.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    pub is_favorite: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IllustrationResponse {
    pub id: Uuid,
    pub image_url: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareData {
    pub title: String,
    pub theme: String,
    pub characters: Vec<String>,
    pub age_group: String,
    pub preview: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub share_url: String,
    pub share_data: ShareData,
}

impl From<ShareInfo> for ShareResponse {
    fn from(info: ShareInfo) -> Self {
        Self {
            share_url: info.share_url,
            share_data: ShareData {
                title: info.title,
                theme: info.theme,
                characters: info.characters,
                age_group: info.age_group,
                preview: info.preview,
            },
        }
    }
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct SpeechRequest {
    pub text: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Deserialize, IntoParams)]
pub struct ListStoriesQuery {
    /// Only accepted when it names the caller; any other user yields an empty list.
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize, IntoParams)]
pub struct NarrateQuery {
    /// Re-synthesize even if a cached narration exists.
    pub refresh: Option<bool>,
}

//=========================================================================================
// Error Translation
//=========================================================================================

/// Maps a workflow error onto a status code and a user-facing message.
/// Provider and storage details are logged, not returned.
pub fn story_error_response(err: StoryError) -> (StatusCode, String) {
    match err {
        StoryError::Validation(message) => (StatusCode::BAD_REQUEST, message),
        StoryError::NotFound(_) => (StatusCode::NOT_FOUND, "Story not found".to_string()),
        StoryError::Generation(_) => (
            StatusCode::BAD_GATEWAY,
            "We couldn't write your story right now. Please try again.".to_string(),
        ),
        StoryError::Illustration(_) => (
            StatusCode::BAD_GATEWAY,
            "We couldn't draw a new illustration right now. Please try again.".to_string(),
        ),
        StoryError::Speech(_) => (
            StatusCode::BAD_GATEWAY,
            "We couldn't read this story aloud right now. Please try again.".to_string(),
        ),
        StoryError::Configuration(_) | StoryError::Persistence(_) => {
            error!("Internal story error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            )
        }
    }
}

/// Unwraps a JSON body, reporting any rejection as a validation error.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, (StatusCode, String)> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        let message = format!("Invalid request body: {}", rejection.body_text());
        story_error_response(StoryError::Validation(message))
    })
}

/// Extracts a story id. A malformed id is reported as not found.
fn parse_story_id(
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Uuid, (StatusCode, String)> {
    path.map(|Path(id)| id).map_err(|rejection| {
        debug!("Rejected story id: {}", rejection.body_text());
        story_error_response(StoryError::NotFound("malformed story id".to_string()))
    })
}

fn media_response(content_type: &'static str, data: Vec<u8>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, content_type)], Bytes::from(data))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Generate a new story for the logged-in user.
#[utoipa::path(
    post,
    path = "/stories",
    request_body = CreateStoryRequest,
    responses(
        (status = 201, description = "Story generated and saved", body = StoryResponse),
        (status = 400, description = "Invalid theme, characters or age group"),
        (status = 401, description = "Not logged in"),
        (status = 502, description = "The story provider failed")
    )
)]
pub async fn create_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    payload: Result<Json<CreateStoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let req = json_body(payload)?;
    let story = state
        .workflow
        .create_story(user_id, req.into())
        .await
        .map_err(story_error_response)?;
    Ok((StatusCode::CREATED, Json(StoryResponse::from(story))))
}

/// List the caller's stories, newest first.
#[utoipa::path(
    get,
    path = "/stories",
    params(ListStoriesQuery),
    responses(
        (status = 200, description = "The caller's stories, possibly empty", body = [StoryResponse])
    )
)]
pub async fn list_stories_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Uuid>>,
    query: Result<Query<ListStoriesQuery>, QueryRejection>,
) -> Result<Json<Vec<StoryResponse>>, (StatusCode, String)> {
    // A filter that cannot be parsed cannot name the caller either.
    let Ok(Query(query)) = query else {
        return Ok(Json(Vec::new()));
    };
    if query.user_id.is_some() && query.user_id != caller {
        return Ok(Json(Vec::new()));
    }
    let stories = state
        .workflow
        .list_stories(caller)
        .await
        .map_err(story_error_response)?;
    Ok(Json(stories.into_iter().map(StoryResponse::from).collect()))
}

/// Fetch one of the caller's stories.
#[utoipa::path(
    get,
    path = "/stories/{id}",
    params(("id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "The story", body = StoryResponse),
        (status = 404, description = "Unknown story or not owned by the caller")
    )
)]
pub async fn get_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<StoryResponse>, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    let story = state
        .workflow
        .get_story(user_id, story_id)
        .await
        .map_err(story_error_response)?;
    Ok(Json(story.into()))
}

/// Delete one of the caller's stories.
#[utoipa::path(
    delete,
    path = "/stories/{id}",
    params(("id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 204, description = "Story deleted"),
        (status = 404, description = "Unknown story or not owned by the caller")
    )
)]
pub async fn delete_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    state
        .workflow
        .delete_story(user_id, story_id)
        .await
        .map_err(story_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip the favorite flag of one of the caller's stories.
#[utoipa::path(
    post,
    path = "/stories/{id}/favorite",
    params(("id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "New favorite state", body = FavoriteResponse),
        (status = 404, description = "Unknown story or not owned by the caller")
    )
)]
pub async fn toggle_favorite_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<FavoriteResponse>, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    let story = state
        .workflow
        .toggle_favorite(user_id, story_id)
        .await
        .map_err(story_error_response)?;
    Ok(Json(FavoriteResponse {
        is_favorite: story.is_favorite,
    }))
}

/// Replace the illustration of one of the caller's stories.
#[utoipa::path(
    post,
    path = "/stories/{id}/regenerate-illustration",
    params(("id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "New illustration", body = IllustrationResponse),
        (status = 404, description = "Unknown story or not owned by the caller"),
        (status = 502, description = "The image provider failed; the old illustration is kept")
    )
)]
pub async fn regenerate_illustration_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<IllustrationResponse>, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    let story = state
        .workflow
        .regenerate_illustration(user_id, story_id)
        .await
        .map_err(story_error_response)?;
    Ok(Json(IllustrationResponse {
        id: story.id,
        image_url: story.image_url,
    }))
}

/// Share metadata for one of the caller's stories.
#[utoipa::path(
    get,
    path = "/stories/{id}/share",
    params(("id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "Share link and preview", body = ShareResponse),
        (status = 404, description = "Unknown story or not owned by the caller")
    )
)]
pub async fn share_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ShareResponse>, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    let info = state
        .workflow
        .share_story(user_id, story_id, &state.config.public_base_url)
        .await
        .map_err(story_error_response)?;
    Ok(Json(info.into()))
}

/// Narrate one of the caller's stories and cache the audio on it.
#[utoipa::path(
    post,
    path = "/stories/{id}/audio",
    params(("id" = Uuid, Path, description = "Story id"), NarrateQuery),
    responses(
        (status = 200, description = "Story with its audioUrl set", body = StoryResponse),
        (status = 404, description = "Unknown story or not owned by the caller"),
        (status = 502, description = "The speech provider failed")
    )
)]
pub async fn narrate_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
    Query(query): Query<NarrateQuery>,
) -> Result<Json<StoryResponse>, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    let story = state
        .workflow
        .narrate_story(user_id, story_id, query.refresh.unwrap_or(false))
        .await
        .map_err(story_error_response)?;
    Ok(Json(story.into()))
}

/// Stream the cached narration of one of the caller's stories.
#[utoipa::path(
    get,
    path = "/stories/{id}/audio",
    params(("id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "MP3 audio (audio/mpeg)"),
        (status = 404, description = "No narration yet, or story not found")
    )
)]
pub async fn story_audio_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    let audio = state
        .workflow
        .story_audio(user_id, story_id)
        .await
        .map_err(story_error_response)?;
    Ok(media_response(AUDIO_CONTENT_TYPE, audio))
}

/// Serve the stored illustration of one of the caller's stories.
#[utoipa::path(
    get,
    path = "/stories/{id}/image",
    params(("id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "PNG image (image/png)"),
        (status = 404, description = "No illustration yet, or story not found")
    )
)]
pub async fn story_illustration_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let story_id = parse_story_id(path)?;
    let image = state
        .workflow
        .story_illustration(user_id, story_id)
        .await
        .map_err(story_error_response)?;
    Ok(media_response(IMAGE_CONTENT_TYPE, image))
}

/// Read arbitrary text aloud.
#[utoipa::path(
    post,
    path = "/speech",
    request_body = SpeechRequest,
    responses(
        (status = 200, description = "MP3 audio (audio/mpeg)"),
        (status = 400, description = "Text is required"),
        (status = 502, description = "The speech provider failed")
    )
)]
pub async fn speech_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let req = json_body(payload)?;
    let audio = state
        .workflow
        .synthesize_speech(req.text.as_deref().unwrap_or_default())
        .await
        .map_err(story_error_response)?;
    Ok(media_response(AUDIO_CONTENT_TYPE, audio))
}
