//! crates/story_weaver_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{NewStory, Story, User, UserCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports (Traits)
//=========================================================================================

/// Persistence boundary for stories. Implementations do not check ownership;
/// the workflow does that before exposing or mutating a record.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Assigns `id` and `created_at`, stores the story with `is_favorite = false`.
    async fn create_story(&self, story: NewStory) -> PortResult<Story>;

    /// All stories of one author, newest first. An empty list is not an error.
    async fn list_stories_by_author(&self, author_id: Uuid) -> PortResult<Vec<Story>>;

    async fn get_story_by_id(&self, story_id: Uuid) -> PortResult<Story>;

    /// Flips `is_favorite` and returns the updated record.
    async fn toggle_favorite(&self, story_id: Uuid) -> PortResult<Story>;

    /// Stores a new illustration and points `image_url` at it, replacing the previous one.
    async fn update_illustration(
        &self,
        story_id: Uuid,
        image_url: &str,
        image: &[u8],
    ) -> PortResult<Story>;

    async fn get_story_illustration(&self, story_id: Uuid) -> PortResult<Vec<u8>>;

    /// Stores narration audio and points `audio_url` at it, replacing any previous audio.
    async fn update_audio(&self, story_id: Uuid, audio_url: &str, audio: &[u8])
        -> PortResult<Story>;

    async fn get_story_audio(&self, story_id: Uuid) -> PortResult<Vec<u8>>;

    /// Deleting a missing id is `NotFound`, not a no-op.
    async fn delete_story(&self, story_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live session to its user. Expired or unknown sessions are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

//=========================================================================================
// Provider Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait StoryGenerationService: Send + Sync {
    /// Writes a story for the given prompt. An empty completion is an error.
    async fn generate_story(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait IllustrationService: Send + Sync {
    /// Generates an image for the prompt and returns its encoded bytes (PNG).
    async fn generate_illustration(&self, prompt: &str) -> PortResult<Vec<u8>>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>>;
}
