//! crates/story_weaver_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// One of the fixed age buckets a story can be written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeGroup {
    ThreeToFive,
    FiveToEight,
    EightToTwelve,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [
        AgeGroup::ThreeToFive,
        AgeGroup::FiveToEight,
        AgeGroup::EightToTwelve,
    ];

    /// The bucket identifier used on the wire and in storage, e.g. `"5-8"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::ThreeToFive => "3-5",
            AgeGroup::FiveToEight => "5-8",
            AgeGroup::EightToTwelve => "8-12",
        }
    }

    /// Parses a bucket identifier. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|group| group.as_str() == value)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sole persisted entity: a generated children's story.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    /// Paragraphs are separated by a blank line.
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

/// Everything needed to persist a freshly generated story.
/// The repository assigns `id`, `created_at` and `is_favorite = false`.
/// When `illustration` is present it is stored with the story and `image_url`
/// points at it through [`illustration_path`].
#[derive(Debug, Clone)]
pub struct NewStory {
    pub title: String,
    pub content: String,
    pub theme: String,
    pub characters: Vec<String>,
    pub age_group: AgeGroup,
    pub author_id: Uuid,
    pub illustration: Option<Vec<u8>>,
}

/// Where a story's stored illustration is served. `version` changes with every new image.
pub fn illustration_path(story_id: Uuid, version: i64) -> String {
    format!("/stories/{}/image?v={}", story_id, version)
}

/// Where a story's cached narration is served. `version` changes with every new recording.
pub fn narration_path(story_id: Uuid, version: i64) -> String {
    format!("/stories/{}/audio?v={}", story_id, version)
}

/// Raw, unvalidated input for the generation workflow.
#[derive(Debug, Clone, Default)]
pub struct StoryInput {
    pub theme: String,
    pub characters: Vec<String>,
    pub age_group: String,
    pub title: Option<String>,
}

/// Input that passed validation: trimmed, non-empty, with a known age bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRequest {
    pub theme: String,
    pub characters: Vec<String>,
    pub age_group: AgeGroup,
    pub title: Option<String>,
}

impl StoryRequest {
    /// The explicit title if one was supplied, otherwise "Story about {theme}".
    pub fn resolved_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!("Story about {}", self.theme),
        }
    }
}

/// Public metadata used to share a story outside the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareInfo {
    pub share_url: String,
    pub title: String,
    pub theme: String,
    pub characters: Vec<String>,
    pub age_group: String,
    pub preview: String,
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}
