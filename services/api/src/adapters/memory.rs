//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the storage ports. Used when no database is
//! configured and by the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use story_weaver_core::domain::{illustration_path, NewStory, Story, User, UserCredentials};
use story_weaver_core::ports::{PortError, PortResult, StoryRepository, UserRepository};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A story plus its insertion sequence, which breaks ties between equal timestamps.
struct StoredStory {
    seq: u64,
    story: Story,
}

#[derive(Default)]
struct MemoryState {
    stories: HashMap<Uuid, StoredStory>,
    audio: HashMap<Uuid, Vec<u8>>,
    images: HashMap<Uuid, Vec<u8>>,
    users: HashMap<String, UserCredentials>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    next_seq: u64,
}

/// Stories, users and auth sessions held behind a single async lock.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored stories across all authors.
    pub async fn story_count(&self) -> usize {
        self.state.read().await.stories.len()
    }
}

fn story_not_found(story_id: Uuid) -> PortError {
    PortError::NotFound(format!("Story {} not found", story_id))
}

impl MemoryState {
    fn story_mut(&mut self, story_id: Uuid) -> PortResult<&mut Story> {
        self.stories
            .get_mut(&story_id)
            .map(|stored| &mut stored.story)
            .ok_or_else(|| story_not_found(story_id))
    }
}

//=========================================================================================
// `StoryRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryRepository for MemoryStore {
    async fn create_story(&self, story: NewStory) -> PortResult<Story> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let image_url = story
            .illustration
            .as_ref()
            .map(|_| illustration_path(id, created_at.timestamp_millis()));
        let created = Story {
            id,
            title: story.title,
            content: story.content,
            theme: story.theme,
            characters: story.characters,
            age_group: story.age_group.as_str().to_string(),
            author_id: story.author_id,
            is_favorite: false,
            image_url,
            audio_url: None,
            created_at,
        };

        let mut state = self.state.write().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.stories.insert(
            created.id,
            StoredStory {
                seq,
                story: created.clone(),
            },
        );
        if let Some(image) = story.illustration {
            state.images.insert(created.id, image);
        }
        Ok(created)
    }

    async fn list_stories_by_author(&self, author_id: Uuid) -> PortResult<Vec<Story>> {
        let state = self.state.read().await;
        let mut owned: Vec<&StoredStory> = state
            .stories
            .values()
            .filter(|stored| stored.story.author_id == author_id)
            .collect();
        owned.sort_by(|a, b| {
            b.story
                .created_at
                .cmp(&a.story.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(owned.into_iter().map(|stored| stored.story.clone()).collect())
    }

    async fn get_story_by_id(&self, story_id: Uuid) -> PortResult<Story> {
        self.state
            .read()
            .await
            .stories
            .get(&story_id)
            .map(|stored| stored.story.clone())
            .ok_or_else(|| story_not_found(story_id))
    }

    async fn toggle_favorite(&self, story_id: Uuid) -> PortResult<Story> {
        let mut state = self.state.write().await;
        let story = state.story_mut(story_id)?;
        story.is_favorite = !story.is_favorite;
        Ok(story.clone())
    }

    async fn update_illustration(
        &self,
        story_id: Uuid,
        image_url: &str,
        image: &[u8],
    ) -> PortResult<Story> {
        let mut state = self.state.write().await;
        let story = state.story_mut(story_id)?;
        story.image_url = Some(image_url.to_string());
        let updated = story.clone();
        state.images.insert(story_id, image.to_vec());
        Ok(updated)
    }

    async fn get_story_illustration(&self, story_id: Uuid) -> PortResult<Vec<u8>> {
        self.state
            .read()
            .await
            .images
            .get(&story_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No illustration for story {}", story_id)))
    }

    async fn update_audio(
        &self,
        story_id: Uuid,
        audio_url: &str,
        audio: &[u8],
    ) -> PortResult<Story> {
        let mut state = self.state.write().await;
        let story = state.story_mut(story_id)?;
        story.audio_url = Some(audio_url.to_string());
        let updated = story.clone();
        state.audio.insert(story_id, audio.to_vec());
        Ok(updated)
    }

    async fn get_story_audio(&self, story_id: Uuid) -> PortResult<Vec<u8>> {
        self.state
            .read()
            .await
            .audio
            .get(&story_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No narration for story {}", story_id)))
    }

    async fn delete_story(&self, story_id: Uuid) -> PortResult<()> {
        let mut state = self.state.write().await;
        state
            .stories
            .remove(&story_id)
            .ok_or_else(|| story_not_found(story_id))?;
        state.audio.remove(&story_id);
        state.images.remove(&story_id);
        Ok(())
    }
}

//=========================================================================================
// `UserRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut state = self.state.write().await;
        if state.users.contains_key(email) {
            return Err(PortError::Conflict(format!("User {} already exists", email)));
        }
        let credentials = UserCredentials {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        let user = User {
            user_id: credentials.user_id,
            email: credentials.email.clone(),
        };
        state.users.insert(email.to_string(), credentials);
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.state
            .read()
            .await
            .users
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.state
            .write()
            .await
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.state.read().await.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state.write().await.sessions.remove(session_id);
        Ok(())
    }
}
