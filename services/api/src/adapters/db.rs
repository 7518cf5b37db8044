//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StoryRepository` and `UserRepository` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use story_weaver_core::domain::{illustration_path, NewStory, Story, User, UserCredentials};
use story_weaver_core::ports::{PortError, PortResult, StoryRepository, UserRepository};
use uuid::Uuid;

/// Postgres error code for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

const STORY_COLUMNS: &str = "id, title, content, theme, characters, age_group, author_id, \
                             is_favorite, image_url, audio_url, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports on Postgres.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn story_not_found(story_id: Uuid) -> PortError {
    PortError::NotFound(format!("Story {} not found", story_id))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct StoryRecord {
    id: Uuid,
    title: String,
    content: String,
    theme: String,
    characters: Vec<String>,
    age_group: String,
    author_id: Uuid,
    is_favorite: bool,
    image_url: Option<String>,
    audio_url: Option<String>,
    created_at: DateTime<Utc>,
}
impl StoryRecord {
    fn to_domain(self) -> Story {
        Story {
            id: self.id,
            title: self.title,
            content: self.content,
            theme: self.theme,
            characters: self.characters,
            age_group: self.age_group,
            author_id: self.author_id,
            is_favorite: self.is_favorite,
            image_url: self.image_url,
            audio_url: self.audio_url,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `StoryRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryRepository for DbAdapter {
    async fn create_story(&self, story: NewStory) -> PortResult<Story> {
        let story_id = Uuid::new_v4();
        let created_at = Utc::now();
        let image_url = story
            .illustration
            .as_ref()
            .map(|_| illustration_path(story_id, created_at.timestamp_millis()));

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "INSERT INTO stories \
             (id, title, content, theme, characters, age_group, author_id, image_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            STORY_COLUMNS
        );
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(story_id)
            .bind(&story.title)
            .bind(&story.content)
            .bind(&story.theme)
            .bind(&story.characters)
            .bind(story.age_group.as_str())
            .bind(story.author_id)
            .bind(&image_url)
            .bind(created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        if let Some(image) = &story.illustration {
            sqlx::query("INSERT INTO story_images (story_id, image) VALUES ($1, $2)")
                .bind(story_id)
                .bind(image)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_stories_by_author(&self, author_id: Uuid) -> PortResult<Vec<Story>> {
        let sql = format!(
            "SELECT {} FROM stories WHERE author_id = $1 ORDER BY created_at DESC",
            STORY_COLUMNS
        );
        let records = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let stories = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(stories)
    }

    async fn get_story_by_id(&self, story_id: Uuid) -> PortResult<Story> {
        let sql = format!("SELECT {} FROM stories WHERE id = $1", STORY_COLUMNS);
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(story_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => story_not_found(story_id),
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn toggle_favorite(&self, story_id: Uuid) -> PortResult<Story> {
        let sql = format!(
            "UPDATE stories SET is_favorite = NOT is_favorite WHERE id = $1 RETURNING {}",
            STORY_COLUMNS
        );
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| story_not_found(story_id))?;
        Ok(record.to_domain())
    }

    async fn update_illustration(
        &self,
        story_id: Uuid,
        image_url: &str,
        image: &[u8],
    ) -> PortResult<Story> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "UPDATE stories SET image_url = $1 WHERE id = $2 RETURNING {}",
            STORY_COLUMNS
        );
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(image_url)
            .bind(story_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| story_not_found(story_id))?;

        sqlx::query(
            "INSERT INTO story_images (story_id, image) VALUES ($1, $2) \
             ON CONFLICT (story_id) DO UPDATE SET image = EXCLUDED.image, created_at = NOW()",
        )
        .bind(story_id)
        .bind(image)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_story_illustration(&self, story_id: Uuid) -> PortResult<Vec<u8>> {
        let image: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT image FROM story_images WHERE story_id = $1")
                .bind(story_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        image.ok_or_else(|| PortError::NotFound(format!("No illustration for story {}", story_id)))
    }

    async fn update_audio(
        &self,
        story_id: Uuid,
        audio_url: &str,
        audio: &[u8],
    ) -> PortResult<Story> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "UPDATE stories SET audio_url = $1 WHERE id = $2 RETURNING {}",
            STORY_COLUMNS
        );
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(audio_url)
            .bind(story_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| story_not_found(story_id))?;

        sqlx::query(
            "INSERT INTO story_audio (story_id, audio) VALUES ($1, $2) \
             ON CONFLICT (story_id) DO UPDATE SET audio = EXCLUDED.audio, created_at = NOW()",
        )
        .bind(story_id)
        .bind(audio)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_story_audio(&self, story_id: Uuid) -> PortResult<Vec<u8>> {
        let audio: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT audio FROM story_audio WHERE story_id = $1")
                .bind(story_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        audio.ok_or_else(|| PortError::NotFound(format!("No narration for story {}", story_id)))
    }

    async fn delete_story(&self, story_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(story_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(story_not_found(story_id));
        }
        Ok(())
    }
}

//=========================================================================================
// `UserRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRepository for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if duplicate {
                PortError::Conflict(format!("User {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;
        Ok(User {
            user_id: record.user_id,
            email: record.email,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_credentials())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
