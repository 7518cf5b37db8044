//! crates/story_weaver_core/src/workflow.rs
//!
//! The story workflow: the only path that creates stories, plus the owner-scoped
//! operations on existing ones (favorite, illustration, narration, share, delete).
//!
//! Creation runs strictly in sequence: validate, synthesize the prompt, generate,
//! optionally illustrate, then persist once. A failure at any stage aborts the rest,
//! so a story is either stored complete or not at all.

use crate::domain::{illustration_path, narration_path, NewStory, ShareInfo, Story, StoryInput};
use crate::error::{StoryError, StoryResult};
use crate::ports::{
    IllustrationService, PortError, StoryGenerationService, StoryRepository,
    TextToSpeechService,
};
use crate::prompt::{illustration_prompt, story_prompt};
use crate::validation::{validate_speech_text, validate_story_input};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Longest text sent to the speech provider before truncation.
pub const MAX_SPEECH_CHARS: usize = 5000;

/// Length of the content excerpt included in share metadata.
pub const SHARE_PREVIEW_CHARS: usize = 150;

/// The stage a request is in, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Validating,
    Synthesizing,
    Generating,
    Illustrating,
    Speaking,
    Persisting,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStage::Validating => "validating",
            WorkflowStage::Synthesizing => "synthesizing",
            WorkflowStage::Generating => "generating",
            WorkflowStage::Illustrating => "illustrating",
            WorkflowStage::Speaking => "speaking",
            WorkflowStage::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Composes the validator, the prompt synthesizer, the providers and the repository.
#[derive(Clone)]
pub struct StoryWorkflow {
    stories: Arc<dyn StoryRepository>,
    generator: Arc<dyn StoryGenerationService>,
    illustrator: Arc<dyn IllustrationService>,
    narrator: Arc<dyn TextToSpeechService>,
    illustrate_on_create: bool,
}

impl StoryWorkflow {
    pub fn new(
        stories: Arc<dyn StoryRepository>,
        generator: Arc<dyn StoryGenerationService>,
        illustrator: Arc<dyn IllustrationService>,
        narrator: Arc<dyn TextToSpeechService>,
    ) -> Self {
        Self {
            stories,
            generator,
            illustrator,
            narrator,
            illustrate_on_create: false,
        }
    }

    /// Also request a first illustration while creating a story.
    /// A failed illustration never fails the creation.
    pub fn with_illustration_on_create(mut self, enabled: bool) -> Self {
        self.illustrate_on_create = enabled;
        self
    }

    /// Generates a story for `author_id` and persists it.
    pub async fn create_story(&self, author_id: Uuid, input: StoryInput) -> StoryResult<Story> {
        let request = validate_story_input(input)
            .map_err(|e| stage_failed(WorkflowStage::Validating, None, e))?;

        let prompt = story_prompt(&request.theme, &request.characters, request.age_group)
            .map_err(|e| stage_failed(WorkflowStage::Synthesizing, None, e))?;
        debug!(theme = %request.theme, age_group = %request.age_group, "Prompt synthesized");

        let content = self
            .generator
            .generate_story(&prompt)
            .await
            .map_err(|e| {
                let err = StoryError::Generation(e.to_string());
                stage_failed(WorkflowStage::Generating, None, err)
            })?;
        if content.trim().is_empty() {
            return Err(stage_failed(
                WorkflowStage::Generating,
                None,
                StoryError::Generation("no content generated".to_string()),
            ));
        }

        let title = request.resolved_title();
        let age_group = request.age_group.as_str();

        let illustration = if self.illustrate_on_create {
            let prompt = illustration_prompt(
                &title,
                &request.theme,
                &request.characters,
                age_group,
                &content,
            );
            match self.illustrator.generate_illustration(&prompt).await {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!(
                        stage = %WorkflowStage::Illustrating,
                        "Initial illustration failed, storing story without one: {}", e
                    );
                    None
                }
            }
        } else {
            None
        };

        let story = self
            .stories
            .create_story(NewStory {
                title,
                content,
                theme: request.theme,
                characters: request.characters,
                age_group: request.age_group,
                author_id,
                illustration,
            })
            .await
            .map_err(|e| {
                stage_failed(WorkflowStage::Persisting, None, StoryError::from_storage(e))
            })?;

        info!(story_id = %story.id, author_id = %author_id, "Story created");
        Ok(story)
    }

    /// Lists the caller's stories, newest first. Anonymous callers get an empty list.
    pub async fn list_stories(&self, caller: Option<Uuid>) -> StoryResult<Vec<Story>> {
        match caller {
            Some(author_id) => self
                .stories
                .list_stories_by_author(author_id)
                .await
                .map_err(StoryError::from_storage),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_story(&self, caller: Uuid, story_id: Uuid) -> StoryResult<Story> {
        self.owned_story(caller, story_id).await
    }

    /// Flips the favorite flag and returns the updated story.
    pub async fn toggle_favorite(&self, caller: Uuid, story_id: Uuid) -> StoryResult<Story> {
        self.owned_story(caller, story_id).await?;
        let story = self
            .stories
            .toggle_favorite(story_id)
            .await
            .map_err(|e| persist_failed(story_id, e))?;
        info!(story_id = %story_id, is_favorite = story.is_favorite, "Favorite toggled");
        Ok(story)
    }

    /// Replaces the story's illustration. On provider failure the old one is kept.
    pub async fn regenerate_illustration(
        &self,
        caller: Uuid,
        story_id: Uuid,
    ) -> StoryResult<Story> {
        let story = self.owned_story(caller, story_id).await?;
        let prompt = illustration_prompt(
            &story.title,
            &story.theme,
            &story.characters,
            &story.age_group,
            &story.content,
        );

        let image = self
            .illustrator
            .generate_illustration(&prompt)
            .await
            .map_err(|e| {
                let err = StoryError::Illustration(e.to_string());
                stage_failed(WorkflowStage::Illustrating, Some(story_id), err)
            })?;

        let image_url = illustration_path(story_id, Utc::now().timestamp_millis());
        let story = self
            .stories
            .update_illustration(story_id, &image_url, &image)
            .await
            .map_err(|e| persist_failed(story_id, e))?;
        info!(story_id = %story_id, bytes = image.len(), "Illustration regenerated");
        Ok(story)
    }

    /// Returns the stored illustration of an owned story.
    pub async fn story_illustration(&self, caller: Uuid, story_id: Uuid) -> StoryResult<Vec<u8>> {
        self.owned_story(caller, story_id).await?;
        self.stories
            .get_story_illustration(story_id)
            .await
            .map_err(StoryError::from_storage)
    }

    /// Deletes an owned story. Deleting twice fails the second time.
    pub async fn delete_story(&self, caller: Uuid, story_id: Uuid) -> StoryResult<()> {
        self.owned_story(caller, story_id).await?;
        self.stories
            .delete_story(story_id)
            .await
            .map_err(|e| persist_failed(story_id, e))?;
        info!(story_id = %story_id, "Story deleted");
        Ok(())
    }

    /// Builds share metadata with a link rooted at `base_url`.
    pub async fn share_story(
        &self,
        caller: Uuid,
        story_id: Uuid,
        base_url: &str,
    ) -> StoryResult<ShareInfo> {
        let story = self.owned_story(caller, story_id).await?;
        Ok(ShareInfo {
            share_url: format!("{}/stories/{}", base_url.trim_end_matches('/'), story.id),
            preview: excerpt(&story.content, SHARE_PREVIEW_CHARS),
            title: story.title,
            theme: story.theme,
            characters: story.characters,
            age_group: story.age_group,
        })
    }

    /// Synthesizes speech for arbitrary text. Nothing is persisted.
    pub async fn synthesize_speech(&self, text: &str) -> StoryResult<Vec<u8>> {
        validate_speech_text(text)
            .map_err(|e| stage_failed(WorkflowStage::Validating, None, e))?;
        self.speak(text, None).await
    }

    /// Narrates a story and caches the audio on it.
    ///
    /// An existing narration is reused unless `refresh` is set. A new narration gets
    /// a fresh `?v=` suffix on its URL so clients drop stale audio.
    pub async fn narrate_story(
        &self,
        caller: Uuid,
        story_id: Uuid,
        refresh: bool,
    ) -> StoryResult<Story> {
        let story = self.owned_story(caller, story_id).await?;
        if story.audio_url.is_some() && !refresh {
            debug!(story_id = %story_id, "Reusing cached narration");
            return Ok(story);
        }

        let audio = self.speak(&story.content, Some(story_id)).await?;
        let audio_url = narration_path(story_id, Utc::now().timestamp_millis());
        let story = self
            .stories
            .update_audio(story_id, &audio_url, &audio)
            .await
            .map_err(|e| persist_failed(story_id, e))?;
        info!(story_id = %story_id, bytes = audio.len(), "Narration stored");
        Ok(story)
    }

    /// Returns the cached narration of an owned story.
    pub async fn story_audio(&self, caller: Uuid, story_id: Uuid) -> StoryResult<Vec<u8>> {
        self.owned_story(caller, story_id).await?;
        self.stories
            .get_story_audio(story_id)
            .await
            .map_err(StoryError::from_storage)
    }

    async fn speak(&self, text: &str, story_id: Option<Uuid>) -> StoryResult<Vec<u8>> {
        let text = truncate_for_speech(text);
        self.narrator.generate_audio(&text).await.map_err(|e| {
            stage_failed(WorkflowStage::Speaking, story_id, StoryError::Speech(e.to_string()))
        })
    }

    /// Loads a story, reporting stories of other authors as missing.
    async fn owned_story(&self, caller: Uuid, story_id: Uuid) -> StoryResult<Story> {
        let story = self
            .stories
            .get_story_by_id(story_id)
            .await
            .map_err(StoryError::from_storage)?;
        if story.author_id != caller {
            warn!(story_id = %story_id, caller = %caller, "Access to another author's story");
            return Err(StoryError::NotFound(format!("Story {} not found", story_id)));
        }
        Ok(story)
    }
}

fn stage_failed(stage: WorkflowStage, story_id: Option<Uuid>, err: StoryError) -> StoryError {
    match &err {
        StoryError::Validation(_) | StoryError::NotFound(_) => {
            debug!(stage = %stage, story_id = ?story_id, "Request rejected: {}", err);
        }
        StoryError::Configuration(_) => {
            error!(stage = %stage, "Age group tables out of sync, this is a bug: {}", err);
        }
        _ => error!(stage = %stage, story_id = ?story_id, "Story workflow failed: {}", err),
    }
    err
}

fn persist_failed(story_id: Uuid, err: PortError) -> StoryError {
    stage_failed(WorkflowStage::Persisting, Some(story_id), StoryError::from_storage(err))
}

fn truncate_for_speech(text: &str) -> String {
    if text.chars().count() > MAX_SPEECH_CHARS {
        warn!("Text truncated for speech synthesis");
        let mut truncated: String = text.chars().take(MAX_SPEECH_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        text.to_string()
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
