//! services/api/src/adapters/story_llm.rs
//!
//! This module contains the adapter for the story-writing LLM.
//! It implements the `StoryGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use story_weaver_core::ports::{PortError, PortResult, StoryGenerationService};
use tracing::debug;

/// Sampling temperature used for every story.
pub const STORY_TEMPERATURE: f32 = 0.7;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `StoryGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiStoryAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiStoryAdapter {
    /// Creates a new `OpenAiStoryAdapter` bound to a single model.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `StoryGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryGenerationService for OpenAiStoryAdapter {
    /// Sends the prompt as a single user message and returns the first choice's text.
    async fn generate_story(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        )];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(STORY_TEMPERATURE)
            .n(1u8)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(model = %self.model, "Requesting story completion");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // An empty completion counts as a failure, never as an empty story.
        let story = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| PortError::Unexpected("no content generated".to_string()))?;

        Ok(story.trim().to_string())
    }
}
