//! Mock providers for testing the story workflow without network calls.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use story_weaver_core::ports::{
    IllustrationService, PortError, PortResult, StoryGenerationService, TextToSpeechService,
};

/// What a mock provider answers with.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always succeed with the given payload
    Success(String),
    /// Always fail with the given provider message
    Error(String),
}

impl MockBehavior {
    fn reply(&self) -> PortResult<String> {
        match self {
            MockBehavior::Success(text) => Ok(text.clone()),
            MockBehavior::Error(message) => Err(PortError::Unexpected(message.clone())),
        }
    }
}

/// Mock text-generation provider that records every prompt it receives.
pub struct MockStoryGenerator {
    behavior: MockBehavior,
    prompts: Mutex<Vec<String>>,
}

impl MockStoryGenerator {
    pub fn new_success(text: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Success(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn new_error(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Error(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl StoryGenerationService for MockStoryGenerator {
    async fn generate_story(&self, prompt: &str) -> PortResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.behavior.reply()
    }
}

/// Mock image provider. Successful calls return distinct bytes each time.
pub struct MockIllustrator {
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockIllustrator {
    pub fn new_success() -> Self {
        Self {
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn new_error(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IllustrationService for MockIllustrator {
    async fn generate_illustration(&self, _prompt: &str) -> PortResult<Vec<u8>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.fail_with {
            Some(message) => Err(PortError::Unexpected(message.clone())),
            None => Ok(format!("png-{}", n).into_bytes()),
        }
    }
}

/// Mock speech provider that records the text it was asked to read.
pub struct MockNarrator {
    behavior: MockBehavior,
    texts: Mutex<Vec<String>>,
}

impl MockNarrator {
    pub fn new_success(audio: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Success(audio.into()),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn new_error(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Error(message.into()),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextToSpeechService for MockNarrator {
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>> {
        self.texts.lock().unwrap().push(text.to_string());
        self.behavior.reply().map(String::into_bytes)
    }
}
