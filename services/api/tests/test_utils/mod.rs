//! Shared fixtures for the api integration tests.
#![allow(dead_code)]

pub mod mock_providers;

use api_lib::adapters::MemoryStore;
use mock_providers::{MockIllustrator, MockNarrator, MockStoryGenerator};
use std::sync::Arc;
use story_weaver_core::domain::StoryInput;
use story_weaver_core::workflow::StoryWorkflow;

pub const STORY_TEXT: &str = "The fox and the rabbit planted a tiny tree.\n\nThey watered it every day until it grew tall.";

/// A workflow wired to an in-memory store and mock providers, with handles to each.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub generator: Arc<MockStoryGenerator>,
    pub illustrator: Arc<MockIllustrator>,
    pub narrator: Arc<MockNarrator>,
    pub workflow: StoryWorkflow,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            Arc::new(MemoryStore::new()),
            MockStoryGenerator::new_success(STORY_TEXT),
            MockIllustrator::new_success(),
            MockNarrator::new_success("mp3-bytes"),
        )
    }

    pub fn with(
        store: Arc<MemoryStore>,
        generator: MockStoryGenerator,
        illustrator: MockIllustrator,
        narrator: MockNarrator,
    ) -> Self {
        let generator = Arc::new(generator);
        let illustrator = Arc::new(illustrator);
        let narrator = Arc::new(narrator);
        let workflow = StoryWorkflow::new(
            store.clone(),
            generator.clone(),
            illustrator.clone(),
            narrator.clone(),
        );
        Self {
            store,
            generator,
            illustrator,
            narrator,
            workflow,
        }
    }
}

pub fn input(theme: &str, characters: &[&str], age_group: &str) -> StoryInput {
    StoryInput {
        theme: theme.to_string(),
        characters: characters.iter().map(|c| c.to_string()).collect(),
        age_group: age_group.to_string(),
        title: None,
    }
}
