//! crates/story_weaver_core/src/validation.rs
//!
//! Input checks that run before any prompt is built or provider is called.

use crate::domain::{AgeGroup, StoryInput, StoryRequest};
use crate::error::{StoryError, StoryResult};

/// Validates and normalizes a story request.
///
/// Trims the theme, the age bucket and every character, drops empty characters
/// while keeping their order, and treats a blank title as absent.
pub fn validate_story_input(input: StoryInput) -> StoryResult<StoryRequest> {
    let theme = input.theme.trim();
    if theme.is_empty() {
        return Err(StoryError::Validation("theme is required".to_string()));
    }

    let age_group_raw = input.age_group.trim();
    if age_group_raw.is_empty() {
        return Err(StoryError::Validation("ageGroup is required".to_string()));
    }
    let age_group = AgeGroup::parse(age_group_raw).ok_or_else(|| {
        let known: Vec<&str> = AgeGroup::ALL.iter().map(AgeGroup::as_str).collect();
        StoryError::Validation(format!(
            "unknown ageGroup '{}', expected one of: {}",
            age_group_raw,
            known.join(", ")
        ))
    })?;

    let characters: Vec<String> = input
        .characters
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if characters.is_empty() {
        return Err(StoryError::Validation(
            "at least one character is required".to_string(),
        ));
    }

    let title = input
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(StoryRequest {
        theme: theme.to_string(),
        characters,
        age_group,
        title,
    })
}

/// Checks text handed to the speech provider.
pub fn validate_speech_text(text: &str) -> StoryResult<()> {
    if text.trim().is_empty() {
        return Err(StoryError::Validation("text is required".to_string()));
    }
    Ok(())
}
