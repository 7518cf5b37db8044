//! crates/story_weaver_core/src/prompt.rs
//!
//! Turns a validated request into provider-ready prompt text.
//!
//! The lookup tables are immutable statics: one template per age bucket and a
//! list of learning goals per known theme. Every function here is pure, so the
//! same arguments always produce byte-identical output.

use crate::domain::AgeGroup;
use crate::error::{StoryError, StoryResult};

/// Age-appropriate shape of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeTemplate {
    pub age_group: AgeGroup,
    pub complexity: &'static str,
    pub length: &'static str,
    pub focus: &'static str,
    pub structure: &'static str,
}

pub static AGE_TEMPLATES: &[AgeTemplate] = &[
    AgeTemplate {
        age_group: AgeGroup::ThreeToFive,
        complexity: "very simple",
        length: "2-3 minutes",
        focus: "basic emotions, colors, numbers, and simple actions",
        structure: "repetitive patterns and clear cause-effect relationships",
    },
    AgeTemplate {
        age_group: AgeGroup::FiveToEight,
        complexity: "simple to moderate",
        length: "5-7 minutes",
        focus: "friendship, sharing, problem-solving, and basic life lessons",
        structure: "clear beginning, middle, and end with a simple conflict and resolution",
    },
    AgeTemplate {
        age_group: AgeGroup::EightToTwelve,
        complexity: "moderate",
        length: "8-10 minutes",
        focus: "teamwork, responsibility, courage, and complex emotions",
        structure: "more detailed plot with character development and multiple events",
    },
];

/// Theme whose goals are used when a theme is not in [`THEME_GOALS`].
pub const DEFAULT_THEME: &str = "friendship";

const FRIENDSHIP_GOALS: &[&str] = &["empathy", "sharing", "communication"];

pub static THEME_GOALS: &[(&str, &[&str])] = &[
    (DEFAULT_THEME, FRIENDSHIP_GOALS),
    ("nature", &["environmental awareness", "animal habitats", "conservation"]),
    ("adventure", &["problem-solving", "courage", "teamwork"]),
    ("family", &["relationships", "responsibility", "care"]),
    ("learning", &["curiosity", "persistence", "growth mindset"]),
    ("diversity", &["acceptance", "cultural awareness", "inclusion"]),
];

/// Longest excerpt of the story text placed into an illustration prompt.
const ILLUSTRATION_OPENING_CHARS: usize = 300;

pub fn age_template(age_group: AgeGroup) -> StoryResult<&'static AgeTemplate> {
    AGE_TEMPLATES
        .iter()
        .find(|t| t.age_group == age_group)
        .ok_or_else(|| {
            StoryError::Configuration(format!("no story template for age group {}", age_group))
        })
}

/// Learning goals for a theme, matched case-insensitively.
/// Unknown themes fall back to the goals of [`DEFAULT_THEME`].
pub fn learning_goals(theme: &str) -> &'static [&'static str] {
    let theme = theme.trim();
    THEME_GOALS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(theme))
        .map(|(_, goals)| *goals)
        .unwrap_or(FRIENDSHIP_GOALS)
}

/// Builds the instruction sent to the text-generation provider.
pub fn story_prompt(
    theme: &str,
    characters: &[String],
    age_group: AgeGroup,
) -> StoryResult<String> {
    let template = age_template(age_group)?;
    let goals = learning_goals(theme);
    let first_goal = goals.first().copied().unwrap_or_default();
    let second_goal = goals.get(1).copied().unwrap_or(first_goal);

    Ok(format!(
        "Create an engaging children's story with these specifications:

Age Group ({age} years):
- Complexity: {complexity}
- Target Length: {length}
- Focus Areas: {focus}
- Story Structure: {structure}

Characters: {characters}
Theme: {theme}
Learning Goals: {goals}

Story Requirements:
1. Include interactive elements (questions, simple puzzles, or counting opportunities)
2. Create clear character personalities and relationships
3. Include a moral lesson about {theme}
4. Add age-appropriate humor and engaging dialogue
5. Include opportunities for learning {first_goal} and {second_goal}

Please write the story in a clear, engaging style with natural dialogue and descriptive language appropriate for {age} year olds. Separate paragraphs with a blank line.",
        age = age_group,
        complexity = template.complexity,
        length = template.length,
        focus = template.focus,
        structure = template.structure,
        characters = characters.join(", "),
        theme = theme,
        goals = goals.join(", "),
        first_goal = first_goal,
        second_goal = second_goal,
    ))
}

/// Builds the image-generation prompt for a story page.
pub fn illustration_prompt(
    title: &str,
    theme: &str,
    characters: &[String],
    age_group: &str,
    content: &str,
) -> String {
    let opening: String = content
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or_default()
        .chars()
        .take(ILLUSTRATION_OPENING_CHARS)
        .collect();

    let mut prompt = format!(
        "Create a colorful and friendly cartoon illustration for a children's storybook page. \
         The story is titled '{}', about '{}' featuring {}, for age group '{}'.",
        title,
        theme,
        characters.join(", "),
        age_group
    );
    if !opening.is_empty() {
        prompt.push_str(&format!(" Opening scene: {}", opening));
    }
    prompt.push_str(
        " The style should be whimsical, vibrant, and suitable for young children. No text in the image.",
    );
    prompt
}
