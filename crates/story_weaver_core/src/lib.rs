pub mod domain;
pub mod error;
pub mod ports;
pub mod prompt;
pub mod validation;
pub mod workflow;

pub use domain::{
    AgeGroup, NewStory, ShareInfo, Story, StoryInput, StoryRequest, User, UserCredentials,
};
pub use error::{StoryError, StoryResult};
pub use ports::{
    IllustrationService, PortError, PortResult, StoryGenerationService, StoryRepository,
    TextToSpeechService, UserRepository,
};
pub use workflow::{StoryWorkflow, WorkflowStage};
