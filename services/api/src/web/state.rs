//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use story_weaver_core::ports::UserRepository;
use story_weaver_core::workflow::StoryWorkflow;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
/// Nothing in it is mutated per request; all mutable data lives behind the repositories.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<StoryWorkflow>,
    pub users: Arc<dyn UserRepository>,
    pub config: Arc<Config>,
}
