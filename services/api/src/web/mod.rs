pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::{optional_auth, require_auth};
pub use rest::{
    create_story_handler, delete_story_handler, get_story_handler, health_handler,
    list_stories_handler, narrate_story_handler, regenerate_illustration_handler,
    share_story_handler, speech_handler, story_audio_handler, story_illustration_handler,
    toggle_favorite_handler,
};

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds every API route with its auth layer and binds the shared state.
///
/// `GET /stories` resolves the caller when possible and answers anonymous callers
/// with an empty list. Everything else under `/stories` and `/speech` requires a session.
pub fn app_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Routes where the caller is optional
    let listing_routes = Router::new()
        .route("/stories", get(list_stories_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            optional_auth,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/stories", post(create_story_handler))
        .route(
            "/stories/{id}",
            get(get_story_handler).delete(delete_story_handler),
        )
        .route("/stories/{id}/favorite", post(toggle_favorite_handler))
        .route(
            "/stories/{id}/regenerate-illustration",
            post(regenerate_illustration_handler),
        )
        .route("/stories/{id}/share", get(share_story_handler))
        .route("/stories/{id}/image", get(story_illustration_handler))
        .route(
            "/stories/{id}/audio",
            get(story_audio_handler).post(narrate_story_handler),
        )
        .route("/speech", post(speech_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(listing_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
