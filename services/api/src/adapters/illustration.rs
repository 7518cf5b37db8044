//! services/api/src/adapters/illustration.rs
//!
//! This module contains the adapter for OpenAI's image generation.
//! It implements the `IllustrationService` port from the `core` crate and always
//! hands back the image bytes, so nothing depends on the provider's short-lived links.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::images::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize},
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use story_weaver_core::ports::{IllustrationService, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `IllustrationService` using the OpenAI images API.
#[derive(Clone)]
pub struct OpenAiIllustrationAdapter {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    model: ImageModel,
    size: ImageSize,
}

impl OpenAiIllustrationAdapter {
    /// Creates a new `OpenAiIllustrationAdapter`. `http` downloads images the
    /// provider answers with as links.
    pub fn new(
        client: Client<OpenAIConfig>,
        http: reqwest::Client,
        model: ImageModel,
        size: ImageSize,
    ) -> Self {
        Self {
            client,
            http,
            model,
            size,
        }
    }

    async fn download(&self, url: &str) -> PortResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PortError::Unexpected(format!("Image download failed: {}", e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::Unexpected(format!("Image download failed: {}", e)))?;
        non_empty(bytes.to_vec())
    }
}

/// Maps a configured model name onto the provider's model catalog.
pub fn parse_image_model(name: &str) -> ImageModel {
    match name.trim().to_lowercase().as_str() {
        "dall-e-2" => ImageModel::DallE2,
        "dall-e-3" => ImageModel::DallE3,
        "gpt-image-1" => ImageModel::GptImage1,
        "gpt-image-1-mini" => ImageModel::GptImage1Mini,
        other => ImageModel::Other(other.to_string()),
    }
}

/// Maps a configured size such as `1024x1024` onto the provider's sizes.
pub fn parse_image_size(name: &str) -> Option<ImageSize> {
    match name.trim().to_lowercase().as_str() {
        "auto" => Some(ImageSize::Auto),
        "256x256" => Some(ImageSize::S256x256),
        "512x512" => Some(ImageSize::S512x512),
        "1024x1024" => Some(ImageSize::S1024x1024),
        "1792x1024" => Some(ImageSize::S1792x1024),
        "1024x1792" => Some(ImageSize::S1024x1792),
        "1536x1024" => Some(ImageSize::S1536x1024),
        "1024x1536" => Some(ImageSize::S1024x1536),
        _ => None,
    }
}

/// Decodes a base64 image payload.
fn decode_image(data: &str) -> PortResult<Vec<u8>> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| PortError::Unexpected(format!("Invalid image payload: {}", e)))?;
    non_empty(bytes)
}

fn non_empty(bytes: Vec<u8>) -> PortResult<Vec<u8>> {
    if bytes.is_empty() {
        return Err(PortError::Unexpected("no image generated".to_string()));
    }
    Ok(bytes)
}

//=========================================================================================
// `IllustrationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IllustrationService for OpenAiIllustrationAdapter {
    async fn generate_illustration(&self, prompt: &str) -> PortResult<Vec<u8>> {
        let mut args = CreateImageRequestArgs::default();
        args.prompt(prompt).model(self.model.clone()).n(1u8).size(self.size);
        // gpt-image models always answer in base64 and reject `response_format`.
        if matches!(self.model, ImageModel::DallE2 | ImageModel::DallE3) {
            args.response_format(ImageResponseFormat::B64Json);
        }
        let request = args
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(model = ?self.model, "Requesting illustration");
        let response = self
            .client
            .images()
            .generate(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let image = response
            .data
            .first()
            .ok_or_else(|| PortError::Unexpected("no image generated".to_string()))?;
        match image.as_ref() {
            Image::B64Json { b64_json, .. } => decode_image(b64_json),
            Image::Url { url, .. } => self.download(url).await,
        }
    }
}
