//! Client for the hosted image-generation API.
//!
//! Generation never fails the request: with no API token configured the app
//! runs in demo mode, and any upstream failure falls back to the same
//! placeholder image with the result flagged accordingly.

use std::io::Cursor;
use std::sync::LazyLock;

use serde_json::{Value, json};
use tracing::{error, info, warn};
use url::Url;

use crate::constants::{
    INFERENCE_API_BASE, MAX_IMAGE_DIMENSION, PLACEHOLDER_RGB, PLACEHOLDER_SIZE,
};
use crate::styler::StyleTag;

/// The outcome of a generation call.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    /// PNG-encoded image data
    pub bytes: Vec<u8>,
    /// True when this is the static fallback rather than a live generation
    pub placeholder: bool,
}

/// Talks to the hosted inference endpoint.
#[derive(Clone, Debug)]
pub struct ImageGenerator {
    client: reqwest::Client,
    api_base: Url,
    api_token: Option<String>,
}

impl ImageGenerator {
    /// Builds a generator; a `None` token means demo mode.
    pub fn new(api_token: Option<String>) -> Result<Self, url::ParseError> {
        Self::with_api_base(api_token, INFERENCE_API_BASE)
    }

    /// Builds a generator against a non-default endpoint.
    pub fn with_api_base(
        api_token: Option<String>,
        api_base: &str,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_base: Url::parse(api_base)?,
            api_token: api_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// True when no API token is configured.
    pub fn demo_mode(&self) -> bool {
        self.api_token.is_none()
    }

    /// Generates an image for the augmented prompt.
    ///
    /// One synchronous call, no retries. Returns the placeholder on any
    /// failure rather than surfacing an error to the caller.
    pub async fn generate(&self, prompt: &str, style: Option<StyleTag>) -> GeneratedImage {
        let Some(token) = self.api_token.as_deref() else {
            info!("Demo mode: returning placeholder image");
            return GeneratedImage {
                bytes: placeholder_png().to_vec(),
                placeholder: true,
            };
        };

        match self.request_image(token, prompt, style).await {
            Ok(bytes) => {
                info!("Image generated for prompt: {}", prompt);
                GeneratedImage {
                    bytes,
                    placeholder: false,
                }
            }
            Err(err) => {
                warn!("Falling back to placeholder image: {}", err);
                GeneratedImage {
                    bytes: placeholder_png().to_vec(),
                    placeholder: true,
                }
            }
        }
    }

    async fn request_image(
        &self,
        token: &str,
        prompt: &str,
        style: Option<StyleTag>,
    ) -> Result<Vec<u8>, String> {
        let url = self
            .api_base
            .join(model_for(style))
            .map_err(|err| err.to_string())?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({"inputs": prompt}))
            .send()
            .await
            .map_err(|err| format!("Inference request failed: {err}"))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| format!("Failed reading inference response: {err}"))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(format!("Inference API error {status}: {message}"));
        }

        normalize_to_png(&bytes)
    }
}

/// Picks the upstream model for a style.
fn model_for(style: Option<StyleTag>) -> &'static str {
    match style {
        Some(StyleTag::Cyberpunk) | Some(StyleTag::Cartoon) => "black-forest-labs/FLUX.1-dev",
        _ => "stabilityai/stable-diffusion-xl-base-1.0",
    }
}

/// Validates API image bytes and re-encodes to PNG where needed.
fn normalize_to_png(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| format!("Failed to guess image format: {err}"))?;
    let format = reader.format();
    let decoded = reader
        .decode()
        .map_err(|err| format!("Failed to decode image: {err}"))?;

    if decoded.width() > MAX_IMAGE_DIMENSION || decoded.height() > MAX_IMAGE_DIMENSION {
        return Err(format!(
            "Image dimensions too large: {}x{}",
            decoded.width(),
            decoded.height()
        ));
    }

    if format == Some(image::ImageFormat::Png) {
        return Ok(bytes.to_vec());
    }

    let mut output = Cursor::new(Vec::new());
    decoded
        .write_to(&mut output, image::ImageFormat::Png)
        .map_err(|err| format!("Failed to re-encode image as PNG: {err}"))?;
    Ok(output.into_inner())
}

static PLACEHOLDER_PNG: LazyLock<Vec<u8>> = LazyLock::new(|| {
    let pixel = image::Rgb(PLACEHOLDER_RGB);
    let img = image::RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, pixel);
    let mut output = Cursor::new(Vec::new());
    if let Err(err) =
        image::DynamicImage::ImageRgb8(img).write_to(&mut output, image::ImageFormat::Png)
    {
        error!("Failed to encode placeholder image: {}", err);
    }
    output.into_inner()
});

/// The static fallback image, encoded once.
pub fn placeholder_png() -> &'static [u8] {
    PLACEHOLDER_PNG.as_slice()
}
