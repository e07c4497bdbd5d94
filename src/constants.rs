//! Shared constants/setters for things
//!

use std::path::PathBuf;
use std::sync::LazyLock;

/// The default place we put generated images
pub static IMAGE_DIR: LazyLock<PathBuf> = LazyLock::new(|| PathBuf::from("./generated_images"));

/// Default database filename
pub const DATABASE_PATH: &str = "sdgallery.sqlite";

/// Maximum accepted prompt length in characters
pub const MAX_PROMPT_CHARS: usize = 500;

/// Lower bound of the rating scale
pub const MIN_RATING: i32 = 1;

/// Upper bound of the rating scale
pub const MAX_RATING: i32 = 5;

/// Images per gallery page
pub const GALLERY_PAGE_SIZE: u64 = 9;

/// Base URL of the hosted inference API
pub const INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models/";

/// Largest accepted width/height for an image returned by the API
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

/// Edge length of the placeholder image
pub const PLACEHOLDER_SIZE: u32 = 512;

/// Fill colour of the placeholder image
pub const PLACEHOLDER_RGB: [u8; 3] = [73, 109, 137];

/// Max age (in seconds) for image cache entries.
pub const IMAGE_CACHE_MAX_AGE_SECONDS: u64 = 60 * 60;

/// Shared cache max age (in seconds) for image cache entries.
pub const IMAGE_CACHE_S_MAXAGE_SECONDS: u64 = 60 * 60 * 24;

/// Cache-Control value for image responses.
pub static IMAGE_CACHE_CONTROL: LazyLock<String> = LazyLock::new(|| {
    format!(
        "public, max-age={}, s-maxage={}",
        IMAGE_CACHE_MAX_AGE_SECONDS, IMAGE_CACHE_S_MAXAGE_SECONDS
    )
});

/// Session inactivity expiry in seconds
pub const SESSION_EXPIRY_SECONDS: i64 = 3600;
