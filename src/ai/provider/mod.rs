//! Vision Model Provider Abstraction
//!
//! Defines the `VisionProvider` trait: one (prompt, image) request against one
//! named backend model, returning the raw text the model produced.
//!
//! ## Modules
//!
//! - `gemini`: Google Gemini `generateContent` adapter
//! - `chain`: Ordered model ladder with sequential fallback

mod chain;
mod gemini;

pub use chain::{LadderStats, ModelAttempt, ModelLadder, analyze_with_fallback};
pub use gemini::{GeminiProvider, extract_text};

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::constants::image;
use crate::types::Result;

// =============================================================================
// Image Input
// =============================================================================

/// Image payload sent alongside the prompt
#[derive(Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Build from bytes, deriving the MIME type from the file name
    pub fn for_path(bytes: Vec<u8>, path: &Path) -> Self {
        Self::new(bytes, mime_for_path(path))
    }
}

/// MIME type from a file extension, `image/jpeg` when unknown
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => image::DEFAULT_MIME,
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Shared provider type for concurrent access across requests.
pub type SharedProvider = Arc<dyn VisionProvider + Send + Sync>;

/// Vision model backend
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Send one request to `model_id` and return the raw text content.
    ///
    /// Errors carry the upstream message unmodified so status codes and
    /// API error names stay visible to classification.
    async fn invoke(&self, model_id: &str, prompt: &str, image: &ImageInput) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("dir/b.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("c.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("noext")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("weird.xyz")), "image/jpeg");
    }

    #[test]
    fn test_image_input_debug_hides_bytes() {
        let input = ImageInput::new(vec![1, 2, 3], "image/png");
        let debug = format!("{:?}", input);
        assert!(debug.contains("3 bytes"));
        assert!(debug.contains("image/png"));
    }
}
