//! AI Integration Layer
//!
//! Vision model access and the response normalization pipeline.

pub mod prompt;
pub mod provider;
pub mod validation;

pub use prompt::inspection_prompt;
pub use provider::{
    GeminiProvider, ImageInput, LadderStats, ModelAttempt, ModelLadder, SharedProvider,
    VisionProvider, analyze_with_fallback, mime_for_path,
};
pub use validation::{ResponsePipeline, Sanitizer, normalize, parse, parse_literal};
