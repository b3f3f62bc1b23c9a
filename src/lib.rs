//! qcinspect - Quality-Control Inspection Backend
//!
//! Accepts product images, asks a vision-language model to identify
//! manufacturing defects and turns whatever text comes back into a
//! guaranteed-shape [`AnalysisResult`].
//!
//! ## Core Features
//!
//! - **Model Ladder**: ordered Gemini model fallback on a single provider
//! - **Tolerant Parsing**: fence stripping, strict JSON, then literal syntax
//! - **Schema Normalization**: every result carries the full key set
//! - **Persistence**: SQLite inspection records with connection pooling
//! - **HTTP API**: authenticated upload, listing and Markdown export
//!
//! ## Quick Start
//!
//! ```ignore
//! use qcinspect::{AnalysisService, ConfigLoader};
//!
//! let config = ConfigLoader::load()?;
//! let service = AnalysisService::from_config(&config.llm)?;
//! let result = service.analyze(Path::new("part.jpg")).await;
//! println!("{}", result.overall_severity);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: vision provider, model ladder, prompt, response pipeline
//! - [`analysis`]: the never-failing analysis orchestrator
//! - [`server`]: axum HTTP API
//! - [`storage`]: SQLite persistence and the upload store
//! - [`config`]: layered configuration

pub mod ai;
pub mod analysis;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod report;
pub mod server;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{ErrorCategory, QcError, Result, ResultExt};
pub use types::{AnalysisResult, Inspection, InspectionStatus, NewInspection};

pub use storage::database::PoolConfig;
pub use storage::{Database, SharedDatabase, UploadStore};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use ai::{
    GeminiProvider, ImageInput, ModelLadder, ResponsePipeline, SharedProvider, VisionProvider,
    analyze_with_fallback,
};
pub use analysis::AnalysisService;
pub use report::render_markdown;
pub use server::{AppState, build_router};
