//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for model failures so the analysis layer
//! can turn upstream messages into user-facing categories.
//!
//! ## Error Categories
//!
//! - **RateLimit**: Quota exhausted or throttled (`429`, `RESOURCE_EXHAUSTED`)
//! - **NotFound**: Model missing or unsupported in region (`404`, `NOT_FOUND`)
//! - **Auth**: API key rejected
//! - **Network**: Connectivity issues
//! - **Unknown**: Anything else
//!
//! ## Design Principles
//!
//! - Single unified error type (QcError) for the entire application
//! - Model invocation errors keep the upstream message verbatim
//! - No panic/unwrap - all errors are recoverable

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories for failed model calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Daily quota or rate limit hit
    RateLimit,
    /// Model not found or not served in this region
    NotFound,
    /// Credentials rejected
    Auth,
    /// Connectivity issues
    Network,
    /// Unclassified failure
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// User-facing message for a terminal analysis failure.
    ///
    /// Only quota and not-found failures get a dedicated message; every other
    /// category falls back to a truncated echo of the upstream message.
    pub fn user_message(&self, message: &str) -> String {
        match self {
            Self::RateLimit => {
                "Daily Quota Exceeded. Please try again later or upgrade plan.".to_string()
            }
            Self::NotFound => "Model Not Found or Not Supported in Region.".to_string(),
            _ => format!(
                "Analysis Failed: {}...",
                message.chars().take(50).collect::<String>()
            ),
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Substring-based classifier for upstream model error messages
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from the model backend.
    ///
    /// Quota and not-found markers are matched case-sensitively against the
    /// raw message since they are status codes and API enum names.
    pub fn classify(message: &str) -> ErrorCategory {
        if message.contains("429") || message.contains("RESOURCE_EXHAUSTED") {
            return ErrorCategory::RateLimit;
        }

        if message.contains("404") || message.contains("NOT_FOUND") {
            return ErrorCategory::NotFound;
        }

        let lower = message.to_lowercase();

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("permission denied")
            || lower.contains("unauthenticated")
        {
            return ErrorCategory::Auth;
        }

        if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timed out")
            || lower.contains("timeout")
        {
            return ErrorCategory::Network;
        }

        ErrorCategory::Unknown
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum QcError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Model Errors
    // -------------------------------------------------------------------------
    /// A single backend call failed; message is the upstream text verbatim
    #[error("{message}")]
    ModelInvocation { model: String, message: String },

    /// Every model in the ladder failed or returned nothing
    #[error("{0}")]
    AllModelsExhausted(String),

    /// Sanitized model output could not be parsed by either parser
    #[error("Failed to parse JSON or Python dict")]
    UnparsableResponse { content: String },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),
}

impl From<r2d2::Error> for QcError {
    fn from(err: r2d2::Error) -> Self {
        QcError::Storage(format!("Failed to acquire database connection: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, QcError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl QcError {
    /// Create a model invocation error
    pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelInvocation {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Category of a model failure, `None` for non-model errors
    pub fn model_category(&self) -> Option<ErrorCategory> {
        match self {
            Self::ModelInvocation { message, .. } => Some(ErrorClassifier::classify(message)),
            Self::AllModelsExhausted(message) => Some(ErrorClassifier::classify(message)),
            _ => None,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| QcError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| QcError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
