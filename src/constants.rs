//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Model backend constants
pub mod model {
    /// Default fallback ladder, tried strictly in this order
    pub const DEFAULT_LADDER: &[&str] = &[
        "gemini-2.0-flash",
        "gemini-2.0-flash-lite",
        "gemini-1.5-flash",
        "gemini-1.5-flash-8b",
        "gemini-1.5-pro",
        "gemini-2.5-flash",
    ];

    /// Gemini REST endpoint
    pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Sampling temperature for inspection requests
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;

    /// Characters of raw model output written to debug logs
    pub const RAW_PREVIEW_CHARS: usize = 500;
}

/// Image handling constants
pub mod image {
    /// MIME type assumed when the extension is unknown
    pub const DEFAULT_MIME: &str = "image/jpeg";

    /// Extension given to uploads that arrive without one
    pub const DEFAULT_EXTENSION: &str = ".jpg";
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Default server bind port
    pub const DEFAULT_PORT: u16 = 8000;

    /// Maximum upload body size (bytes)
    pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

    /// Header carrying Google API keys, keeping them out of request URLs
    pub const API_KEY_HEADER: &str = "x-goog-api-key";
}

/// Listing constants
pub mod pagination {
    pub const DEFAULT_LIMIT: u32 = 100;
}

/// Identity provider constants
pub mod auth {
    /// Firebase Identity Toolkit endpoint
    pub const DEFAULT_IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
}
