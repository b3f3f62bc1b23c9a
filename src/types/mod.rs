pub mod analysis;
pub mod error;
pub mod inspection;
pub mod utils;

pub use analysis::{
    AnalysisResult, PARSING_ERROR_MESSAGE, SEVERITY_KEYS, Severity, SeverityBreakdown,
};
pub use error::{ErrorCategory, ErrorClassifier, QcError, Result, ResultExt};
pub use inspection::{Inspection, InspectionStatus, NewInspection};
pub use utils::{
    ParseWithDefault, capitalize, json_display, preview,
};
