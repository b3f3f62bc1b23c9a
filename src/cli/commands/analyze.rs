//! Analyze Command
//!
//! Runs one image through the analysis pipeline without touching the
//! database, printing the normalized result as JSON.

use std::path::Path;

use crate::analysis::AnalysisService;
use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::{QcError, Result, Severity};

pub async fn run(image: &Path, output_path: Option<&Path>) -> Result<()> {
    let output = Output::new();

    if !image.is_file() {
        return Err(QcError::NotFound(format!(
            "Image not found: {}",
            image.display()
        )));
    }

    let config = ConfigLoader::load()?;
    let service = AnalysisService::from_config(&config.llm)?;

    output.info(&format!(
        "Analyzing {} ({} model(s) in ladder)",
        image.display(),
        service.models().len()
    ));

    let result = service.analyze(image).await;
    let json = serde_json::to_string_pretty(&result.to_value())?;

    match output_path {
        Some(path) => {
            std::fs::write(path, &json)?;
            output.success(&format!("Result written to {}", path.display()));
        }
        None => println!("{}", json),
    }

    if let Some(error) = result.error.as_deref().filter(|_| result.is_failed()) {
        output.warning(&format!("Analysis failed: {}", error));
        return Ok(());
    }

    let summary = format!(
        "Overall severity: {} ({} defect(s))",
        result.overall_severity,
        result.defects.len()
    );
    match result.severity() {
        Some(Severity::Critical | Severity::High) => output.warning(&summary),
        _ => output.success(&summary),
    }

    Ok(())
}
