//! Models Command
//!
//! Shows the configured fallback ladder and, when an API key is present,
//! the models the key can call with `generateContent`.

use crate::ai::GeminiProvider;
use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

pub async fn run() -> Result<()> {
    let output = Output::new();
    let config = ConfigLoader::load()?;

    output.section("Fallback ladder");
    for (i, model) in config.llm.models.iter().enumerate() {
        output.numbered(i + 1, model);
    }

    if config.llm.api_key.is_none() {
        output.warning("GOOGLE_API_KEY not set; skipping available model lookup");
        return Ok(());
    }

    let provider = GeminiProvider::new(&config.llm)?;
    let available = provider.list_models().await?;

    output.section("Available models (generateContent)");
    for (i, model) in available.iter().enumerate() {
        output.numbered(i + 1, model);
    }

    let missing: Vec<&str> = config
        .llm
        .models
        .iter()
        .filter(|m| !available.contains(m))
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        output.warning(&format!(
            "Ladder models not offered for this key: {}",
            missing.join(", ")
        ));
    }

    Ok(())
}
