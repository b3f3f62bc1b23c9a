use tracing::info;

use crate::config::ConfigLoader;
use crate::server;
use crate::types::Result;

/// Start the HTTP API; flags override the loaded configuration
pub async fn run(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ConfigLoader::load()?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    info!(
        database = %config.database.path.display(),
        uploads = %config.server.upload_dir.display(),
        models = config.llm.models.len(),
        "Starting server"
    );

    server::serve(&config).await
}
