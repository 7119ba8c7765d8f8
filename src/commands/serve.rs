use std::path::Path;

use anyhow::Context;

use hrdesk::config::ServerConfig;

/// Run the HTTP API on a multi-threaded runtime until Ctrl-C.
pub fn run(db_path: &Path, config: ServerConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(hrdesk::web::serve(db_path, &config))
}
