use std::path::Path;

use anyhow::{Context, Result};
use mediasync::ProcessLock;
use mediasync_http::HttpRemote;
use mediasync_telegram::TelegramReporter;
use tracing::{debug, info};

use crate::config;

/// Take the lock, build the store and reporter, and mirror every remote file.
///
/// Errors keep their typed cause so the caller can pick an exit code.
pub async fn run(config_path: Option<&Path>, lock_file: &Path) -> Result<()> {
    let lock = ProcessLock::try_acquire(lock_file)?;
    debug!(path = %lock.path().display(), "lock acquired");

    let settings = config::load_config(config_path).context("can't get configuration")?;

    let reporter = TelegramReporter::connect(settings.telegram)
        .await
        .context("can't send telegram messages")?;

    let store = HttpRemote::new(settings.remote);
    info!(mappings = settings.mappings.len(), "starting sync");

    let summary = mediasync::run(lock, &store, &reporter, &settings.mappings).await?;

    println!(
        "Downloaded {} files ({} failed).",
        summary.downloaded, summary.failed
    );
    Ok(())
}
