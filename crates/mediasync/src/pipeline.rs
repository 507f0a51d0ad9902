//! One synchronisation run: list, download, delete, report.

use tracing::{debug, error, info, warn};

use crate::download;
use crate::lock::ProcessLock;
use crate::mapping::{self, PathMapping};
use crate::outcome::{SyncError, SyncOutcome};
use crate::remote::{RemoteFileRef, RemoteStore};
use crate::report::{ReportError, Reporter};

/// Conditions that end a run as a failure.
///
/// Per-file errors are not here: they are recorded in the report and the run
/// carries on.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{0}")]
    Listing(String),

    #[error("unrecoverable fault: {0}")]
    CleanupFault(String),

    #[error("failed to send report: {0}")]
    Report(#[source] ReportError),
}

/// Counts describing a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub downloaded: usize,
    pub failed: usize,
    pub reported: bool,
}

/// Mirror every remote file onto the local filesystem.
///
/// Each listed file is resolved against `mappings`, downloaded atomically,
/// then deleted from `store`. A failing file is recorded and the next one is
/// tried. `lock` is released once file work stops, on every path, before the
/// outcome is handed to `reporter`. The reporter is called exactly once if
/// anything was downloaded or went wrong, and not at all otherwise.
pub async fn run<S, R>(
    lock: ProcessLock,
    store: &S,
    reporter: &R,
    mappings: &[PathMapping],
) -> Result<RunSummary, RunError>
where
    S: RemoteStore + ?Sized,
    R: Reporter + ?Sized,
{
    let mut outcome = SyncOutcome::new();
    let abort = sync_files(store, mappings, &mut outcome).await;

    if let Err(e) = lock.release() {
        warn!(error = %e, "can't unlock");
    }

    let summary = RunSummary {
        downloaded: outcome.downloaded().len(),
        failed: outcome.errors().len(),
        reported: !outcome.is_empty(),
    };

    if outcome.is_empty() {
        debug!("nothing to report");
    } else if let Err(e) = reporter.send(&outcome).await {
        match abort {
            Some(abort) => {
                error!(error = %e, "failed to send report");
                return Err(abort);
            }
            None => return Err(RunError::Report(e)),
        }
    }

    match abort {
        Some(abort) => Err(abort),
        None => {
            info!(
                downloaded = summary.downloaded,
                failed = summary.failed,
                "synchronisation complete"
            );
            Ok(summary)
        }
    }
}

/// Process every listed file into `outcome`, returning the reason the run was
/// cut short, if it was.
async fn sync_files<S>(
    store: &S,
    mappings: &[PathMapping],
    outcome: &mut SyncOutcome,
) -> Option<RunError>
where
    S: RemoteStore + ?Sized,
{
    let files = match store.list().await {
        Ok(files) => files,
        Err(e) => {
            let err = SyncError::Listing(e);
            error!(store = store.label(), error = %err, "listing failed");
            let abort = RunError::Listing(err.to_string());
            outcome.add_error(err);
            return Some(abort);
        }
    };

    info!(store = store.label(), files = files.len(), "listed remote files");

    for file in &files {
        match sync_file(store, mappings, file).await {
            Ok(name) => {
                info!(web_path = %file.web_path, "downloaded");
                outcome.add_file(name);
            }
            Err(err) if err.is_fatal() => {
                error!(web_path = %file.web_path, error = %err, "stopping run");
                let abort = RunError::CleanupFault(err.to_string());
                outcome.add_error(err);
                return Some(abort);
            }
            Err(err) => {
                warn!(web_path = %file.web_path, error = %err, "file failed");
                outcome.add_error(err);
            }
        }
    }

    None
}

/// Download one file into place and remove it remotely. Returns the name to
/// record.
async fn sync_file<S>(
    store: &S,
    mappings: &[PathMapping],
    file: &RemoteFileRef,
) -> Result<String, SyncError>
where
    S: RemoteStore + ?Sized,
{
    let web_path = file.web_path.as_str();
    let local = mapping::resolve(web_path, mappings)?;
    debug!(web_path, local = %local.display(), "resolved local path");

    download::download(store, web_path, &local)
        .await
        .map_err(|source| SyncError::Download {
            web_path: web_path.to_owned(),
            source,
        })?;

    store
        .delete(web_path)
        .await
        .map_err(|source| SyncError::Delete {
            web_path: web_path.to_owned(),
            source,
        })?;

    Ok(mapping::file_name(web_path).to_owned())
}
