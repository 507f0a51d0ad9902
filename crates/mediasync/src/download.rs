use std::io;
use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::remote::{RemoteError, RemoteStore};

/// Random bytes in a temporary file name, rendered as upper-case hex.
const TEMP_SUFFIX_BYTES: usize = 8;

/// Mode for destination directories: group-writable, not world-writable.
#[cfg(unix)]
const DIR_MODE: u32 = 0o775;

/// Errors that can occur while downloading a file into place.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("destination has no file name: {}", .0.display())]
    InvalidDestination(PathBuf),

    #[error("couldn't create dir {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("couldn't create file {}: {source}", .path.display())]
    CreateTemp { path: PathBuf, source: io::Error },

    #[error("transfer failed: {0}")]
    Transfer(#[from] RemoteError),

    #[error("failed writing {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("couldn't rename {} to {}: {source}", .from.display(), .to.display())]
    Commit {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// The temporary file could not even be inspected after a failure.
    #[error("couldn't inspect {} after failed download ({cause}): {source}", .path.display())]
    CleanupFault {
        path: PathBuf,
        cause: String,
        source: io::Error,
    },
}

impl DownloadError {
    /// True for faults the pipeline cannot reason past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CleanupFault { .. })
    }
}

/// A hidden, randomly named sibling of `destination`: `.{name}.{HEX}`.
///
/// Returns `None` when `destination` has no file name.
pub fn temp_path(destination: &Path) -> Option<PathBuf> {
    let name = destination.file_name()?.to_string_lossy();
    let suffix = hex::encode_upper(rand::random::<[u8; TEMP_SUFFIX_BYTES]>());
    let temp_name = format!(".{name}.{suffix}");

    Some(match destination.parent() {
        Some(dir) => dir.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}

/// Stream `web_path` from `store` into `local_path`.
///
/// The body is written to a temporary file in the destination directory and
/// renamed onto `local_path` once complete, so `local_path` is either
/// untouched or holds the full content. On failure the temporary file is
/// removed.
pub async fn download<S>(store: &S, web_path: &str, local_path: &Path) -> Result<(), DownloadError>
where
    S: RemoteStore + ?Sized,
{
    let temp = temp_path(local_path)
        .ok_or_else(|| DownloadError::InvalidDestination(local_path.to_owned()))?;

    if let Some(dir) = local_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir(dir)
            .await
            .map_err(|source| DownloadError::CreateDir {
                path: dir.to_owned(),
                source,
            })?;
    }

    // Nothing to clean up until the temporary file exists.
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .await
        .map_err(|source| DownloadError::CreateTemp {
            path: temp.clone(),
            source,
        })?;

    debug!(web_path, temp = %temp.display(), "downloading to temporary file");

    match write_and_commit(store, web_path, file, &temp, local_path).await {
        Ok(()) => Ok(()),
        Err(err) => Err(discard_temp(&temp, err).await),
    }
}

async fn create_dir(dir: &Path) -> io::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(dir).await
}

async fn write_and_commit<S>(
    store: &S,
    web_path: &str,
    mut file: tokio::fs::File,
    temp: &Path,
    local_path: &Path,
) -> Result<(), DownloadError>
where
    S: RemoteStore + ?Sized,
{
    let write_err = |source| DownloadError::Write {
        path: temp.to_owned(),
        source,
    };

    let mut body = store.fetch(web_path).await?;
    while let Some(chunk) = body.try_next().await? {
        file.write_all(&chunk).await.map_err(write_err)?;
    }

    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;
    drop(file);

    tokio::fs::rename(temp, local_path)
        .await
        .map_err(|source| DownloadError::Commit {
            from: temp.to_owned(),
            to: local_path.to_owned(),
            source,
        })
}

/// Remove the temporary file left by a failed download, if any.
///
/// Returns the error to surface: `cause` itself, or a `CleanupFault` when the
/// temporary file cannot be inspected.
async fn discard_temp(temp: &Path, cause: DownloadError) -> DownloadError {
    match tokio::fs::symlink_metadata(temp).await {
        Ok(_) => {
            if let Err(e) = tokio::fs::remove_file(temp).await {
                warn!(temp = %temp.display(), error = %e, "failed to remove temporary file");
            }
            cause
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => cause,
        Err(source) => DownloadError::CleanupFault {
            path: temp.to_owned(),
            cause: cause.to_string(),
            source,
        },
    }
}
