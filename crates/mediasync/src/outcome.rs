use crate::download::DownloadError;
use crate::mapping::NotFound;
use crate::remote::RemoteError;

/// A failure recorded during a run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("couldn't get file list: {0}")]
    Listing(#[source] RemoteError),

    #[error(transparent)]
    Unmapped(#[from] NotFound),

    #[error("couldn't download {web_path}: {source}")]
    Download {
        web_path: String,
        source: DownloadError,
    },

    #[error("failed to delete {web_path}: {source}")]
    Delete {
        web_path: String,
        source: RemoteError,
    },
}

impl SyncError {
    /// The web path the error concerns, if it concerns a single file.
    pub fn web_path(&self) -> Option<&str> {
        match self {
            Self::Listing(_) => None,
            Self::Unmapped(e) => Some(&e.web_path),
            Self::Download { web_path, .. } | Self::Delete { web_path, .. } => Some(web_path),
        }
    }

    /// True if the run cannot continue past this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Listing(_) => true,
            Self::Download { source, .. } => source.is_fatal(),
            Self::Unmapped(_) | Self::Delete { .. } => false,
        }
    }
}

/// Everything a run has to report: downloaded file names and errors, in the
/// order they were recorded.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    downloaded: Vec<String>,
    errors: Vec<SyncError>,
}

impl SyncOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>) {
        self.downloaded.push(name.into());
    }

    pub fn add_error(&mut self, error: SyncError) {
        self.errors.push(error);
    }

    pub fn downloaded(&self) -> &[String] {
        &self.downloaded
    }

    pub fn errors(&self) -> &[SyncError] {
        &self.errors
    }

    /// True when nothing was downloaded and nothing went wrong.
    pub fn is_empty(&self) -> bool {
        self.downloaded.is_empty() && self.errors.is_empty()
    }
}
