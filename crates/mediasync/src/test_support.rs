use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use bytes::Bytes;

use crate::outcome::SyncOutcome;
use crate::remote::{ByteStream, RemoteError, RemoteFileRef, RemoteStore};
use crate::report::{ReportError, Reporter};

/// A call made against an [`InMemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List,
    Fetch(String),
    Delete(String),
}

#[derive(Debug, Clone)]
enum Body {
    Complete(Vec<u8>),
    /// Yields the bytes, then fails mid-transfer.
    Truncated(Vec<u8>),
    /// Refused with this HTTP status before any body.
    Unavailable(u16),
}

/// In-memory remote store for testing. Files are listed in insertion order
/// and every call is recorded.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    files: Mutex<Vec<(String, Body)>>,
    undeletable: HashSet<String>,
    list_error: Option<String>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, web_path: &str, content: Vec<u8>) -> Self {
        self.with_body(web_path, Body::Complete(content))
    }

    pub fn with_truncated_file(self, web_path: &str, partial: Vec<u8>) -> Self {
        self.with_body(web_path, Body::Truncated(partial))
    }

    pub fn with_unavailable_file(self, web_path: &str, status: u16) -> Self {
        self.with_body(web_path, Body::Unavailable(status))
    }

    /// Make deletes of `web_path` fail with HTTP 500.
    pub fn undeletable(mut self, web_path: &str) -> Self {
        self.undeletable.insert(web_path.to_owned());
        self
    }

    /// Make `list` fail as if the listing body were malformed.
    pub fn failing_list(mut self, reason: &str) -> Self {
        self.list_error = Some(reason.to_owned());
        self
    }

    fn with_body(self, web_path: &str, body: Body) -> Self {
        self.files
            .lock()
            .unwrap()
            .push((web_path.to_owned(), body));
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Web paths still present, in listing order.
    pub fn remaining(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn url(web_path: &str) -> String {
        format!("memory://{web_path}")
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryRemote {
    fn label(&self) -> &str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<RemoteFileRef>, RemoteError> {
        self.record(RemoteCall::List);

        if let Some(reason) = &self.list_error {
            return Err(RemoteError::Parse(reason.clone()));
        }

        Ok(self
            .remaining()
            .into_iter()
            .map(RemoteFileRef::new)
            .collect())
    }

    async fn fetch(&self, web_path: &str) -> Result<ByteStream, RemoteError> {
        self.record(RemoteCall::Fetch(web_path.to_owned()));

        let body = self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|(path, _)| path == web_path)
            .map(|(_, body)| body.clone());

        let chunks: Vec<Result<Bytes, RemoteError>> = match body {
            None => {
                return Err(RemoteError::Status {
                    status: 404,
                    url: Self::url(web_path),
                });
            }
            Some(Body::Unavailable(status)) => {
                return Err(RemoteError::Status {
                    status,
                    url: Self::url(web_path),
                });
            }
            Some(Body::Complete(content)) => vec![Ok(Bytes::from(content))],
            Some(Body::Truncated(partial)) => vec![
                Ok(Bytes::from(partial)),
                Err(RemoteError::Network("connection reset".into())),
            ],
        };

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete(&self, web_path: &str) -> Result<(), RemoteError> {
        self.record(RemoteCall::Delete(web_path.to_owned()));

        if self.undeletable.contains(web_path) {
            return Err(RemoteError::Status {
                status: 500,
                url: Self::url(web_path),
            });
        }

        let mut files = self.files.lock().unwrap();
        match files.iter().position(|(path, _)| path == web_path) {
            Some(idx) => {
                files.remove(idx);
                Ok(())
            }
            None => Err(RemoteError::Status {
                status: 404,
                url: Self::url(web_path),
            }),
        }
    }
}

/// A report as the [`RecordingReporter`] received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedReport {
    pub downloaded: Vec<String>,
    pub errors: Vec<String>,
}

/// Reporter that keeps every outcome it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<RecordedReport>>,
    failure: Option<String>,
    watched_lock: Option<PathBuf>,
    lock_seen: Mutex<Option<bool>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter whose deliveries are rejected with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_owned()),
            ..Self::default()
        }
    }

    /// Note whether `lock_path` exists at the moment a report is sent.
    pub fn observing_lock(mut self, lock_path: PathBuf) -> Self {
        self.watched_lock = Some(lock_path);
        self
    }

    pub fn reports(&self) -> Vec<RecordedReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn lock_seen_during_send(&self) -> Option<bool> {
        *self.lock_seen.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Reporter for RecordingReporter {
    async fn send(&self, outcome: &SyncOutcome) -> Result<(), ReportError> {
        if let Some(path) = &self.watched_lock {
            *self.lock_seen.lock().unwrap() = Some(path.exists());
        }

        self.reports.lock().unwrap().push(RecordedReport {
            downloaded: outcome.downloaded().to_vec(),
            errors: outcome.errors().iter().map(|e| e.to_string()).collect(),
        });

        match &self.failure {
            Some(reason) => Err(ReportError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}
