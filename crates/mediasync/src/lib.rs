pub mod download;
pub mod lock;
pub mod mapping;
pub mod outcome;
pub mod pipeline;
pub mod remote;
pub mod report;

pub use download::{DownloadError, download};
pub use lock::{LockError, ProcessLock};
pub use mapping::{NotFound, PathMapping, resolve};
pub use outcome::{SyncError, SyncOutcome};
pub use pipeline::{RunError, RunSummary, run};
pub use remote::{ByteStream, RemoteError, RemoteFileRef, RemoteStore};
pub use report::{ReportError, Reporter};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
