use mediasync::test_support::RecordingReporter;
use mediasync::{PathMapping, ProcessLock, RunError};
use mediasync_http::{HttpRemote, HttpRemoteConfig};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn lock_path(&self) -> std::path::PathBuf {
        self.dir.path().join("mediasync.lock")
    }

    fn local(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join(rel)
    }

    fn mapping(&self, remote: &str, local_rel: &str) -> PathMapping {
        PathMapping::new(remote, self.local(local_rel).to_string_lossy())
    }
}

fn remote_for(server: &MockServer) -> HttpRemote {
    HttpRemote::new(HttpRemoteConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        username: "mirror".into(),
        password: "s3cret".into(),
    })
}

async fn mount_listing(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/fileinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, web_path: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(web_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(web_path))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn mapped_file_is_mirrored_and_removed() {
    let server = MockServer::start().await;
    let ws = Workspace::new();
    mount_listing(&server, r#"[{"web_path":"/a/b.mp4"}]"#).await;
    mount_file(&server, "/a/b.mp4", b"episode").await;

    let lock = ProcessLock::try_acquire(ws.lock_path()).unwrap();
    let reporter = RecordingReporter::new();
    let mappings = vec![ws.mapping("/a", "data/a")];

    let summary = mediasync::run(lock, &remote_for(&server), &reporter, &mappings)
        .await
        .unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(std::fs::read(ws.local("data/a/b.mp4")).unwrap(), b"episode");
    assert_eq!(reporter.reports()[0].downloaded, vec!["b.mp4"]);
    assert!(!ws.lock_path().exists());
}

#[tokio::test]
async fn unmapped_file_is_reported_alongside_success() {
    let server = MockServer::start().await;
    let ws = Workspace::new();
    mount_listing(
        &server,
        r#"[{"web_path":"/a/b.mp4"},{"web_path":"/elsewhere/c.mp4"}]"#,
    )
    .await;
    mount_file(&server, "/a/b.mp4", b"episode").await;

    let lock = ProcessLock::try_acquire(ws.lock_path()).unwrap();
    let reporter = RecordingReporter::new();
    let mappings = vec![ws.mapping("/a", "data/a")];

    let summary = mediasync::run(lock, &remote_for(&server), &reporter, &mappings)
        .await
        .unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.failed, 1);

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].downloaded, vec!["b.mp4"]);
    assert_eq!(
        reports[0].errors,
        vec!["couldn't find config for remote file: /elsewhere/c.mp4"]
    );

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/elsewhere/c.mp4"));
}

#[tokio::test]
async fn malformed_listing_aborts_before_downloads() {
    let server = MockServer::start().await;
    let ws = Workspace::new();
    mount_listing(&server, r#"{"not":"an array"}"#).await;

    let lock = ProcessLock::try_acquire(ws.lock_path()).unwrap();
    let reporter = RecordingReporter::new();
    let mappings = vec![ws.mapping("/a", "data/a")];

    let err = mediasync::run(lock, &remote_for(&server), &reporter, &mappings)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Listing(_)));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].downloaded.is_empty());
    assert_eq!(reports[0].errors.len(), 1);
    assert!(reports[0].errors[0].starts_with("couldn't get file list:"));
}

#[tokio::test]
async fn failed_transfer_leaves_remote_file_in_place() {
    let server = MockServer::start().await;
    let ws = Workspace::new();
    mount_listing(&server, r#"[{"web_path":"/a/b.mp4"}]"#).await;

    Mock::given(method("GET"))
        .and(path("/a/b.mp4"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/a/b.mp4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let lock = ProcessLock::try_acquire(ws.lock_path()).unwrap();
    let reporter = RecordingReporter::new();
    let mappings = vec![ws.mapping("/a", "data/a")];

    let summary = mediasync::run(lock, &remote_for(&server), &reporter, &mappings)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert!(!ws.local("data/a/b.mp4").exists());
    let leftovers: Vec<_> = std::fs::read_dir(ws.local("data/a")).unwrap().collect();
    assert!(leftovers.is_empty());
}
