use std::path::Path;

use burrow::core::{BurrowError, UpdatePhase, user_friendly_error};
use burrow::test_utils::{
    FixedAnswer, NoAnswer, init_test_logging, release_json, test_orchestrator,
};
use burrow::update::{FileVersionStore, MemoryVersionStore, UpdateReport, VersionStore};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST: &str = "/repos/elaurentium/Burrow/releases/latest";
const ASSET: &str = "/releases/download/v0.5.0/burrow-linux-amd64";

async fn mock_release(server: &MockServer, tag: &str) {
    let asset_url = format!("{}{ASSET}", server.uri());
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(release_json(tag, &[("burrow-linux-amd64", asset_url.as_str())])),
        )
        .mount(server)
        .await;
}

/// Everything in `dir` except the executable itself.
fn stray_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != "burrow" && name != "state.json")
        .collect()
}

#[tokio::test]
async fn test_full_update_replaces_executable_and_cleans_up() {
    init_test_logging(None);
    let server = MockServer::start().await;
    mock_release(&server, "v0.5.0").await;
    Mock::given(method("GET"))
        .and(path(ASSET))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new binary".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let store = FileVersionStore::new(temp.path().join("state.json"));
    let orchestrator = test_orchestrator(&server.uri(), temp.path(), FixedAnswer(true), store.clone())
        .await
        .with_binary_version("v0.4.0");

    let report = orchestrator.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        report,
        UpdateReport::Updated {
            from: "v0.4.0".to_string(),
            to: "v0.5.0".to_string(),
        }
    );
    assert_eq!(tokio::fs::read(orchestrator.executable()).await.unwrap(), b"new binary");
    assert!(stray_files(temp.path()).is_empty(), "left behind: {:?}", stray_files(temp.path()));
    assert_eq!(store.load().await.as_deref(), Some("v0.5.0"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(orchestrator.executable()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[tokio::test]
async fn test_latest_version_touches_nothing() {
    let server = MockServer::start().await;
    mock_release(&server, "v0.4.0").await;
    Mock::given(method("GET"))
        .and(path(ASSET))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let orchestrator =
        test_orchestrator(&server.uri(), temp.path(), FixedAnswer(true), MemoryVersionStore::default())
            .await
            .with_binary_version("v0.4.0");

    let report = orchestrator.run(&CancellationToken::new()).await.unwrap();

    assert!(matches!(report, UpdateReport::UpToDate { .. }));
    assert_eq!(tokio::fs::read(orchestrator.executable()).await.unwrap(), b"old binary");
    assert!(stray_files(temp.path()).is_empty());
}

#[tokio::test]
async fn test_declined_release_is_not_offered_again() {
    let server = MockServer::start().await;
    mock_release(&server, "v0.5.0").await;

    let temp = TempDir::new().unwrap();
    let store = FileVersionStore::new(temp.path().join("state.json"));
    let declining = test_orchestrator(&server.uri(), temp.path(), FixedAnswer(false), store.clone())
        .await
        .with_binary_version("v0.4.0");

    let report = declining.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(
        report,
        UpdateReport::Declined {
            tag: "v0.5.0".to_string()
        }
    );
    assert_eq!(store.load().await.as_deref(), Some("v0.5.0"));
    assert_eq!(tokio::fs::read(declining.executable()).await.unwrap(), b"old binary");

    let accepting = test_orchestrator(&server.uri(), temp.path(), FixedAnswer(true), store)
        .await
        .with_binary_version("v0.4.0");
    let check = accepting.check().await.unwrap();
    assert!(!check.update_available);
}

#[tokio::test]
async fn test_unattended_run_keeps_offering_release() {
    let server = MockServer::start().await;
    mock_release(&server, "v0.5.0").await;

    let temp = TempDir::new().unwrap();
    let store = FileVersionStore::new(temp.path().join("state.json"));
    let unattended = test_orchestrator(&server.uri(), temp.path(), NoAnswer, store.clone())
        .await
        .with_binary_version("v0.4.0");

    let report = unattended.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(
        report,
        UpdateReport::Unanswered {
            tag: "v0.5.0".to_string()
        }
    );
    assert_eq!(store.load().await, None);
    assert!(unattended.check().await.unwrap().update_available);
    assert_eq!(tokio::fs::read(unattended.executable()).await.unwrap(), b"old binary");
}

#[tokio::test]
async fn test_failed_download_leaves_executable_intact() {
    let server = MockServer::start().await;
    mock_release(&server, "v0.5.0").await;
    Mock::given(method("GET"))
        .and(path(ASSET))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let orchestrator =
        test_orchestrator(&server.uri(), temp.path(), FixedAnswer(true), MemoryVersionStore::default())
            .await
            .with_binary_version("v0.4.0");

    let err = orchestrator.run(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.phase, UpdatePhase::Download);
    assert!(matches!(err.kind(), BurrowError::HttpStatus { status: 404, .. }));
    assert_eq!(tokio::fs::read(orchestrator.executable()).await.unwrap(), b"old binary");
    assert!(stray_files(temp.path()).is_empty());

    let ctx = user_friendly_error(err.into());
    assert!(!ctx.critical);
    assert!(ctx.details.unwrap().contains("download phase"));
}

#[tokio::test]
async fn test_cancelled_update_changes_nothing() {
    let server = MockServer::start().await;
    mock_release(&server, "v0.5.0").await;
    Mock::given(method("GET"))
        .and(path(ASSET))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new binary".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let orchestrator =
        test_orchestrator(&server.uri(), temp.path(), FixedAnswer(true), MemoryVersionStore::default())
            .await
            .with_binary_version("v0.4.0");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = orchestrator.run(&cancel).await.unwrap_err();

    assert_eq!(err.phase, UpdatePhase::Download);
    assert!(matches!(err.kind(), BurrowError::Cancelled { .. }));
    assert_eq!(tokio::fs::read(orchestrator.executable()).await.unwrap(), b"old binary");
    assert!(stray_files(temp.path()).is_empty());
}

#[tokio::test]
async fn test_untagged_release_triggers_update() {
    let server = MockServer::start().await;
    mock_release(&server, "nightly").await;

    let temp = TempDir::new().unwrap();
    let orchestrator =
        test_orchestrator(&server.uri(), temp.path(), FixedAnswer(false), MemoryVersionStore::default())
            .await
            .with_binary_version("v0.4.0");

    let check = orchestrator.check().await.unwrap();
    assert!(check.update_available);
    assert_eq!(check.release.tag, "nightly");
}
