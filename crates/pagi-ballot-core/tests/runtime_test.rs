//! BallotRuntime assembled from configuration: sled on disk, reqwest against a stub API.

use axum::{http::HeaderMap, http::StatusCode, routing::get, Json, Router};
use pagi_ballot_core::capabilities::{EventDisposition, PageEvent};
use pagi_ballot_core::headless::{HeadlessConsole, HeadlessEvents, HeadlessOverlay, HeadlessPage};
use pagi_ballot_core::runtime::{BallotRuntime, PageSurfaces};
use pagi_ballot_core::storage::{KeyValueStore, AUTH_TOKEN_KEY};
use pagi_ballot_core::{BallotConfig, BootstrapOutcome, ViolationKind};
use serde_json::json;
use std::sync::Arc;

async fn verify_stub() -> String {
    let app = Router::new().route(
        "/api/auth/verify",
        get(|headers: HeaderMap| async move {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer tok-disk");
            if !authorized {
                return Err(StatusCode::UNAUTHORIZED);
            }
            Ok(Json(json!({
                "user": {
                    "id": "v-1",
                    "epicId": "ABC1234567",
                    "name": "Asha Rao",
                    "phone": "9876543210",
                    "constituency": "Bengaluru South",
                    "state": "Karnataka",
                    "isVerified": true,
                    "hasVoted": false
                }
            })))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config_in(dir: &tempfile::TempDir, api_base_url: &str) -> BallotConfig {
    let mut config = BallotConfig::default();
    config.storage.path = dir.path().join("store").to_string_lossy().into_owned();
    config.auth.api_base_url = api_base_url.to_string();
    config
}

fn surfaces(hostname: &str, path: &str) -> (PageSurfaces, Arc<HeadlessEvents>) {
    let events = Arc::new(HeadlessEvents::new());
    let surfaces = PageSurfaces {
        page: Arc::new(HeadlessPage::new(hostname, path)),
        events: events.clone(),
        console: Arc::new(HeadlessConsole::new()),
        overlay: Arc::new(HeadlessOverlay::new()),
    };
    (surfaces, events)
}

#[tokio::test]
async fn restore_verifies_token_persisted_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = verify_stub().await;
    let runtime = BallotRuntime::from_config(config_in(&dir, &base_url)).unwrap();

    runtime.storage().set(AUTH_TOKEN_KEY, "tok-disk").unwrap();
    let admin = runtime
        .admin()
        .login("admin@pagi.vote", "ballot-admin", "123456")
        .unwrap();

    let restored = runtime.restore().await;

    match restored.voter {
        BootstrapOutcome::Restored(user) => assert_eq!(user.id, "v-1"),
        other => panic!("expected a restored voter, got {:?}", other),
    }
    assert_eq!(restored.admin, Some(admin));
    assert!(runtime.session().state().is_authenticated());
    runtime.shutdown().unwrap();
}

#[tokio::test]
async fn rejected_token_is_removed_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = verify_stub().await;
    let runtime = BallotRuntime::from_config(config_in(&dir, &base_url)).unwrap();

    runtime.storage().set(AUTH_TOKEN_KEY, "tok-stale").unwrap();
    let restored = runtime.restore().await;

    assert_eq!(restored.voter, BootstrapOutcome::Discarded);
    assert_eq!(restored.admin, None);
    assert_eq!(runtime.storage().get(AUTH_TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn monitor_arms_only_in_protected_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = BallotRuntime::from_config(config_in(&dir, "http://127.0.0.1:9")).unwrap();

    let (local, local_events) = surfaces("localhost", "/vote");
    assert!(runtime.arm_monitor(local).is_none());
    assert_eq!(local_events.listener_count(), 0);

    let (production, events) = surfaces("vote.pagi.in", "/news");
    let monitor = runtime.arm_monitor(production).unwrap();
    assert_eq!(
        events.dispatch(&PageEvent::ContextMenu),
        EventDisposition::PreventDefault
    );

    let kinds: Vec<ViolationKind> = runtime
        .violation_log()
        .entries()
        .unwrap()
        .iter()
        .map(|v| v.kind)
        .collect();
    assert_eq!(kinds, vec![ViolationKind::ContextMenu]);
    monitor.disarm();
}

#[test]
fn invalid_storage_path_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let mut config = BallotConfig::default();
    config.storage.path = blocker.join("store").to_string_lossy().into_owned();

    assert!(BallotRuntime::from_config(config).is_err());
}

#[tokio::test]
async fn load_reads_the_file_named_by_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("from-file").to_string_lossy().replace('\\', "/");
    let file = dir.path().join("ballot.toml");
    std::fs::write(
        &file,
        format!(
            "[auth]\napi_base_url = \"http://127.0.0.1:9\"\nrequest_timeout_ms = 2500\n\n\
             [storage]\npath = '{}'\n\n[monitor]\nsize_threshold_px = 200\n",
            store_path
        ),
    )
    .unwrap();

    // Only this test in the binary touches the environment.
    std::env::set_var("PAGI_BALLOT_CONFIG", &file);
    let runtime = BallotRuntime::load().unwrap();
    std::env::remove_var("PAGI_BALLOT_CONFIG");

    assert_eq!(runtime.config().storage.path, store_path);
    assert_eq!(runtime.config().monitor.size_threshold_px, 200);
    assert_eq!(
        runtime.config().auth.request_timeout(),
        std::time::Duration::from_millis(2_500)
    );
    assert!(dir.path().join("from-file").exists());
}
