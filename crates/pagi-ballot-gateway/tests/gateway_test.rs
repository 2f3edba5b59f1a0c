//! Gateway endpoints driven through the core session client.

use pagi_ballot_core::headless::RecordingNotifier;
use pagi_ballot_core::session::{
    BootstrapOutcome, HttpAuthApi, RegistrationRequest, SessionBootstrapper, SessionStore,
    UserPatch,
};
use pagi_ballot_core::storage::{KeyValueStore, MemoryStore, AUTH_TOKEN_KEY};
use pagi_ballot_core::{SessionError, SECURITY_VIOLATION_ROUTE};
use pagi_ballot_gateway::{AppState, VoterRegistry, DEMO_EPIC_ID, DEMO_OTP};
use std::sync::Arc;

async fn spawn_gateway() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState {
        registry: VoterRegistry::seeded(DEMO_OTP),
    });
    tokio::spawn(async move {
        pagi_ballot_gateway::serve(listener, state).await.unwrap();
    });
    format!("http://{}", addr)
}

fn session(base_url: &str) -> (Arc<SessionStore>, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(HttpAuthApi::with_client(reqwest::Client::new(), base_url));
    let store = Arc::new(SessionStore::new(
        api,
        storage.clone(),
        Arc::new(RecordingNotifier::new()),
    ));
    (store, storage)
}

#[tokio::test]
async fn health_and_violation_page_are_served() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    let page = client
        .get(format!("{}{}", base, SECURITY_VIOLATION_ROUTE))
        .send()
        .await
        .unwrap();
    assert!(page.status().is_success());
    assert!(page.text().await.unwrap().contains("Security violation detected"));
}

#[tokio::test]
async fn demo_voter_logs_in_and_session_survives_reload() {
    let base = spawn_gateway().await;
    let (store, storage) = session(&base);

    let user = store.login(DEMO_EPIC_ID, DEMO_OTP).await.unwrap();
    assert_eq!(user.epic_id, DEMO_EPIC_ID);

    // Fresh store over the same storage: bootstrap verifies the persisted token.
    let api = Arc::new(HttpAuthApi::with_client(reqwest::Client::new(), &base));
    let reloaded = Arc::new(SessionStore::new(
        api,
        storage.clone(),
        Arc::new(RecordingNotifier::new()),
    ));
    let outcome = SessionBootstrapper::new(reloaded.clone()).run().await;
    assert!(matches!(outcome, BootstrapOutcome::Restored(ref u) if u.id == user.id));
    assert!(reloaded.state().is_authenticated());
}

#[tokio::test]
async fn wrong_otp_and_unknown_voter_are_rejected() {
    let base = spawn_gateway().await;
    let (store, storage) = session(&base);

    let err = store.login(DEMO_EPIC_ID, "000000").await.unwrap_err();
    assert_eq!(err, SessionError::Rejected("Invalid OTP".into()));

    let err = store.login("ZZZ9999999", DEMO_OTP).await.unwrap_err();
    assert_eq!(err, SessionError::Rejected("Voter not found".into()));
    assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn register_then_login_then_update_profile() {
    let base = spawn_gateway().await;
    let (store, _) = session(&base);
    let request = RegistrationRequest {
        voter_epic_id: "KAR0001234".into(),
        name: "Asha Rao".into(),
        phone: "9123456780".into(),
        email: Some("asha@example.org".into()),
        constituency: "Bengaluru South".into(),
        state: "Karnataka".into(),
    };

    store.register(&request).await.unwrap();
    assert!(!store.state().is_authenticated());

    let err = store.register(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "Voter already registered");

    let user = store.login("KAR0001234", DEMO_OTP).await.unwrap();
    assert!(user.is_verified);

    let updated = store
        .update_profile(&UserPatch {
            name: Some("  Asha R. ".into()),
            has_voted: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.name, "Asha R.");
    assert!(!updated.has_voted);
    assert_eq!(store.state().user().unwrap().name, "Asha R.");
}

#[tokio::test]
async fn verify_rejects_unknown_token() {
    let base = spawn_gateway().await;
    let (store, storage) = session(&base);
    storage.set(AUTH_TOKEN_KEY, "not-a-session").unwrap();

    let outcome = SessionBootstrapper::new(store.clone()).run().await;

    assert_eq!(outcome, BootstrapOutcome::Discarded);
    assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), None);
}
