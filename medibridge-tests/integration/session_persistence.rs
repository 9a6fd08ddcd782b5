//! Session lifecycle across process restarts: login, cached catalogue,
//! logout and reuse of the stored token for lookups.

use medibridge_core::{DrugRecord, Role, SessionError, SessionStore};
use medibridge_search::{DrugLookup, LocalProvider};

use crate::mock_api::{MOBILE, MockApi, PASSWORD, TOKEN};

#[tokio::test]
async fn test_login_survives_restart_and_authorizes_lookups() {
    let api = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("state").join("session.json"));

    let mut session = store.load().await.unwrap();
    assert!(!session.is_signed_in());
    let response = api.client().login(MOBILE, PASSWORD).await.unwrap();
    session.sign_in(response.token, response.role, MOBILE.to_string());
    store.save(&session).await.unwrap();

    let restored = store.load().await.unwrap();
    assert_eq!(restored, session);
    assert_eq!(restored.token(), Some(TOKEN));
    assert_eq!(restored.role, Some(Role::Clinic));

    let lookup = DrugLookup::remote(api.client(), &restored, &api.config().search);
    assert_eq!(lookup.search("ceti").await.len(), 1);
}

#[tokio::test]
async fn test_logout_keeps_cached_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    let config = medibridge_core::MedibridgeConfig::default();

    let catalogue = LocalProvider::new();
    catalogue
        .import_csv(
            "name,strength\nParacetamol,500 mg\nPantoprazole,40 mg\n",
            &config.import.default_category,
        )
        .unwrap();

    let mut session = store.load().await.unwrap();
    session.sign_in(TOKEN.to_string(), Role::Clinic, MOBILE.to_string());
    session.cached_drugs = catalogue.records();
    store.save(&session).await.unwrap();

    session.sign_out();
    store.save(&session).await.unwrap();

    let restored = store.load().await.unwrap();
    assert!(!restored.is_signed_in());
    assert_eq!(restored.cached_drugs.len(), 2);
    assert_eq!(
        restored.cached_drugs[1],
        DrugRecord::new(
            "drug-2",
            "Pantoprazole",
            Some("allopathy".to_string()),
            Some("40 mg".to_string())
        )
    );

    let lookup = DrugLookup::local(
        LocalProvider::from_records(restored.cached_drugs),
        &config.search,
    );
    let names: Vec<_> = lookup
        .search("pa")
        .await
        .into_iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(names, ["Paracetamol", "Pantoprazole"]);
}

#[tokio::test]
async fn test_corrupt_session_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    tokio::fs::write(&path, b"{ not json").await.unwrap();

    let result = SessionStore::new(&path).load().await;

    assert!(matches!(result, Err(SessionError::Corrupt { .. })));
}

#[tokio::test]
async fn test_clear_removes_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    let mut session = store.load().await.unwrap();
    session.sign_in(TOKEN.to_string(), Role::Clinic, MOBILE.to_string());
    store.save(&session).await.unwrap();

    store.clear().await.unwrap();
    store.clear().await.unwrap();

    assert!(!store.load().await.unwrap().is_signed_in());
}
