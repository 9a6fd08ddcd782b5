//! Drug lookup against the API: request gating, result shaping and the
//! failure modes that must degrade to an empty list.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use medibridge_core::{Role, Session};
use medibridge_search::{
    DebouncedSearch, DrugLookup, DrugLookupError, DrugSearchProvider, RemoteProvider,
};
use serde_json::json;

use crate::mock_api::{DrugReply, MOBILE, MockApi, TOKEN, drug};

fn signed_in() -> Session {
    let mut session = Session::default();
    session.sign_in(TOKEN.to_string(), Role::Clinic, MOBILE.to_string());
    session
}

fn lookup(api: &MockApi) -> DrugLookup {
    DrugLookup::remote(api.client(), &signed_in(), &api.config().search)
}

#[tokio::test]
async fn test_matches_returned_in_server_order() {
    let api = MockApi::start().await;

    let results = lookup(&api).search("amox").await;

    let names: Vec<_> = results.iter().map(|d| d.name()).collect();
    assert_eq!(names, ["Amoxicillin", "Amoxicillin Clavulanate"]);
    assert_eq!(results[0].id(), "D002");
    assert_eq!(results[0].category(), Some("allopathy"));
    assert_eq!(results[0].strength(), Some("250 mg"));
}

#[tokio::test]
async fn test_short_query_sends_no_request() {
    let api = MockApi::start().await;
    let lookup = lookup(&api);

    assert!(lookup.search("").await.is_empty());
    assert!(lookup.search("a").await.is_empty());
    assert_eq!(api.state.drug_search_hits(), 0);

    lookup.search("am").await;
    assert_eq!(api.state.drug_search_hits(), 1);
}

#[tokio::test]
async fn test_query_is_url_encoded() {
    let api = MockApi::start().await;

    let results = lookup(&api).search("amoxicillin clav").await;

    assert_eq!(results.len(), 1);
    assert_eq!(*api.state.drug_queries.lock(), vec!["amoxicillin clav"]);
}

#[tokio::test]
async fn test_results_capped_at_ten() {
    let catalogue = (1..=14)
        .map(|i| drug(&format!("V{i:02}"), &format!("Vitamin B{i}"), "1 tab"))
        .collect();
    let api = MockApi::with_catalogue(catalogue).await;

    let results = lookup(&api).search("vitamin").await;

    assert_eq!(results.len(), 10);
    assert_eq!(results.first().map(|d| d.id()), Some("V01"));
    assert_eq!(results.last().map(|d| d.id()), Some("V10"));
}

#[tokio::test]
async fn test_server_error_degrades_to_empty() {
    let api = MockApi::start().await;
    api.state
        .reply_with(DrugReply::Status(StatusCode::INTERNAL_SERVER_ERROR));
    let lookup = lookup(&api);

    assert!(lookup.search("para").await.is_empty());
    match lookup.try_search("para").await {
        Err(DrugLookupError::SearchFailed { query, reason }) => {
            assert_eq!(query, "para");
            assert!(reason.contains("500"), "unexpected reason: {reason}");
            assert!(reason.contains("drug search unavailable"));
        }
        other => panic!("expected SearchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_records_degrade_to_empty() {
    let api = MockApi::start().await;
    api.state.reply_with(DrugReply::Body(json!([
        { "id": "D001", "name": "Paracetamol" },
        { "id": "D002", "name": "" },
    ])));
    let lookup = lookup(&api);

    assert!(lookup.search("para").await.is_empty());
    assert!(matches!(
        lookup.try_search("para").await,
        Err(DrugLookupError::ParseError { .. })
    ));
}

#[tokio::test]
async fn test_wrong_shape_degrades_to_empty() {
    let api = MockApi::start().await;
    api.state
        .reply_with(DrugReply::Body(json!({ "drugs": "not a list" })));

    assert!(matches!(
        lookup(&api).try_search("para").await,
        Err(DrugLookupError::ParseError { .. })
    ));
}

#[tokio::test]
async fn test_null_body_is_no_matches() {
    let api = MockApi::start().await;
    api.state.reply_with(DrugReply::Body(serde_json::Value::Null));

    let results = lookup(&api).try_search("para").await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let api = MockApi::start().await;
    let lookup = DrugLookup::remote(api.client(), &Session::default(), &api.config().search);

    assert!(lookup.search("para").await.is_empty());
    assert!(matches!(
        lookup.try_search("para").await,
        Err(DrugLookupError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_catalogue_size_counts_all_drugs() {
    let api = MockApi::start().await;
    let provider = RemoteProvider::with_token(api.client(), Some(TOKEN.to_string()));

    assert_eq!(provider.catalog_size().await.unwrap(), 5);
}

#[tokio::test]
async fn test_debounced_typing_issues_one_request() {
    let api = MockApi::start().await;
    let search = DebouncedSearch::new(Arc::new(lookup(&api)), Duration::from_millis(100));

    for query in ["p", "pa", "par", "para"] {
        search.submit(query);
    }
    let snapshot = search.settled().await;

    assert_eq!(snapshot.query, "para");
    let names: Vec<_> = snapshot.results.iter().map(|d| d.name()).collect();
    assert_eq!(names, ["Paracetamol", "Paracetamol Syrup"]);
    assert_eq!(*api.state.drug_queries.lock(), vec!["para"]);
}
