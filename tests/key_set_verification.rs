//! Key-set fetching and verification against a wiremock IdP: caching,
//! bounded retry, rotation recovery, and the unknown-kid scenario.

mod common;

use std::sync::Arc;
use std::time::SystemTime;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::MockIdp;
use idp_signin::{AuthFlowError, IdentityTokenVerifier, KeySetFetcher};

fn verifier_for(idp: &MockIdp) -> (IdentityTokenVerifier, Arc<KeySetFetcher>) {
    let fetcher = Arc::new(
        KeySetFetcher::new(format!("{}/auth/keys", idp.server.uri())).unwrap(),
    );
    let verifier = IdentityTokenVerifier::new(&idp.provider(), Arc::clone(&fetcher));
    (verifier, fetcher)
}

#[tokio::test]
async fn unknown_kid_fails_until_the_key_is_published() {
    let idp = MockIdp::start().await;
    // Key set without the signing key.
    idp.mock_keys_document(json!({ "keys": [] })).await;

    let (verifier, _) = verifier_for(&idp);
    let id_token = idp.sign_id_token("001234.abcd", "user@example.com");

    let err = verifier
        .verify(&id_token, SystemTime::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::Verification { .. }));

    // The IdP rotates the key in. The refresh path must pick it up even
    // though the empty set is still cached.
    idp.server.reset().await;
    idp.mock_keys().await;

    let claims = verifier
        .verify_with_refresh(&id_token, SystemTime::now())
        .await
        .unwrap();
    assert_eq!(claims.sub, "001234.abcd");
}

#[tokio::test]
async fn key_set_is_served_from_cache_within_ttl() {
    let idp = MockIdp::start().await;
    idp.mock_keys().await;

    let (_, fetcher) = verifier_for(&idp);
    fetcher.fetch().await.unwrap();
    fetcher.fetch().await.unwrap();
    fetcher.fetch().await.unwrap();

    let requests = idp.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "fresh cache must not refetch");
}

#[tokio::test]
async fn fetch_retries_are_bounded() {
    let idp = MockIdp::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/keys"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&idp.server)
        .await;

    let (_, fetcher) = verifier_for(&idp);
    let err = fetcher.fetch().await.unwrap_err();
    assert!(matches!(err, AuthFlowError::Transient { .. }));
    assert!(err.is_retryable());

    let requests = idp.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3, "exactly three bounded attempts");
}

#[tokio::test]
async fn fetch_failures_are_never_cached() {
    let idp = MockIdp::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/keys"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&idp.server)
        .await;

    let (_, fetcher) = verifier_for(&idp);
    assert!(fetcher.fetch().await.is_err());

    // Endpoint recovers; the next fetch must go to the network, not to a
    // cached failure.
    idp.server.reset().await;
    idp.mock_keys().await;
    let keys = fetcher.fetch().await.unwrap();
    assert_eq!(keys.keys.len(), 1);
}

#[tokio::test]
async fn unparseable_key_set_is_transient() {
    let idp = MockIdp::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/keys"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&idp.server)
        .await;

    let (_, fetcher) = verifier_for(&idp);
    let err = fetcher.fetch().await.unwrap_err();
    assert!(matches!(err, AuthFlowError::Transient { .. }));
}
