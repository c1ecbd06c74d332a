use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use stock_user_profile::api::{external_routes, internal_routes};
use stock_user_profile::auth::{create_token, Authenticator};
use stock_user_profile::db::{MemoryUserprofileStore, StoreError, UserprofileStore};
use stock_user_profile::models::{Expectation, Userprofile};
use stock_user_profile::service::UserprofileService;
use warp::http::StatusCode;

const SECRET: &[u8] = b"integration-secret";
const AUDIENCE: &str = "userprofile-api";
const ISSUER: &str = "https://auth.example.com/";
const SCOPE: &str = "userprofile";

struct FailingStore;

#[async_trait]
impl UserprofileStore for FailingStore {
    async fn save(&self, _up: &Userprofile) -> Result<(), StoreError> {
        Err(StoreError::Query("write timeout".to_string()))
    }

    async fn get(&self, _user_id: &str) -> Result<Userprofile, StoreError> {
        Err(StoreError::Query("read timeout".to_string()))
    }
}

fn test_profile(user_id: &str) -> Userprofile {
    Userprofile {
        user_id: user_id.to_string(),
        email: "alic@example.com".to_string(),
        expectations: vec![Expectation {
            stock: "INTC".to_string(),
            expected_raise: Some(5.5),
        }],
        expected_return: Some(9.0),
        default_expectation: Some(9.0),
    }
}

fn authenticator() -> Arc<Authenticator> {
    Arc::new(Authenticator::with_secret(AUDIENCE, ISSUER, SCOPE, SECRET))
}

fn bearer(user_id: &str) -> String {
    format!(
        "Bearer {}",
        create_token(user_id, AUDIENCE, ISSUER, SCOPE, SECRET).unwrap()
    )
}

fn message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["message"].as_str().unwrap().to_string()
}

fn service_with(store: Arc<dyn UserprofileStore>) -> Arc<UserprofileService> {
    Arc::new(UserprofileService::new(store))
}

#[tokio::test]
async fn create_with_matching_identity_stores_profile() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let api = external_routes(service_with(store.clone()), authenticator());
    let profile = test_profile("userId");

    let res = warp::test::request()
        .method("POST")
        .path("/userprofile")
        .header("authorization", bearer("userId"))
        .json(&profile)
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(res.body().is_empty());
    assert_eq!(store.get("userId").await.unwrap(), profile);
}

#[tokio::test]
async fn create_with_other_users_id_is_unauthorized() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let api = external_routes(service_with(store.clone()), authenticator());

    let res = warp::test::request()
        .method("POST")
        .path("/userprofile")
        .header("authorization", bearer("userId"))
        .json(&test_profile("userId2"))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        message(res.body()),
        "UserID in request doesn't match userID in token"
    );
    assert!(store.get("userId2").await.is_err());
}

#[tokio::test]
async fn create_with_malformed_body_is_bad_request() {
    let api = external_routes(
        service_with(Arc::new(MemoryUserprofileStore::new())),
        authenticator(),
    );

    let res = warp::test::request()
        .method("POST")
        .path("/userprofile")
        .header("authorization", bearer("userId"))
        .body(r#"{"userId": "userId", "email": 42"#)
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res.body()), "Failed to deserialize payload.");
}

#[tokio::test]
async fn create_with_missing_field_names_it() {
    let api = external_routes(
        service_with(Arc::new(MemoryUserprofileStore::new())),
        authenticator(),
    );

    let res = warp::test::request()
        .method("POST")
        .path("/userprofile")
        .header("authorization", bearer("userId"))
        .body(r#"{"userId":"userId","email":"alic@example.com","expectations":[],"expectedReturn":9.0}"#)
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        message(res.body()),
        "Field \"defaultExpectation\" is missing"
    );
}

#[tokio::test]
async fn create_store_failure_is_internal_error() {
    let api = external_routes(service_with(Arc::new(FailingStore)), authenticator());

    let res = warp::test::request()
        .method("POST")
        .path("/userprofile")
        .header("authorization", bearer("userId"))
        .json(&test_profile("userId"))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        message(res.body()),
        "Failed to process request: query failed: write timeout"
    );
}

#[tokio::test]
async fn second_create_replaces_expectations() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let api = external_routes(service_with(store.clone()), authenticator());

    let mut first = test_profile("userId");
    first.expectations.push(Expectation {
        stock: "AAPL".to_string(),
        expected_raise: Some(2.0),
    });
    let mut second = test_profile("userId");
    second.expectations = vec![Expectation {
        stock: "MSFT".to_string(),
        expected_raise: Some(7.25),
    }];

    for profile in [&first, &second] {
        let res = warp::test::request()
            .method("POST")
            .path("/userprofile")
            .header("authorization", bearer("userId"))
            .json(profile)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = warp::test::request()
        .path("/userprofile/userId")
        .header("authorization", bearer("userId"))
        .reply(&api)
        .await;
    let stored: Userprofile = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(stored, second);
}

#[tokio::test]
async fn get_own_profile_returns_document() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let profile = test_profile("userId");
    store.save(&profile).await.unwrap();
    let api = external_routes(service_with(store), authenticator());

    let res = warp::test::request()
        .path("/userprofile/userId")
        .header("authorization", bearer("userId"))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["userId"], "userId");
    assert_eq!(body["expectations"][0]["stock"], "INTC");
    assert_eq!(body["defaultExpectation"], 9.0);
    let got: Userprofile = serde_json::from_value(body).unwrap();
    assert_eq!(got, profile);
}

#[tokio::test]
async fn get_other_users_profile_is_unauthorized() {
    let store = Arc::new(MemoryUserprofileStore::new());
    store.save(&test_profile("userId")).await.unwrap();
    let api = external_routes(service_with(store), authenticator());

    let res = warp::test::request()
        .path("/userprofile/userId")
        .header("authorization", bearer("userId2"))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_missing_profile_is_bad_request() {
    let api = external_routes(
        service_with(Arc::new(MemoryUserprofileStore::new())),
        authenticator(),
    );

    let res = warp::test::request()
        .path("/userprofile/userId2")
        .header("authorization", bearer("userId2"))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(message(res.body()).starts_with("Failed to process request: Cannot read userprofile"));
}

#[tokio::test]
async fn request_without_token_is_rejected() {
    let api = external_routes(
        service_with(Arc::new(MemoryUserprofileStore::new())),
        authenticator(),
    );

    let res = warp::test::request()
        .path("/userprofile/userId")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(res.body()), "Missing bearer token");
}

#[tokio::test]
async fn token_without_scope_is_forbidden() {
    let api = external_routes(
        service_with(Arc::new(MemoryUserprofileStore::new())),
        authenticator(),
    );
    let token = create_token("userId", AUDIENCE, ISSUER, "openid", SECRET).unwrap();

    let res = warp::test::request()
        .path("/userprofile/userId")
        .header("authorization", format!("Bearer {}", token))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let api = external_routes(
        service_with(Arc::new(MemoryUserprofileStore::new())),
        authenticator(),
    );

    let res = warp::test::request()
        .path("/portfolio/userId")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn internal_get_trusts_path_id() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let profile = test_profile("userId");
    store.save(&profile).await.unwrap();
    let api = internal_routes(service_with(store));

    let res = warp::test::request()
        .path("/userprofile/userId")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let got: Userprofile = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(got, profile);
}

#[tokio::test]
async fn internal_get_missing_profile_is_bad_request() {
    let api = internal_routes(service_with(Arc::new(MemoryUserprofileStore::new())));

    let res = warp::test::request()
        .path("/userprofile/nobody")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn internal_listener_has_no_create_route() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let api = internal_routes(service_with(store.clone()));

    let res = warp::test::request()
        .method("POST")
        .path("/userprofile")
        .json(&test_profile("userId"))
        .reply(&api)
        .await;

    assert!(res.status().is_client_error());
    assert!(store.get("userId").await.is_err());
}

#[tokio::test]
async fn get_with_percent_encoded_id_matches_token_subject() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let profile = test_profile("auth0|123");
    store.save(&profile).await.unwrap();
    let api = external_routes(service_with(store), authenticator());

    let res = warp::test::request()
        .path("/userprofile/auth0%7C123")
        .header("authorization", bearer("auth0|123"))
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let got: Userprofile = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(got, profile);
}

#[tokio::test]
async fn internal_get_decodes_percent_encoded_id() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let profile = test_profile("auth0|123");
    store.save(&profile).await.unwrap();
    let api = internal_routes(service_with(store));

    let res = warp::test::request()
        .path("/userprofile/auth0%7C123")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let got: Userprofile = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(got, profile);
}

#[tokio::test]
async fn id_that_is_not_utf8_is_not_found() {
    let api = internal_routes(service_with(Arc::new(MemoryUserprofileStore::new())));

    let res = warp::test::request()
        .path("/userprofile/%FF%FE")
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_accepts_null_expectations() {
    let store = Arc::new(MemoryUserprofileStore::new());
    let api = external_routes(service_with(store.clone()), authenticator());

    let res = warp::test::request()
        .method("POST")
        .path("/userprofile")
        .header("authorization", bearer("userId"))
        .body(r#"{"userId":"userId","email":"alic@example.com","expectations":null,"expectedReturn":9.0,"defaultExpectation":9.0}"#)
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(store.get("userId").await.unwrap().expectations.is_empty());
}

#[tokio::test]
async fn non_utf8_authorization_header_is_unauthorized() {
    let api = external_routes(
        service_with(Arc::new(MemoryUserprofileStore::new())),
        authenticator(),
    );

    let res = warp::test::request()
        .path("/userprofile/userId")
        .header("authorization", &b"Bearer \xff"[..])
        .reply(&api)
        .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
