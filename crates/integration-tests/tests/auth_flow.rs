//! Integration tests for the authentication flow.
//!
//! These tests require a running API server with its database migrated.
//!
//! Run with: cargo test -p unibazaar-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Create an HTTP client with a cookie store (for the renewal cookie).
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a throwaway account and return its credentials.
async fn register(client: &Client) -> (String, String) {
    let email = format!("it-{}@test.unibazaar.example", Uuid::new_v4());
    let password = "integration-test-password".to_string();

    let resp = client
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), StatusCode::CREATED);

    (email, password)
}

/// Login and return the access token.
async fn login(client: &Client, email: &str, password: &str) -> String {
    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("login body");
    body["access_token"]
        .as_str()
        .expect("access_token in body")
        .to_string()
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_register_login_and_access_protected_route() {
    let client = client();
    let (email, password) = register(&client).await;
    let access = login(&client, &email, &password).await;

    let resp = client
        .get(format!("{}/account", base_url()))
        .bearer_auth(&access)
        .send()
        .await
        .expect("account request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("account body");
    assert_eq!(body["account"]["email"].as_str(), Some(email.as_str()));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_registration_conflicts() {
    let client = client();
    let (email, password) = register(&client).await;

    let resp = client
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("duplicate register request");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"]["code"].as_str(), Some("conflict"));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_invalid_token_is_unauthenticated() {
    let client = client();

    let resp = client
        .get(format!("{}/account", base_url()))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .expect("account request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{}/account", base_url()))
        .send()
        .await
        .expect("account request without token");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_refresh_issues_new_access_token() {
    let client = client();
    let (email, password) = register(&client).await;
    // Login stores the renewal cookie in the client's cookie jar.
    let _ = login(&client, &email, &password).await;

    let resp = client
        .post(format!("{}/auth/refresh", base_url()))
        .send()
        .await
        .expect("refresh request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("refresh body");
    let access = body["access_token"].as_str().expect("fresh access token");

    // The fresh access token works on a protected route without re-login.
    let resp = client
        .get(format!("{}/account", base_url()))
        .bearer_auth(access)
        .send()
        .await
        .expect("account request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_refresh_without_cookie_is_unauthenticated() {
    // Fresh client: no cookie jar contents.
    let resp = client()
        .post(format!("{}/auth/refresh", base_url()))
        .send()
        .await
        .expect("refresh request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_logout_clears_renewal_cookie() {
    let client = client();
    let (email, password) = register(&client).await;
    let _ = login(&client, &email, &password).await;

    let resp = client
        .post(format!("{}/auth/logout", base_url()))
        .send()
        .await
        .expect("logout request");
    assert_eq!(resp.status(), StatusCode::OK);

    // The cookie is gone, so refresh fails.
    let resp = client
        .post(format!("{}/auth/refresh", base_url()))
        .send()
        .await
        .expect("refresh request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
