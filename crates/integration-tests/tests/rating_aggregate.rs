//! Integration tests for rating aggregate consistency.
//!
//! These tests require a running API server with its database migrated.
//!
//! Run with: cargo test -p unibazaar-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a throwaway account, returning `(account_id, access_token)`.
async fn register_and_login(client: &Client) -> (i64, String) {
    let email = format!("it-{}@test.unibazaar.example", Uuid::new_v4());
    let password = "integration-test-password";

    let resp = client
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("register body");
    let account_id = body["account"]["id"].as_i64().expect("account id");

    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request");
    let body: Value = resp.json().await.expect("login body");
    let access = body["access_token"].as_str().expect("access token");

    (account_id, access.to_string())
}

/// Fetch a seller's stored aggregate from the public ratings endpoint.
async fn aggregate(client: &Client, seller_id: i64) -> (f64, i64) {
    let resp = client
        .get(format!("{}/sellers/{seller_id}/ratings", base_url()))
        .send()
        .await
        .expect("ratings request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("ratings body");

    (
        body["average_rating"].as_f64().expect("average"),
        body["rating_count"].as_i64().expect("count"),
    )
}

/// Submit a rating, returning the response.
async fn rate(client: &Client, access: &str, seller_id: i64, score: i16) -> reqwest::Response {
    client
        .post(format!("{}/ratings", base_url()))
        .bearer_auth(access)
        .json(&json!({
            "seller_id": seller_id,
            "score": score,
            "comment": "integration test rating",
        }))
        .send()
        .await
        .expect("rating request")
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_aggregate_follows_create_and_delete() {
    let http = client();
    let (seller_id, _) = register_and_login(&http).await;
    let (_, rater_a) = register_and_login(&http).await;
    let (_, rater_b) = register_and_login(&http).await;

    // Seller starts with no ratings.
    assert_eq!(aggregate(&http, seller_id).await, (0.0, 0));

    // Rater A submits score 5 -> (5.0, 1).
    let resp = rate(&http, &rater_a, seller_id, 5).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("rating body");
    let rating_a = body["rating"]["id"].as_i64().expect("rating id");
    assert_eq!(aggregate(&http, seller_id).await, (5.0, 1));

    // Rater B submits score 3 -> (4.0, 2).
    let resp = rate(&http, &rater_b, seller_id, 3).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(aggregate(&http, seller_id).await, (4.0, 2));

    // A deletes their rating -> (3.0, 1).
    let resp = http
        .delete(format!("{}/ratings/{rating_a}", base_url()))
        .bearer_auth(&rater_a)
        .send()
        .await
        .expect("delete request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(aggregate(&http, seller_id).await, (3.0, 1));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_deleting_last_rating_resets_aggregate_to_zero() {
    let http = client();
    let (seller_id, _) = register_and_login(&http).await;
    let (_, rater) = register_and_login(&http).await;

    let resp = rate(&http, &rater, seller_id, 4).await;
    let body: Value = resp.json().await.expect("rating body");
    let rating_id = body["rating"]["id"].as_i64().expect("rating id");

    let resp = http
        .delete(format!("{}/ratings/{rating_id}", base_url()))
        .bearer_auth(&rater)
        .send()
        .await
        .expect("delete request");
    assert_eq!(resp.status(), StatusCode::OK);

    // Exactly (0, 0), never NaN or an error.
    assert_eq!(aggregate(&http, seller_id).await, (0.0, 0));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_rating_conflicts_and_leaves_aggregate_unchanged() {
    let http = client();
    let (seller_id, _) = register_and_login(&http).await;
    let (_, rater) = register_and_login(&http).await;

    let resp = rate(&http, &rater, seller_id, 5).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = rate(&http, &rater, seller_id, 1).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    assert_eq!(aggregate(&http, seller_id).await, (5.0, 1));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_self_rating_rejected() {
    let http = client();
    let (account_id, access) = register_and_login(&http).await;

    let resp = rate(&http, &access, account_id, 5).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_concurrent_raters_lose_no_updates() {
    const RATERS: usize = 8;

    let http = client();
    let (seller_id, _) = register_and_login(&http).await;

    let mut tokens = Vec::with_capacity(RATERS);
    for _ in 0..RATERS {
        let (_, access) = register_and_login(&http).await;
        tokens.push(access);
    }

    // All raters submit score 4 at once; every insert recomputes from the
    // rating rows under the seller's row lock, so no update may be lost.
    let mut handles = Vec::with_capacity(RATERS);
    for access in tokens {
        let http = http.clone();
        handles.push(tokio::spawn(async move {
            let resp = rate(&http, &access, seller_id, 4).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }));
    }
    for handle in handles {
        handle.await.expect("rater task");
    }

    let (average, count) = aggregate(&http, seller_id).await;
    assert_eq!(count, i64::try_from(RATERS).expect("count fits"));
    assert!((average - 4.0).abs() < f64::EPSILON);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_profile_update_leaves_aggregate_untouched() {
    let http = client();
    let (seller_id, seller_access) = register_and_login(&http).await;
    let (_, rater) = register_and_login(&http).await;

    let resp = rate(&http, &rater, seller_id, 5).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(aggregate(&http, seller_id).await, (5.0, 1));

    let resp = http
        .patch(format!("{}/account", base_url()))
        .bearer_auth(&seller_access)
        .json(&json!({ "name": "Renamed Seller", "bio": "new bio" }))
        .send()
        .await
        .expect("profile update request");
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(aggregate(&http, seller_id).await, (5.0, 1));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_updating_anothers_rating_is_forbidden() {
    let http = client();
    let (seller_id, _) = register_and_login(&http).await;
    let (_, rater) = register_and_login(&http).await;
    let (_, other) = register_and_login(&http).await;

    let resp = rate(&http, &rater, seller_id, 5).await;
    let body: Value = resp.json().await.expect("rating body");
    let rating_id = body["rating"]["id"].as_i64().expect("rating id");

    let resp = http
        .patch(format!("{}/ratings/{rating_id}", base_url()))
        .bearer_auth(&other)
        .json(&json!({ "score": 1, "comment": "hijack attempt" }))
        .send()
        .await
        .expect("update request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
