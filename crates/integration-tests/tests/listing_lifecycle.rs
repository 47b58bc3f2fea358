//! Integration tests for the listing lifecycle and wishlist toggling.
//!
//! These tests require a running API server with its database migrated
//! and a reachable blob store.
//!
//! Run with: cargo test -p unibazaar-integration-tests -- --ignored

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// A 1x1 PNG, enough to exercise the upload path.
const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
    0xCF, 0xC0, 0x00, 0x00, 0x00, 0x03, 0x00, 0x01, 0x73, 0x75, 0x01, 0x18, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

async fn register_and_login(client: &Client) -> String {
    let email = format!("it-{}@test.unibazaar.example", Uuid::new_v4());
    let password = "integration-test-password";

    let resp = client
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request");
    let body: Value = resp.json().await.expect("login body");
    body["access_token"].as_str().expect("token").to_string()
}

fn image_part(name: &str) -> Part {
    Part::bytes(TINY_PNG.to_vec())
        .file_name(name.to_string())
        .mime_str("image/png")
        .expect("mime")
}

/// Create a listing with the given number of images; returns the listing JSON.
async fn create_listing(client: &Client, access: &str, image_count: usize) -> Value {
    let mut form = Form::new()
        .text("title", "Used desk lamp")
        .text("description", "Warm light, minor scratches")
        .text("price", "12.50")
        .text("category", "furniture");
    for i in 0..image_count {
        form = form.part("images", image_part(&format!("photo-{i}.png")));
    }

    let resp = client
        .post(format!("{}/listings", base_url()))
        .bearer_auth(access)
        .multipart(form)
        .send()
        .await
        .expect("create request");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("create body");
    body["listing"].clone()
}

#[tokio::test]
#[ignore = "Requires running API server, database, and blob store"]
async fn test_create_update_keeps_image_order() {
    let http = client();
    let access = register_and_login(&http).await;

    // Create with 2 images.
    let listing = create_listing(&http, &access, 2).await;
    let listing_id = listing["id"].as_i64().expect("listing id");
    let urls: Vec<String> = listing["image_urls"]
        .as_array()
        .expect("image_urls")
        .iter()
        .map(|u| u.as_str().expect("url").to_string())
        .collect();
    assert_eq!(urls.len(), 2);

    // Update keeping the first and adding 2 new ones (total 3).
    let form = Form::new()
        .text("kept_images", urls[0].clone())
        .part("new_images", image_part("extra-0.png"))
        .part("new_images", image_part("extra-1.png"));

    let resp = http
        .patch(format!("{}/listings/{listing_id}", base_url()))
        .bearer_auth(&access)
        .multipart(form)
        .send()
        .await
        .expect("update request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("update body");
    let updated: Vec<String> = body["listing"]["image_urls"]
        .as_array()
        .expect("image_urls")
        .iter()
        .map(|u| u.as_str().expect("url").to_string())
        .collect();

    // Exactly 3 entries: the kept one first, then the two new uploads.
    assert_eq!(updated.len(), 3);
    assert_eq!(updated[0], urls[0]);
    assert!(!updated.contains(&urls[1]));
}

#[tokio::test]
#[ignore = "Requires running API server, database, and blob store"]
async fn test_update_with_foreign_kept_image_rejected() {
    let http = client();
    let access = register_and_login(&http).await;

    let listing = create_listing(&http, &access, 1).await;
    let listing_id = listing["id"].as_i64().expect("listing id");

    let form = Form::new().text(
        "kept_images",
        "https://cdn.unibazaar.example/listings/999/not-yours.png",
    );

    let resp = http
        .patch(format!("{}/listings/{listing_id}", base_url()))
        .bearer_auth(&access)
        .multipart(form)
        .send()
        .await
        .expect("update request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"]["code"].as_str(), Some("invalid_input"));
}

#[tokio::test]
#[ignore = "Requires running API server, database, and blob store"]
async fn test_too_many_images_rejected() {
    let http = client();
    let access = register_and_login(&http).await;

    let mut form = Form::new()
        .text("title", "Overloaded listing")
        .text("price", "1")
        .text("category", "electronics");
    for i in 0..6 {
        form = form.part("images", image_part(&format!("photo-{i}.png")));
    }

    let resp = http
        .post(format!("{}/listings", base_url()))
        .bearer_auth(&access)
        .multipart(form)
        .send()
        .await
        .expect("create request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_invalid_category_rejected() {
    let http = client();
    let access = register_and_login(&http).await;

    let form = Form::new()
        .text("title", "Mystery item")
        .text("price", "1")
        .text("category", "vehicles");

    let resp = http
        .post(format!("{}/listings", base_url()))
        .bearer_auth(&access)
        .multipart(form)
        .send()
        .await
        .expect("create request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_wishlist_toggle_roundtrip() {
    let http = client();
    let seller = register_and_login(&http).await;
    let buyer = register_and_login(&http).await;

    let listing = create_listing(&http, &seller, 0).await;
    let listing_id = listing["id"].as_i64().expect("listing id");

    let toggle = |access: String| {
        let http = http.clone();
        async move {
            let resp = http
                .post(format!("{}/listings/{listing_id}/wishlist", base_url()))
                .bearer_auth(&access)
                .send()
                .await
                .expect("toggle request");
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = resp.json().await.expect("toggle body");
            body["action"].as_str().expect("action").to_string()
        }
    };

    // added, then removed: back to the original state.
    assert_eq!(toggle(buyer.clone()).await, "added");
    assert_eq!(toggle(buyer.clone()).await, "removed");

    let resp = http
        .get(format!("{}/account/wishlist", base_url()))
        .bearer_auth(&buyer)
        .send()
        .await
        .expect("wishlist request");
    let body: Value = resp.json().await.expect("wishlist body");
    assert!(body["listings"].as_array().expect("listings").is_empty());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_wishlist_toggle_on_missing_listing_is_not_found() {
    let http = client();
    let access = register_and_login(&http).await;

    let resp = http
        .post(format!("{}/listings/999999999/wishlist", base_url()))
        .bearer_auth(&access)
        .send()
        .await
        .expect("toggle request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_deleting_anothers_listing_is_not_found() {
    let http = client();
    let seller = register_and_login(&http).await;
    let other = register_and_login(&http).await;

    let listing = create_listing(&http, &seller, 0).await;
    let listing_id = listing["id"].as_i64().expect("listing id");

    let resp = http
        .delete(format!("{}/listings/{listing_id}", base_url()))
        .bearer_auth(&other)
        .send()
        .await
        .expect("delete request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
