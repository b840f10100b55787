use crate::helpers::{plain_create_body, spawn_app};
use serde_json::Value;

#[tokio::test]
async fn create_then_redirect_follows_the_original_url() {
    let app = spawn_app().await;

    let response = app.create_url(plain_create_body("https://www.rust-lang.org/")).await;
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let body: Value = response.json().await.expect("response was not valid JSON");
    assert_eq!(body["success"], true);
    let short_key = body["data"]["shortKey"].as_str().unwrap().to_string();
    assert!(short_key.len() >= 6);
    assert_eq!(body["data"]["originalUrl"], "https://www.rust-lang.org/");

    let redirect = app.get_redirect(&short_key).await;
    assert_eq!(redirect.status(), reqwest::StatusCode::FOUND);
    assert_eq!(
        redirect.headers().get("location").unwrap().to_str().unwrap(),
        "https://www.rust-lang.org/"
    );
    assert_eq!(
        redirect.headers().get("x-ratelimit-remaining").unwrap(),
        "99"
    );
}

#[tokio::test]
async fn redirecting_an_unknown_key_is_a_404() {
    let app = spawn_app().await;

    let response = app.get_redirect("doesnotexist").await;

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("response was not valid JSON");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn rejects_a_malformed_url() {
    let app = spawn_app().await;

    let response = app.create_url(plain_create_body("not a url")).await;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn custom_alias_collision_is_rejected() {
    let app = spawn_app().await;

    let mut first = plain_create_body("https://example.com/one");
    first["customAlias"] = "myalias".into();
    let response = app.create_url(first).await;
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let mut second = plain_create_body("https://example.com/two");
    second["customAlias"] = "myalias".into();
    let response = app.create_url(second).await;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("response was not valid JSON");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn listing_recent_urls_includes_a_freshly_created_one() {
    let app = spawn_app().await;
    let short_key = crate::helpers::created_short_key(&app, "https://example.com/listed").await;

    let response = app
        .client
        .get(app.url("/api/urls"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.expect("response was not valid JSON");
    let keys: Vec<String> = body["data"]
        .as_array()
        .expect("data was not an array")
        .iter()
        .map(|entry| entry["shortKey"].as_str().unwrap().to_string())
        .collect();
    assert!(keys.contains(&short_key));
}
