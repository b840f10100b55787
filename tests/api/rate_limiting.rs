use crate::helpers::{created_short_key, spawn_app};

#[tokio::test]
async fn the_101st_redirect_in_a_window_is_throttled() {
    let app = spawn_app().await;
    let short_key = created_short_key(&app, "https://example.com/hot").await;

    let mut last_status = reqwest::StatusCode::OK;
    for _ in 0..100 {
        last_status = app.get_redirect(&short_key).await.status();
    }
    assert_eq!(last_status, reqwest::StatusCode::FOUND);

    let throttled = app.get_redirect(&short_key).await;
    assert_eq!(throttled.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
    assert!(throttled.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn api_creation_endpoints_are_not_rate_limited() {
    let app = spawn_app().await;

    for n in 0..5 {
        let body = crate::helpers::plain_create_body(&format!("https://example.com/burst/{n}"));
        let response = app.create_url(body).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    }
}
