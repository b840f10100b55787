use crate::helpers::spawn_app;

#[tokio::test]
async fn health_check_returns_200() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/health_check"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}
