use crate::helpers::spawn_app;
use serde_json::{json, Value};

#[tokio::test]
async fn bulk_create_reports_partial_failure() {
    let app = spawn_app().await;

    let body = json!({
        "urls": [
            { "originalUrl": "https://example.com/bulk/one", "fetchMetadata": false, "enableAiAnalysis": false },
            { "originalUrl": "not a url", "fetchMetadata": false, "enableAiAnalysis": false },
            { "originalUrl": "https://example.com/bulk/two", "fetchMetadata": false, "enableAiAnalysis": false },
        ],
        "fetchMetadata": false,
        "enableAiAnalysis": false,
    });

    let response = app
        .client
        .post(app.url("/api/urls/bulk"))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute bulk create request");

    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let body: Value = response.json().await.expect("response was not valid JSON");
    assert_eq!(body["data"]["successCount"], 2);
    assert_eq!(body["data"]["failedCount"], 1);

    let errors = body["data"]["errors"].as_array().expect("errors was not an array");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["index"], 1);
    assert_eq!(errors[0]["originalUrl"], "not a url");
}

#[tokio::test]
async fn bulk_create_from_csv_skips_the_header_row() {
    let app = spawn_app().await;

    let csv = "url\nhttps://example.com/csv/one\nhttps://example.com/csv/two\n";
    let part = reqwest::multipart::Part::bytes(csv.as_bytes().to_vec())
        .file_name("urls.csv")
        .mime_str("text/csv")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = app
        .client
        .post(app.url("/api/urls/bulk/csv"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute csv bulk upload request");

    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let body: Value = response.json().await.expect("response was not valid JSON");
    assert_eq!(body["data"]["successCount"], 2);
    assert_eq!(body["data"]["failedCount"], 0);
}
