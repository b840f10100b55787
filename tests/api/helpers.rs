// tests/api/helpers.rs

use linkshort_lib::configuration::get_configuration;
use linkshort_lib::startup::Application;
use reqwest::redirect::Policy;
use serde_json::{json, Value};
use std::sync::LazyLock;

static TRACING: LazyLock<()> = LazyLock::new(|| {
    // Deliberately not wired to a real subscriber: tests don't assert on
    // logs, and initializing one twice across test binaries would panic.
});

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

/// Spins up the full application against an isolated in-memory SQLite
/// database on a random port, mirroring the teacher's `spawn_app()`.
pub async fn spawn_app() -> TestApp {
    LazyLock::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration");
        c.application.port = 0;
        c.application.host = "127.0.0.1".to_string();
        c.application.base_url = "http://127.0.0.1".to_string();
        c.database.url = ":memory:".to_string();
        c.database.create_if_missing = true;
        c.geoip.database_path = None;
        c
    };

    let application = Application::build(configuration)
        .await
        .expect("Failed to build application");
    let port = application.port();

    tokio::spawn(application.run_until_stopped());

    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("Failed to build reqwest client");

    TestApp {
        address: format!("http://127.0.0.1:{port}"),
        client,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_url(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/urls"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute create request")
    }

    pub async fn get_redirect(&self, key: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/{key}")))
            .send()
            .await
            .expect("Failed to execute redirect request")
    }

    pub async fn get_redirect_with_password(&self, key: &str, password: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/{key}?password={password}")))
            .send()
            .await
            .expect("Failed to execute redirect request")
    }
}

/// A minimal valid creation body with enrichment disabled, so end-to-end
/// tests don't depend on outbound network access.
pub fn plain_create_body(original_url: &str) -> Value {
    json!({
        "originalUrl": original_url,
        "fetchMetadata": false,
        "enableAiAnalysis": false,
    })
}

pub async fn created_short_key(app: &TestApp, original_url: &str) -> String {
    let response = app.create_url(plain_create_body(original_url)).await;
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let body: Value = response.json().await.expect("response was not valid JSON");
    body["data"]["shortKey"]
        .as_str()
        .expect("response carried no shortKey")
        .to_string()
}
