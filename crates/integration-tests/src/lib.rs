//! Integration tests for Bocado.
//!
//! # Running Tests
//!
//! ```bash
//! # Apply migrations and start the server
//! cargo run -p bocado-cli -- migrate
//! cargo run -p bocado-server
//!
//! # Run the HTTP tests against it
//! cargo test -p bocado-integration-tests -- --ignored
//! ```
//!
//! Tests that talk to the server are `#[ignore]`d so a plain `cargo test`
//! only runs the offline checks.
//!
//! # Environment Variables
//!
//! - `BOCADO_TEST_URL` - Server under test (default: `http://localhost:3000`)

#![allow(clippy::missing_panics_doc)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("BOCADO_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Absolute URL for an API path such as `/api/flags`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// Client that keeps the session cookie between requests.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// An address no other test run will use.
#[must_use]
pub fn unique_email() -> String {
    format!("test+{}@bocado.test", Uuid::new_v4().simple())
}

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "aguacate123";

/// Registration body: account fields plus a few wizard answers.
#[must_use]
pub fn registration_form(email: &str) -> Value {
    json!({
        "name": "Ana Prueba",
        "email": email,
        "password": TEST_PASSWORD,
        "confirmPassword": TEST_PASSWORD,
        "language": "es",
        "firstName": "Ana",
        "city": "Sevilla",
        "allergies": ["gluten"],
        "nutritionalGoal": "not-a-list",
    })
}

/// Register a fresh account on `client` and return the `user` object.
pub async fn register(client: &Client) -> Value {
    let email = unique_email();
    let resp = client
        .post(url("/api/auth/register"))
        .json(&registration_form(&email))
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Invalid register response");
    body["user"].clone()
}

/// Signed-in client plus the id of its user.
pub async fn signed_in() -> (Client, String) {
    let client = client();
    let user = register(&client).await;
    let id = user["id"].as_str().expect("user id").to_owned();
    (client, id)
}
