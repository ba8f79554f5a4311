//! Saved items and recommendation requests against a running server.

use bocado_integration_tests::{signed_in, url};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_saving_same_title_overwrites() {
    let (client, user_id) = signed_in().await;

    let first: Value = client
        .post(url("/api/saved"))
        .json(&json!({"type": "recipe", "title": "Tortilla de Patatas", "data": {"minutes": 30}}))
        .send()
        .await
        .expect("Failed to save")
        .json()
        .await
        .expect("Invalid saved response");
    assert_eq!(first["id"], format!("{user_id}_tortilla-de-patatas"));

    let second: Value = client
        .post(url("/api/saved"))
        .json(&json!({"type": "recipe", "title": "  tortilla de   patatas!", "data": {"minutes": 25}}))
        .send()
        .await
        .expect("Failed to save")
        .json()
        .await
        .expect("Invalid saved response");
    assert_eq!(second["id"], first["id"]);

    let items: Vec<Value> = client
        .get(url("/api/saved?type=recipe"))
        .send()
        .await
        .expect("Failed to list saved")
        .json()
        .await
        .expect("Invalid saved list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["data"]["minutes"], 25);

    let resp = client
        .delete(url(&format!("/api/saved/{}", first["id"].as_str().expect("id"))))
        .send()
        .await
        .expect("Failed to delete saved");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_blank_title_rejected() {
    let (client, _) = signed_in().await;
    let resp = client
        .post(url("/api/saved"))
        .json(&json!({"type": "recipe", "title": "¡¡!!"}))
        .send()
        .await
        .expect("Failed to save");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_restaurant_saved_while_flag_on_by_default() {
    let (client, user_id) = signed_in().await;

    let resp = client
        .post(url("/api/saved"))
        .json(&json!({"type": "restaurant", "title": "Casa Lola", "data": {"city": "Sevilla"}}))
        .send()
        .await
        .expect("Failed to save");
    assert_eq!(resp.status(), StatusCode::OK);
    let saved: Value = resp.json().await.expect("Invalid saved response");
    assert_eq!(saved["id"], format!("{user_id}_casa-lola"));

    let items: Vec<Value> = client
        .get(url("/api/saved?type=restaurant"))
        .send()
        .await
        .expect("Failed to list saved")
        .json()
        .await
        .expect("Invalid saved list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], "restaurant");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_recommendation_request() {
    let (client, user_id) = signed_in().await;

    let resp = client
        .post(url("/api/recommendations"))
        .json(&json!({
            "userId": user_id,
            "type": "En casa",
            "mealType": "Cena",
            "cookingTime": "30",
            "cravings": ["pasta"],
            "userProfile": {"firstName": "Ana", "allergies": "gluten"},
        }))
        .send()
        .await
        .expect("Failed to request recommendation");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid recommendation response");
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

    let resp = client
        .post(url("/api/recommendations"))
        .json(&json!({"userId": uuid::Uuid::new_v4(), "type": "Fuera"}))
        .send()
        .await
        .expect("Failed to request recommendation");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
