//! Pantry endpoints against a running server.

use bocado_integration_tests::{client, signed_in, url};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn zone_summary(client: &reqwest::Client, zone: &str) -> Value {
    let zones: Vec<Value> = client
        .get(url("/api/pantry/zones"))
        .send()
        .await
        .expect("Failed to get zones")
        .json()
        .await
        .expect("Invalid zones response");
    zones
        .into_iter()
        .find(|summary| summary["zone"] == zone)
        .expect("zone present")
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_pantry_requires_session() {
    let resp = client()
        .get(url("/api/pantry/zones"))
        .send()
        .await
        .expect("Failed to get zones");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_new_account_has_empty_zones() {
    let (client, _) = signed_in().await;
    for zone in ["Despensa", "Nevera", "Congelador"] {
        let summary = zone_summary(&client, zone).await;
        assert_eq!(summary["itemCount"], 0);
        assert_eq!(summary["urgentCount"], 0);
    }
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_item_lifecycle() {
    let (client, _) = signed_in().await;

    let resp = client
        .post(url("/api/pantry/items"))
        .json(&json!({"name": "Yogur", "zone": "Nevera", "category": "Lácteos", "freshness": "soon"}))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let item: Value = resp.json().await.expect("Invalid item response");
    let id = item["id"].as_str().expect("item id").to_owned();
    assert_eq!(item["quantity"], 1);

    let resp = client
        .post(url("/api/pantry/items"))
        .json(&json!({"name": "Lentejas", "zone": "Despensa"}))
        .send()
        .await
        .expect("Failed to add item");
    let lentils: Value = resp.json().await.expect("Invalid item response");
    assert_eq!(lentils["category"], "Otros");
    assert_eq!(lentils["freshness"], "fresh");

    assert_eq!(zone_summary(&client, "Nevera").await["urgentCount"], 1);

    let resp = client
        .patch(url(&format!("/api/pantry/items/{id}")))
        .json(&json!({"freshness": "fresh", "quantity": 3}))
        .send()
        .await
        .expect("Failed to update item");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("Invalid item response");
    assert_eq!(updated["quantity"], 3);
    assert_eq!(updated["name"], "Yogur");

    assert_eq!(zone_summary(&client, "Nevera").await["urgentCount"], 0);

    let categories: Vec<String> = client
        .get(url("/api/pantry/categories?zone=Nevera"))
        .send()
        .await
        .expect("Failed to get categories")
        .json()
        .await
        .expect("Invalid categories response");
    assert_eq!(categories, vec!["Lácteos".to_string()]);

    let items: Vec<Value> = client
        .get(url("/api/pantry/items?zone=Nevera&category=Todos"))
        .send()
        .await
        .expect("Failed to list items")
        .json()
        .await
        .expect("Invalid items response");
    assert_eq!(items.len(), 1);

    let resp = client
        .delete(url(&format!("/api/pantry/items/{id}")))
        .send()
        .await
        .expect("Failed to delete item");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .delete(url(&format!("/api/pantry/items/{id}")))
        .send()
        .await
        .expect("Failed to delete item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_invalid_item_rejected() {
    let (client, _) = signed_in().await;

    let resp = client
        .post(url("/api/pantry/items"))
        .json(&json!({"name": "   ", "zone": "Nevera"}))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(url("/api/pantry/items?zone=Garaje"))
        .send()
        .await
        .expect("Failed to list items");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_items_are_private() {
    let (owner, _) = signed_in().await;
    let (other, _) = signed_in().await;

    let item: Value = owner
        .post(url("/api/pantry/items"))
        .json(&json!({"name": "Queso", "zone": "Nevera"}))
        .send()
        .await
        .expect("Failed to add item")
        .json()
        .await
        .expect("Invalid item response");
    let id = item["id"].as_str().expect("item id");

    let resp = other
        .delete(url(&format!("/api/pantry/items/{id}")))
        .send()
        .await
        .expect("Failed to delete item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(zone_summary(&owner, "Nevera").await["itemCount"], 1);
}
