mod common;

use common::TestApp;

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn stock_adjustments_move_the_level_and_leave_movements() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product(&token, "Ciment 50kg", 10).await;

    // Receive 5
    let response = app
        .client
        .post(format!("{}/produits/{}/stock", app.api, product_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "delta": 5, "reason": "Livraison fournisseur" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["new_level"], 15);
    assert_eq!(body["movement"]["kind"], "entree");
    assert_eq!(body["movement"]["stock_before"], 10);
    assert_eq!(body["movement"]["stock_after"], 15);

    // Issue 12
    let response = app
        .client
        .post(format!("{}/produits/{}/stock", app.api, product_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "delta": -12, "reason": "Vente comptoir" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["new_level"], 3);
    assert_eq!(body["movement"]["kind"], "sortie");

    // Two movements in the ledger, newest first
    let response = app
        .client
        .get(format!("{}/produits/{}/mouvements", app.api, product_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let movements: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let movements = movements.as_array().expect("Expected an array");
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0]["delta"], -12);
    assert_eq!(movements[1]["delta"], 5);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn issuing_more_than_available_is_rejected() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product(&token, "Peinture 10L", 4).await;

    let response = app
        .client
        .post(format!("{}/produits/{}/stock", app.api, product_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "delta": -9, "reason": "Vente" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.contains("Stock insuffisant")),
        "Unexpected error: {}",
        body["error"]
    );

    // Level untouched
    let product: serde_json::Value = app
        .client
        .get(format!("{}/produits/{}", app.api, product_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(product["stock"]["current"], 4);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn receiving_above_the_maximum_is_rejected() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    // seed_product sets maximum_stock to 500
    let product_id = app.seed_product(&token, "Clous 5kg", 490).await;

    let response = app
        .client
        .post(format!("{}/produits/{}/stock", app.api, product_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "delta": 20, "reason": "Reception" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.contains("Capacite de stock depassee")),
        "Unexpected error: {}",
        body["error"]
    );

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn adjusting_stock_on_unmanaged_product_is_rejected() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let response = app
        .client
        .post(format!("{}/produits", app.api))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "name": "Prestation pose",
            "unit_price_usd": 50.0,
            "tax_rate": 16.0,
            "manage_stock": false,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let product_id = body["id"].as_str().expect("Missing product id");
    assert!(body["stock"].is_null());

    let response = app
        .client
        .post(format!("{}/produits/{}/stock", app.api, product_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "delta": 5, "reason": "Reception" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn low_stock_filter_lists_only_products_below_minimum() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    // minimum is 2: one product above, one below after an issue
    app.seed_product(&token, "Produit plein", 50).await;
    let low_id = app.seed_product(&token, "Produit bas", 3).await;

    let response = app
        .client
        .post(format!("{}/produits/{}/stock", app.api, low_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "delta": -2, "reason": "Vente" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let response = app
        .client
        .get(format!("{}/produits?stock_bas=true", app.api))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let products: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let products = products.as_array().expect("Expected an array");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Produit bas");
    assert_eq!(products[0]["low_stock"], true);

    app.cleanup().await;
}
