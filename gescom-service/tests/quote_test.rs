mod common;

use common::TestApp;

async fn create_quote(
    app: &TestApp,
    token: &str,
    client_id: &str,
    product_id: &str,
    quantity: f64,
) -> serde_json::Value {
    let response = app
        .client
        .post(format!("{}/devis", app.api))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "client_id": client_id,
            "lines": [{ "product_id": product_id, "quantity": quantity }],
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Failed to parse JSON")
}

async fn set_status(app: &TestApp, token: &str, quote_id: &str, statut: &str) -> reqwest::Response {
    app.client
        .put(format!("{}/devis/{}/statut", app.api, quote_id))
        .bearer_auth(token)
        .json(&serde_json::json!({ "statut": statut }))
        .send()
        .await
        .expect("Failed to execute request")
}

async fn product_stock(app: &TestApp, token: &str, product_id: &str) -> i64 {
    let product: serde_json::Value = app
        .client
        .get(format!("{}/produits/{}", app.api, product_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    product["stock"]["current"]
        .as_i64()
        .expect("Missing stock level")
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn quotes_price_like_invoices_but_never_touch_stock() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client devis").await;
    let product_id = app.seed_product(&token, "Produit devis", 10).await;

    let quote = create_quote(&app, &token, &client_id, &product_id, 3.0).await;

    assert!(quote["number"]
        .as_str()
        .is_some_and(|n| n.starts_with("DEV-")));
    assert_eq!(quote["status"], "brouillon");
    assert_eq!(quote["validity_days"], 30);
    assert_eq!(quote["expired"], false);
    assert_eq!(quote["totals"]["total_ttc_usd"], 348.0);

    // No stock movement for a quote
    assert_eq!(product_stock(&app, &token, &product_id).await, 10);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn conversion_copies_the_quote_and_debits_stock_once() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client conversion").await;
    let product_id = app.seed_product(&token, "Produit conversion", 10).await;

    let quote = create_quote(&app, &token, &client_id, &product_id, 4.0).await;
    let quote_id = quote["id"].as_str().expect("Missing id");

    let response = set_status(&app, &token, quote_id, "accepte").await;
    assert!(response.status().is_success());

    let response = app
        .client
        .post(format!("{}/devis/{}/convertir-facture", app.api, quote_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let invoice: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(invoice["number"]
        .as_str()
        .is_some_and(|n| n.starts_with("FAC-")));
    assert_eq!(invoice["status"], "brouillon");
    assert_eq!(invoice["totals"], quote["totals"]);
    assert_eq!(invoice["exchange_rate"], quote["exchange_rate"]);

    assert_eq!(product_stock(&app, &token, &product_id).await, 6);

    // The quote now references the invoice and refuses a second pass
    let refreshed: serde_json::Value = app
        .client
        .get(format!("{}/devis/{}", app.api, quote_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(refreshed["invoice_id"], invoice["id"]);

    let response = app
        .client
        .post(format!("{}/devis/{}/convertir-facture", app.api, quote_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Stock was debited exactly once
    assert_eq!(product_stock(&app, &token, &product_id).await, 6);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn only_accepted_quotes_convert() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client refus").await;
    let product_id = app.seed_product(&token, "Produit refus", 10).await;

    let quote = create_quote(&app, &token, &client_id, &product_id, 1.0).await;
    let quote_id = quote["id"].as_str().expect("Missing id");

    // Draft cannot convert
    let response = app
        .client
        .post(format!("{}/devis/{}/convertir-facture", app.api, quote_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Neither can a refused quote
    let response = set_status(&app, &token, quote_id, "refuse").await;
    assert!(response.status().is_success());

    let response = app
        .client
        .post(format!("{}/devis/{}/convertir-facture", app.api, quote_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(product_stock(&app, &token, &product_id).await, 10);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn conversion_failure_releases_the_claim() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client echec").await;
    let product_id = app.seed_product(&token, "Produit rare", 2).await;

    // Quote more than the stock on hand; conversion must fail cleanly.
    let quote = create_quote(&app, &token, &client_id, &product_id, 5.0).await;
    let quote_id = quote["id"].as_str().expect("Missing id");

    let response = set_status(&app, &token, quote_id, "accepte").await;
    assert!(response.status().is_success());

    let response = app
        .client
        .post(format!("{}/devis/{}/convertir-facture", app.api, quote_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // The claim was rolled back: restocking then converting works.
    let response = app
        .client
        .post(format!("{}/produits/{}/stock", app.api, product_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "delta": 10, "reason": "Reapprovisionnement" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let response = app
        .client
        .post(format!("{}/devis/{}/convertir-facture", app.api, quote_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    app.cleanup().await;
}
