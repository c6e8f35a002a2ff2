mod common;

use common::TestApp;

async fn create_invoice(
    app: &TestApp,
    token: &str,
    client_id: &str,
    product_id: &str,
    quantity: f64,
) -> serde_json::Value {
    let response = app
        .client
        .post(format!("{}/factures", app.api))
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
async fn creating_an_invoice_prices_lines_and_debits_stock() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Etablissements Kabila").await;
    let product_id = app.seed_product(&token, "Ciment 50kg", 10).await;

    let invoice = create_invoice(&app, &token, &client_id, &product_id, 3.0).await;

    assert!(invoice["number"]
        .as_str()
        .is_some_and(|n| n.starts_with("FAC-")));
    assert_eq!(invoice["status"], "brouillon");
    assert_eq!(invoice["currency"], "USD");

    // unit price 100, tax 16%: 3 x 100 = 300 HT, 348 TTC
    assert_eq!(invoice["totals"]["total_ht_usd"], 300.0);
    assert_eq!(invoice["totals"]["total_ttc_usd"], 348.0);
    // FC amounts follow the bootstrap rate of 2800
    assert_eq!(invoice["totals"]["total_ht_fc"], 840_000.0);
    assert_eq!(invoice["exchange_rate"], 2800.0);

    assert_eq!(product_stock(&app, &token, &product_id).await, 7);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn invoice_creation_fails_whole_when_stock_is_short() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client test").await;
    let ok_id = app.seed_product(&token, "Produit disponible", 20).await;
    let short_id = app.seed_product(&token, "Produit epuise", 2).await;

    let response = app
        .client
        .post(format!("{}/factures", app.api))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "client_id": client_id,
            "lines": [
                { "product_id": ok_id, "quantity": 5.0 },
                { "product_id": short_id, "quantity": 8.0 },
            ],
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // The first line's debit was compensated
    assert_eq!(product_stock(&app, &token, &ok_id).await, 20);
    assert_eq!(product_stock(&app, &token, &short_id).await, 2);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn lifecycle_walks_draft_sent_paid() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client cycle").await;
    let product_id = app.seed_product(&token, "Produit cycle", 10).await;

    let invoice = create_invoice(&app, &token, &client_id, &product_id, 1.0).await;
    let invoice_id = invoice["id"].as_str().expect("Missing id");

    let response = app
        .client
        .post(format!("{}/factures/{}/envoyer", app.api, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "envoyee");
    assert!(!body["sent_at"].is_null());

    // Sending twice is an invalid transition
    let response = app
        .client
        .post(format!("{}/factures/{}/envoyer", app.api, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .post(format!("{}/factures/{}/payer", app.api, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "payee");

    // Paid is terminal: cancelling now fails
    let response = app
        .client
        .post(format!("{}/factures/{}/annuler", app.api, invoice_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reason": "Erreur de saisie" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn cancelling_a_sent_invoice_restores_stock() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client annulation").await;
    let product_id = app.seed_product(&token, "Produit annulation", 10).await;

    let invoice = create_invoice(&app, &token, &client_id, &product_id, 4.0).await;
    let invoice_id = invoice["id"].as_str().expect("Missing id");
    assert_eq!(product_stock(&app, &token, &product_id).await, 6);

    let response = app
        .client
        .post(format!("{}/factures/{}/envoyer", app.api, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let response = app
        .client
        .post(format!("{}/factures/{}/annuler", app.api, invoice_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reason": "Commande annulee par le client" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "annulee");
    assert_eq!(body["cancellation_reason"], "Commande annulee par le client");

    assert_eq!(product_stock(&app, &token, &product_id).await, 10);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn deleting_a_draft_restores_stock_but_paid_is_protected() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client suppression").await;
    let product_id = app.seed_product(&token, "Produit suppression", 10).await;

    // Draft delete restores stock
    let draft = create_invoice(&app, &token, &client_id, &product_id, 2.0).await;
    let draft_id = draft["id"].as_str().expect("Missing id");
    assert_eq!(product_stock(&app, &token, &product_id).await, 8);

    let response = app
        .client
        .delete(format!("{}/factures/{}", app.api, draft_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reason": "Doublon" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 204);
    assert_eq!(product_stock(&app, &token, &product_id).await, 10);

    // Paid delete is rejected
    let paid = create_invoice(&app, &token, &client_id, &product_id, 1.0).await;
    let paid_id = paid["id"].as_str().expect("Missing id");
    let response = app
        .client
        .post(format!("{}/factures/{}/payer", app.api, paid_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let response = app
        .client
        .delete(format!("{}/factures/{}", app.api, paid_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reason": "Tentative" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn claimed_totals_must_match_server_pricing() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let client_id = app.seed_client(&token, "Client totaux").await;
    let product_id = app.seed_product(&token, "Produit totaux", 10).await;

    let response = app
        .client
        .post(format!("{}/factures", app.api))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "client_id": client_id,
            "lines": [{ "product_id": product_id, "quantity": 2.0 }],
            "total_ttc_usd": 999.99,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Nothing was debited
    assert_eq!(product_stock(&app, &token, &product_id).await, 10);

    app.cleanup().await;
}
