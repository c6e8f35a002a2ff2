mod common;

use common::TestApp;

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn accountant_invoices_but_cannot_touch_catalog_or_cancel() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let accountant = app.user_token("comptable").await;

    let client_id = app.seed_client(&admin, "Client capacite").await;
    let product_id = app.seed_product(&admin, "Produit capacite", 10).await;

    // Catalog writes are closed
    let response = app
        .client
        .post(format!("{}/produits", app.api))
        .bearer_auth(&accountant)
        .json(&serde_json::json!({
            "name": "Tentative",
            "unit_price_usd": 10.0,
            "tax_rate": 0.0,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    // Invoicing is open
    let response = app
        .client
        .post(format!("{}/factures", app.api))
        .bearer_auth(&accountant)
        .json(&serde_json::json!({
            "client_id": client_id,
            "lines": [{ "product_id": product_id, "quantity": 1.0 }],
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let invoice: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let invoice_id = invoice["id"].as_str().expect("Missing id");

    // Cancellation is a sales action, not an invoicing one
    let response = app
        .client
        .post(format!("{}/factures/{}/annuler", app.api, invoice_id))
        .bearer_auth(&accountant)
        .json(&serde_json::json!({ "reason": "Essai" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    // Reports are readable
    let response = app
        .client
        .get(format!("{}/stats", app.api))
        .bearer_auth(&accountant)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn exchange_rate_updates_belong_to_support_not_admin() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let support = app.user_token("support").await;

    // Everyone authenticated can read the rate
    let response = app
        .client
        .get(format!("{}/taux-change", app.api))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
    let rate: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(rate["taux"], 2800.0);
    let version = rate["version"].as_i64().expect("Missing version");

    // Admin cannot write it
    let response = app
        .client
        .put(format!("{}/taux-change", app.api))
        .bearer_auth(&admin)
        .json(&serde_json::json!({ "taux": 2900.0, "version": version }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    // Support can
    let response = app
        .client
        .put(format!("{}/taux-change", app.api))
        .bearer_auth(&support)
        .json(&serde_json::json!({ "taux": 2900.0, "version": version }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
    let rate: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(rate["taux"], 2900.0);
    assert_eq!(rate["version"], version + 1);

    // A stale version is a conflict
    let response = app
        .client
        .put(format!("{}/taux-change", app.api))
        .bearer_auth(&support)
        .json(&serde_json::json!({ "taux": 3000.0, "version": version }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 409);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn support_manages_users_but_not_invoices() {
    let app = TestApp::spawn().await;
    let support = app.user_token("support").await;

    let response = app
        .client
        .get(format!("{}/users", app.api))
        .bearer_auth(&support)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let response = app
        .client
        .get(format!("{}/factures", app.api))
        .bearer_auth(&support)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn plain_user_is_locked_out_of_every_guarded_surface() {
    let app = TestApp::spawn().await;
    let token = app.user_token("utilisateur").await;

    for path in ["/produits", "/factures", "/devis", "/outils", "/stats", "/users"] {
        let response = app
            .client
            .get(format!("{}{}", app.api, path))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(
            response.status().as_u16(),
            403,
            "Expected 403 on GET {}",
            path
        );
    }

    // But the profile endpoint still answers
    let response = app
        .client
        .get(format!("{}/auth/me", app.api))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    app.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires running MongoDB
async fn technician_sees_only_their_own_assignments() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let technician = app.user_token("technicien").await;

    // Identify the technician account
    let me: serde_json::Value = app
        .client
        .get(format!("{}/auth/me", app.api))
        .bearer_auth(&technician)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    let technician_id = me["id"].as_str().expect("Missing user id");

    // Admin creates a tool and assigns it to the technician
    let response = app
        .client
        .post(format!("{}/outils", app.api))
        .bearer_auth(&admin)
        .json(&serde_json::json!({ "name": "Perceuse", "initial_stock": 5 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let tool: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let tool_id = tool["id"].as_str().expect("Missing tool id");

    let response = app
        .client
        .post(format!("{}/outils/{}/affecter", app.api, tool_id))
        .bearer_auth(&admin)
        .json(&serde_json::json!({ "technician_id": technician_id, "quantity": 2 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    // A second assignment to the admin itself
    let admin_me: serde_json::Value = app
        .client
        .get(format!("{}/auth/me", app.api))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    let response = app
        .client
        .post(format!("{}/outils/{}/affecter", app.api, tool_id))
        .bearer_auth(&admin)
        .json(&serde_json::json!({
            "technician_id": admin_me["id"].as_str().expect("Missing admin id"),
            "quantity": 1,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    // The technician only sees their own row, even when asking for all
    let assignments: serde_json::Value = app
        .client
        .get(format!("{}/affectations", app.api))
        .bearer_auth(&technician)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    let assignments = assignments.as_array().expect("Expected an array");
    assert_eq!(assignments.len(), 1);
    assert_eq!(
        assignments[0]["technician_id"].as_str(),
        Some(technician_id)
    );

    // The admin sees both
    let assignments: serde_json::Value = app
        .client
        .get(format!("{}/affectations", app.api))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(assignments.as_array().expect("Expected an array").len(), 2);

    // The technician cannot assign tools themselves
    let response = app
        .client
        .post(format!("{}/outils/{}/affecter", app.api, tool_id))
        .bearer_auth(&technician)
        .json(&serde_json::json!({ "technician_id": technician_id, "quantity": 1 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    app.cleanup().await;
}
