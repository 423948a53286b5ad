// tests/api.rs

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, _) = app.request(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_or_bad_token_is_401_with_uniform_message() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/api/deliveries", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Autenticação necessária.");

    let (status, body) = app.get("/api/deliveries", "nao.e.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Autenticação necessária.");
}

#[tokio::test]
async fn forbidden_lists_allowed_roles() {
    let app = TestApp::new();
    let (_, token) = app.login_as("escola@x.org", "school_admin:34").await;

    let (status, body) = app.get("/api/users", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["allowedRoles"], json!(["admin"]));
}

#[tokio::test]
async fn login_refresh_and_logout_flow() {
    let app = TestApp::new();
    let user = app.user("ana@escola.org", "school_admin:1").await;

    let (status, session) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@escola.org", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["id"], user.id);
    assert!(session["user"].get("passwordHash").is_none());

    let token = session["token"].as_str().unwrap().to_string();
    let refresh = session["refreshToken"].as_str().unwrap().to_string();

    let (status, me) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ana@escola.org");

    let (status, rotated) = app
        .request(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": refresh })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_refresh = rotated["refreshToken"].as_str().unwrap().to_string();

    // Reuso do token consumido
    let (status, _) = app
        .request(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": refresh })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::POST, "/api/auth/logout", Some(&token), Some(json!({ "refreshToken": new_refresh })))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": new_refresh })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_401_and_short_password_is_400() {
    let app = TestApp::new();
    app.user("ana@escola.org", "admin").await;

    let (status, body) = app
        .request(Method::POST, "/api/auth/login", None, Some(json!({ "email": "ana@escola.org", "password": "errada1" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "E-mail ou senha inválidos.");

    let (status, body) = app
        .request(Method::POST, "/api/auth/login", None, Some(json!({ "email": "ana@escola.org", "password": "123" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn vendor_admin_sees_only_their_orders_nested() {
    let app = TestApp::new();
    let school = app.school("EMEF Norte").await;
    let (mine, other) = (app.vendor("Hortifruti").await, app.vendor("Grãos").await);

    let shared = app.delivery(school, "compartilhada").await;
    app.order(shared, mine, 5).await;
    app.order(shared, other, 3).await;
    let foreign = app.delivery(school, "alheia").await;
    app.order(foreign, other, 1).await;

    let (_, token) = app.login_as("fornecedor@x.org", &format!("vendor_admin:{mine}")).await;
    let (status, page) = app.get("/api/deliveries?expand=orders", &token).await;
    assert_eq!(status, StatusCode::OK);

    let data = page["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], shared);
    let orders = data[0]["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["vendorId"], mine);
    // Custo interno nunca sai na resposta
    assert!(orders[0].get("unitCost").is_none());

    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(page["meta"]["totalUnfiltered"], 1);

    let (status, _) = app.get(&format!("/api/deliveries/{foreign}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_outside_scope_is_404_not_403() {
    let app = TestApp::new();
    let school = app.school("EMEF Sul").await;
    let vendor = app.vendor("Laticínios").await;
    let delivery = app.delivery(school, "").await;
    let order = app.order(delivery, vendor, 2).await;

    let (_, token) = app.login_as("outro@x.org", "vendor_admin:999").await;
    let (status, body) = app.get(&format!("/api/orders/{order}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Recurso não encontrado.");
}

#[tokio::test]
async fn order_update_is_audited_and_logs_read_newest_first() {
    let app = TestApp::new();
    let school = app.school("EMEF Leste").await;
    let vendor = app.vendor("Hortifruti").await;
    let delivery = app.delivery(school, "").await;
    let order = app.order(delivery, vendor, 5).await;
    let (_, token) = app.login_as("admin@x.org", "admin").await;

    let uri = format!("/api/orders/{order}");
    let (status, updated) = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({ "quantity": 7 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"], 7);

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({ "notes": "urgente" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, logs) = app.get(&format!("/api/orders/{order}/logs"), &token).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["fieldName"], "notes");
    assert_eq!(logs[1]["fieldName"], "quantity");
    assert_eq!(logs[1]["oldValue"], "5");
    assert_eq!(logs[1]["newValue"], "7");
    assert_eq!(logs[1]["changedByName"], "admin");
}

#[tokio::test]
async fn stale_updated_at_is_conflict() {
    let app = TestApp::new();
    let school = app.school("EMEF Oeste").await;
    let delivery = app.delivery(school, "").await;
    let (_, token) = app.login_as("admin@x.org", "admin").await;

    let uri = format!("/api/deliveries/{delivery}");
    let (_, before) = app.get(&uri, &token).await;
    let version = before["updatedAt"].clone();

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({ "notes": "primeira", "updatedAt": version })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({ "notes": "segunda", "updatedAt": version })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, logs) = app.get(&format!("{uri}/logs"), &token).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn school_admin_cannot_touch_foreign_delivery() {
    let app = TestApp::new();
    let (mine, other) = (app.school("Minha").await, app.school("Outra").await);
    let delivery = app.delivery(other, "").await;
    let (_, token) = app.login_as("diretora@x.org", &format!("school_admin:{mine}")).await;

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/deliveries/{delivery}"),
            Some(&token),
            Some(json!({ "notes": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["allowedRoles"], json!(["admin", format!("school_admin:{other}")]));
}

#[tokio::test]
async fn repeated_query_keys_and_array_suffix_bind_lists() {
    let app = TestApp::new();
    let (a, b, c) = (app.school("A").await, app.school("B").await, app.school("C").await);
    for school in [a, b, c] {
        app.delivery(school, "").await;
    }
    let (_, token) = app.login_as("admin@x.org", "admin").await;

    let (_, page) = app.get(&format!("/api/deliveries?schoolId={a}&schoolId={b}"), &token).await;
    assert_eq!(page["meta"]["total"], 2);
    assert_eq!(page["meta"]["totalUnfiltered"], 3);

    let (_, page) = app.get(&format!("/api/deliveries?schoolId%5B%5D={c}"), &token).await;
    assert_eq!(page["meta"]["total"], 1);
}

#[tokio::test]
async fn detached_order_survives() {
    let app = TestApp::new();
    let school = app.school("EMEF").await;
    let vendor = app.vendor("Hortifruti").await;
    let delivery = app.delivery(school, "").await;
    let order = app.order(delivery, vendor, 1).await;
    let (_, token) = app.login_as("admin@x.org", "admin").await;

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/deliveries/{delivery}/orders/{order}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/api/orders/{order}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["deliveryId"].is_null());
}

#[tokio::test]
async fn impersonation_is_admin_only() {
    let app = TestApp::new();
    let target = app.user("alvo@x.org", "vendor_admin:12").await;
    let (_, admin) = app.login_as("admin@x.org", "admin").await;
    let (_, school) = app.login_as("escola@x.org", "school_admin:1").await;

    let body = json!({ "userId": target.id });
    let (status, _) = app
        .request(Method::POST, "/api/auth/impersonate", Some(&school), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, issued) = app
        .request(Method::POST, "/api/auth/impersonate", Some(&admin), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = app.get("/api/auth/me", issued["token"].as_str().unwrap()).await;
    assert_eq!(me["id"], target.id);
}

#[tokio::test]
async fn unit_cost_changes_are_logged_without_values() {
    let app = TestApp::new();
    let school = app.school("EMEF Centro").await;
    let vendor = app.vendor("Hortifruti").await;
    let delivery = app.delivery(school, "").await;
    let order = app.order(delivery, vendor, 5).await;
    let (_, admin) = app.login_as("admin@x.org", "admin").await;
    let (_, supplier) = app.login_as("fornecedor@x.org", &format!("vendor_admin:{vendor}")).await;

    let (status, updated) = app
        .request(Method::PATCH, &format!("/api/orders/{order}"), Some(&admin), Some(json!({ "unitCost": 99.75 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated.get("unitCost").is_none());

    for token in [&admin, &supplier] {
        let (status, logs) = app.get(&format!("/api/orders/{order}/logs"), token).await;
        assert_eq!(status, StatusCode::OK);

        let logs = logs.as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["fieldName"], "unitCost");
        assert_eq!(logs[0]["oldValue"], "");
        assert_eq!(logs[0]["newValue"], "");

        let raw = serde_json::to_string(logs).unwrap();
        assert!(!raw.contains("99.75") && !raw.contains("10.5"));
    }
}
