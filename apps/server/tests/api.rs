//! Integration tests for the HTTP API, driven through the router with
//! `oneshot` against an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use caja_db::Database;
use caja_server::config::ServerConfig;
use caja_server::{create_router, AppState};

struct TestApp {
    router: Router,
    admin: String,
    cashier: String,
    cashier_id: String,
}

async fn app() -> Router {
    let db = Database::in_memory().await.unwrap();
    let config = ServerConfig {
        jwt_secret: "test-secret".to_string(),
        ..Default::default()
    };
    create_router(AppState::new(db, config))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, json)
}

/// An admin (first registration), one cashier and a product with stock 10
/// at 5.00. Returns the app and the product id.
async fn setup() -> (TestApp, String) {
    let router = app().await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"username": "admin", "email": "admin@tienda.com", "password": "admin123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "ADMIN");
    let admin = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/users",
        Some(&admin),
        Some(json!({
            "username": "caja1",
            "email": "caja1@tienda.com",
            "password": "cajero123",
            "role": "CAJERO"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cashier_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "caja1", "password": "cajero123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cashier = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/products",
        Some(&admin),
        Some(json!({"code": "P-001", "name": "Pan", "priceCents": 500, "stock": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = body["id"].as_str().unwrap().to_string();

    (
        TestApp {
            router,
            admin,
            cashier,
            cashier_id,
        },
        product_id,
    )
}

async fn stock_of(app: &TestApp, product_id: &str) -> i64 {
    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/products/{product_id}"),
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["stock"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let router = app().await;
    let (status, body) = send(&router, Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let router = app().await;

    let (status, body) = send(&router, Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = send(&router, Method::GET, "/api/sales", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_errors() {
    let (app, _) = setup().await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "caja1", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_CREDENTIALS");

    let (status, _) = send(
        &app.router,
        Method::PATCH,
        &format!("/api/users/{}/toggle-active", app.cashier_id),
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "caja1", "password": "cajero123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "ACCOUNT_DISABLED");
}

#[tokio::test]
async fn test_sale_then_cancel_restores_stock() {
    let (app, product_id) = setup().await;

    let (status, sale) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.cashier),
        Some(json!({
            "items": [{"productId": product_id, "quantity": 3}],
            "paymentMethod": "CASH"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["totalCents"], 1500);
    assert_eq!(sale["status"], "COMPLETED");
    assert_eq!(stock_of(&app, &product_id).await, 7);

    let sale_id = sale["id"].as_str().unwrap().to_string();
    let (status, canceled) = send(
        &app.router,
        Method::PATCH,
        &format!("/api/sales/{sale_id}/cancel"),
        Some(&app.cashier),
        Some(json!({"reason": "cliente desistio"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["status"], "CANCELED");
    assert_eq!(stock_of(&app, &product_id).await, 10);

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        &format!("/api/sales/{sale_id}/cancel"),
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_CANCELED");
    assert_eq!(stock_of(&app, &product_id).await, 10);
}

#[tokio::test]
async fn test_sale_rejections() {
    let (app, product_id) = setup().await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.cashier),
        Some(json!({"items": [{"productId": product_id, "quantity": 50}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INSUFFICIENT_STOCK");
    assert_eq!(stock_of(&app, &product_id).await, 10);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.cashier),
        Some(json!({"items": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "EMPTY_ORDER");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.cashier),
        Some(json!({"items": [{"productId": product_id, "quantity": 0}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_QUANTITY");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.cashier),
        Some(json!({"items": [{"productId": product_id, "quantity": 1.5}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.admin),
        Some(json!({"items": [{"productId": product_id, "quantity": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_cashier_cannot_touch_catalog_or_reports() {
    let (app, product_id) = setup().await;

    let (status, _) = send(
        &app.router,
        Method::PATCH,
        &format!("/api/products/{product_id}/stock"),
        Some(&app.cashier),
        Some(json!({"stock": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        Method::GET,
        "/api/sales/summary/daily",
        Some(&app.cashier),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = send(
        &app.router,
        Method::GET,
        "/api/products?search=pan",
        Some(&app.cashier),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_duplicate_product_code_conflicts() {
    let (app, _) = setup().await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/products",
        Some(&app.admin),
        Some(json!({"code": "P-001", "name": "Otro pan", "priceCents": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_reports_and_csv_export() {
    let (app, product_id) = setup().await;

    for quantity in [2, 1] {
        let (status, _) = send(
            &app.router,
            Method::POST,
            "/api/sales",
            Some(&app.cashier),
            Some(json!({"items": [{"productId": product_id, "quantity": quantity}]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, summary) = send(
        &app.router,
        Method::GET,
        "/api/sales/summary/daily",
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totals"]["totalSales"], 2);
    assert_eq!(summary["totals"]["totalCents"], 1500);

    let (status, list) = send(
        &app.router,
        Method::GET,
        "/api/sales?limit=1",
        Some(&app.cashier),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"].as_array().unwrap().len(), 1);
    assert_eq!(list["pagination"]["total"], 2);

    let (status, body) = send(
        &app.router,
        Method::GET,
        "/api/sales/report/sales?startDate=2026-03-10",
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, csv) = send(
        &app.router,
        Method::GET,
        "/api/sales/export/csv",
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let csv = csv.as_str().unwrap();
    assert!(csv.starts_with("id,sold_at,invoice_number,total,payment_method,status,cashier"));
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn test_cashier_sees_only_self() {
    let (app, _) = setup().await;

    let (status, profile) = send(
        &app.router,
        Method::GET,
        "/api/auth/profile",
        Some(&app.cashier),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "caja1");

    let (status, users) = send(&app.router, Method::GET, "/api/users", Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let admin_id = users["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["role"] == "ADMIN")
        .and_then(|u| u["id"].as_str())
        .unwrap()
        .to_string();

    let (status, _) = send(
        &app.router,
        Method::GET,
        &format!("/api/users/{admin_id}"),
        Some(&app.cashier),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app.router,
        Method::PUT,
        &format!("/api/users/{}", app.cashier_id),
        Some(&app.cashier),
        Some(json!({"role": "ADMIN"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_far_future_dates() {
    let (app, product_id) = setup().await;
    let (status, _) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.cashier),
        Some(json!({"items": [{"productId": product_id, "quantity": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // `%2B` is the leading `+` of chrono's extended year format.
    for uri in [
        "/api/sales?endDate=%2B262142-12-31",
        "/api/sales/summary/daily?date=%2B262142-12-31",
        "/api/sales/report/sales?startDate=2000-01-01&endDate=%2B262142-12-31",
    ] {
        let (status, body) = send(&app.router, Method::GET, uri, Some(&app.admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "VALIDATION_ERROR", "{uri}");
    }

    let (status, list) = send(
        &app.router,
        Method::GET,
        "/api/sales?endDate=9999-12-31",
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pagination"]["total"], 1);

    let (status, report) = send(
        &app.router,
        Method::GET,
        "/api/sales/report/sales?startDate=2000-01-01&endDate=9999-12-31",
        Some(&app.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["totals"]["totalSales"], 1);
}

#[tokio::test]
async fn test_overflowing_sale_total_is_a_validation_error() {
    let (app, _) = setup().await;
    let (status, product) = send(
        &app.router,
        Method::POST,
        "/api/products",
        Some(&app.admin),
        Some(json!({"code": "LUJO", "name": "Lujo", "priceCents": i64::MAX / 2, "stock": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/sales",
        Some(&app.cashier),
        Some(json!({"items": [{"productId": product["id"], "quantity": 3}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(stock_of(&app, product["id"].as_str().unwrap()).await, 10);
}
