//! End-to-end HTTP tests over the in-memory store.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::{TestRequest, TestServer};
use feria_core::auth::{Role, StaticAuthenticator};
use feria_testing::{InMemoryStore, test_lifecycle};
use feria_web::{AppState, CORRELATION_ID_HEADER, build_router};
use serde_json::{Value, json};
use std::sync::Arc;

const ADMIN: &str = "admin-token";
const SELLER: &str = "seller-token";

fn server() -> (TestServer, InMemoryStore) {
    feria_testing::init_test_tracing();
    let (lifecycle, store) = test_lifecycle();
    let authenticator = StaticAuthenticator::new()
        .with_user("Boss", Role::Admin, ADMIN)
        .with_user("Ana", Role::Seller, SELLER);
    let app = build_router(AppState::new(lifecycle, Arc::new(authenticator)));
    (TestServer::new(app).expect("test server"), store)
}

fn auth(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    )
}

fn fair_body(name: &str) -> Value {
    json!({
        "name": name,
        "start_date": "2024-06-01",
        "end_date": "2024-06-10",
        "pinta_price": 500,
        "litro_price": 1000
    })
}

async fn activate(server: &TestServer, name: &str) -> String {
    let response = auth(server.post("/api/fairs"), ADMIN)
        .json(&fair_body(name))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_readiness() {
    let (server, store) = server();
    server.get("/health").await.assert_status_ok();
    let ready = server.get("/ready").await;
    ready.assert_status_ok();
    assert_eq!(ready.json::<Value>()["status"], "ready");

    store.set_unavailable(true);
    server
        .get("/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn responses_echo_correlation_id() {
    let (server, _store) = server();
    let id = "5f0c3a44-8e2b-4d7e-9a51-0b1c2d3e4f50";
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-correlation-id"),
            HeaderValue::from_static(id),
        )
        .await;
    let echoed = response.headers().get(CORRELATION_ID_HEADER).unwrap();
    assert_eq!(echoed.to_str().unwrap(), id);
}

#[tokio::test]
async fn full_sales_day() {
    let (server, _store) = server();
    let fair_id = activate(&server, "Fair1").await;

    let quote = auth(server.get(&format!("/api/fairs/{fair_id}/quote")), SELLER)
        .add_query_param("pintas", 3)
        .add_query_param("litros", 2)
        .await;
    quote.assert_status_ok();
    assert_eq!(quote.json::<Value>()["total"], 3500);

    let sale = auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
        .json(&json!({"pintas": 3, "payment_method": "digital"}))
        .await;
    sale.assert_status(StatusCode::CREATED);
    let body = sale.json::<Value>();
    assert_eq!(body["total"], 1500);
    assert_eq!(body["sales"][0]["seller_name"], "Ana");

    auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
        .json(&json!({"litros": 2, "payment_method": "cash"}))
        .await
        .assert_status(StatusCode::CREATED);

    let report = auth(server.get(&format!("/api/fairs/{fair_id}/report")), ADMIN).await;
    report.assert_status_ok();
    let report = report.json::<Value>();
    assert_eq!(report["fair_name"], "Fair1");
    assert_eq!(report["status"], "active");
    assert_eq!(
        report["report"],
        json!({
            "pintas_sold": 3,
            "litros_sold": 2,
            "total_digital": 1500,
            "total_cash": 2000,
            "total_revenue": 3500
        })
    );

    let sales = auth(server.get(&format!("/api/fairs/{fair_id}/sales")), ADMIN).await;
    assert_eq!(sales.json::<Vec<Value>>().len(), 2);
}

#[tokio::test]
async fn idempotency_key_prevents_double_sale() {
    let (server, store) = server();
    let fair_id = activate(&server, "Fair1").await;
    let key = "0e7c6b1a-3f2d-4c5b-8a9e-1d2c3b4a5f60";

    for replayed in [false, true] {
        let response = auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
            .add_header(
                HeaderName::from_static("idempotency-key"),
                HeaderValue::from_static(key),
            )
            .json(&json!({"pintas": 1, "litros": 1, "payment_method": "cash"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["replayed"], replayed);
        assert_eq!(body["total"], 1500);
    }
    assert_eq!(store.sale_count().unwrap(), 2);

    // the key still resolves once the fair is closed
    auth(server.post(&format!("/api/fairs/{fair_id}/close")), ADMIN)
        .await
        .assert_status_ok();
    let late = auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
        .add_header(
            HeaderName::from_static("idempotency-key"),
            HeaderValue::from_static(key),
        )
        .json(&json!({"pintas": 1, "litros": 1, "payment_method": "cash"}))
        .await;
    late.assert_status(StatusCode::CREATED);
    assert_eq!(late.json::<Value>()["replayed"], true);

    auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
        .add_header(
            HeaderName::from_static("idempotency-key"),
            HeaderValue::from_static("not-a-uuid"),
        )
        .json(&json!({"pintas": 1, "payment_method": "cash"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn roles_are_enforced() {
    let (server, _store) = server();

    server
        .get("/api/fairs")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    auth(server.get("/api/fairs"), "bogus")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    auth(server.post("/api/fairs"), SELLER)
        .json(&fair_body("Fair1"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let fair_id = activate(&server, "Fair1").await;

    auth(server.get(&format!("/api/fairs/{fair_id}/report")), SELLER)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    auth(server.post(&format!("/api/fairs/{fair_id}/sales")), ADMIN)
        .json(&json!({"pintas": 1, "payment_method": "cash"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // both roles may see the active fair
    auth(server.get("/api/fairs/active"), SELLER)
        .await
        .assert_status_ok();
    auth(server.get("/api/fairs/active"), ADMIN)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn activation_validation_errors() {
    let (server, store) = server();
    let response = auth(server.post("/api/fairs"), ADMIN)
        .json(&json!({
            "name": "Fair1",
            "start_date": "2024-06-10",
            "end_date": "2024-06-01",
            "pinta_price": 500,
            "litro_price": 1000
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
    assert_eq!(store.sale_count().unwrap(), 0);

    auth(server.get("/api/fairs/active"), ADMIN)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn out_of_range_values_are_unprocessable() {
    let (server, store) = server();
    let response = auth(server.post("/api/fairs"), ADMIN)
        .json(&json!({
            "name": "Fair1",
            "start_date": "2024-06-01",
            "end_date": "2024-06-10",
            "pinta_price": 9_223_372_036_854_775_808_u64,
            "litro_price": 1000
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    let fair_id = activate(&server, "Fair1").await;
    let sale = auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
        .json(&json!({"pintas": 3_000_000_000_u32, "payment_method": "cash"}))
        .await;
    sale.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.sale_count().unwrap(), 0);
}

#[tokio::test]
async fn second_activation_supersedes_first() {
    let (server, _store) = server();
    let first = activate(&server, "Fair1").await;
    let second = activate(&server, "Fair2").await;

    let active = auth(server.get("/api/fairs/active"), SELLER).await;
    assert_eq!(active.json::<Value>()["id"], second.as_str());

    let old = auth(server.get(&format!("/api/fairs/{first}")), ADMIN).await;
    let old = old.json::<Value>();
    assert_eq!(old["is_active"], false);
    assert_eq!(old["status"], "closed");

    let history = auth(server.get("/api/fairs"), ADMIN).await;
    assert_eq!(history.json::<Vec<Value>>().len(), 2);
}

#[tokio::test]
async fn update_then_close_lifecycle() {
    let (server, _store) = server();
    let fair_id = activate(&server, "Fair1").await;

    let updated = auth(server.put(&format!("/api/fairs/{fair_id}")), ADMIN)
        .json(&json!({"pinta_price": 650}))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["pinta_price"], 650);

    let closed = auth(server.post(&format!("/api/fairs/{fair_id}/close")), ADMIN).await;
    closed.assert_status_ok();
    assert_eq!(closed.json::<Value>()["already_closed"], false);

    let again = auth(server.post(&format!("/api/fairs/{fair_id}/close")), ADMIN).await;
    again.assert_status_ok();
    assert_eq!(again.json::<Value>()["already_closed"], true);

    let edit = auth(server.put(&format!("/api/fairs/{fair_id}")), ADMIN)
        .json(&json!({"name": "Renamed"}))
        .await;
    edit.assert_status(StatusCode::CONFLICT);
    assert_eq!(edit.json::<Value>()["code"], "FAIR_CLOSED");

    let sale = auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
        .json(&json!({"pintas": 1, "payment_method": "cash"}))
        .await;
    sale.assert_status(StatusCode::CONFLICT);
    assert_eq!(sale.json::<Value>()["code"], "FAIR_NOT_ACTIVE");
}

#[tokio::test]
async fn archive_requires_confirmation() {
    let (server, store) = server();
    let fair_id = activate(&server, "Fair1").await;
    auth(server.post(&format!("/api/fairs/{fair_id}/sales")), SELLER)
        .json(&json!({"pintas": 2, "litros": 1, "payment_method": "digital"}))
        .await
        .assert_status(StatusCode::CREATED);

    auth(server.post(&format!("/api/fairs/{fair_id}/archive")), ADMIN)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(store.sale_count().unwrap(), 2);

    let archived = auth(server.post(&format!("/api/fairs/{fair_id}/archive")), ADMIN)
        .json(&json!({"confirm": true}))
        .await;
    archived.assert_status_ok();
    let body = archived.json::<Value>();
    assert_eq!(body["sales_deleted"], 2);
    assert_eq!(body["fair"]["status"], "archived");
    assert_eq!(store.sale_count().unwrap(), 0);

    let report = auth(server.get(&format!("/api/fairs/{fair_id}/report")), ADMIN).await;
    assert_eq!(report.json::<Value>()["report"]["total_revenue"], 0);
}

#[tokio::test]
async fn unknown_fair_is_404() {
    let (server, _store) = server();
    let response = auth(
        server.get("/api/fairs/7d1e2f3a-4b5c-4d6e-8f70-8192a3b4c5d6"),
        ADMIN,
    )
    .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "FAIR_NOT_FOUND");
}
