//! End-to-end webhook tests: a signed Fondy callback is posted to the live route and must settle the
//! payment in the database. No outbound HTTP is involved; callbacks are verified and applied locally.
use actix_web::{http::StatusCode, test::TestRequest};
use payment_gateways::{
    fondy::{FondyConfig, FondyGateway},
    signature::signed_fields_sha1,
    GatewayClient,
};
use serde_json::{json, Value};
use shop_common::Secret;
use shop_engine::db_types::{Order, OrderPaymentState, OrderStatus, Payment, PaymentStatus};

use super::helpers::{checkout_one_product, new_db, parse, seed_product, send};
use crate::gateways::Gateways;

const FONDY_SECRET: &str = "test";

fn fondy_gateways() -> Gateways {
    let config = FondyConfig {
        api_url: "https://pay.fondy.eu".to_string(),
        merchant_id: "1396424".to_string(),
        secret: Secret::new(FONDY_SECRET.to_string()),
    };
    let mut gateways = Gateways::default();
    gateways.insert(GatewayClient::Fondy(FondyGateway::new(config).unwrap()));
    gateways
}

fn signed_callback(order_id: &str, payment_id: &str, order_status: &str) -> Vec<u8> {
    let mut fields = json!({
        "order_id": order_id,
        "order_status": order_status,
        "payment_id": payment_id,
        "amount": "9000",
    });
    let map = fields.as_object().unwrap();
    let signature = signed_fields_sha1(map, "signature", FONDY_SECRET);
    fields["signature"] = Value::String(signature);
    serde_json::to_vec(&fields).unwrap()
}

/// Creates an order with a pending Fondy payment attempt, bypassing the provider's checkout API.
async fn order_with_pending_payment(db: &shop_engine::SqliteDatabase, gateways: &Gateways) -> Order {
    let req = TestRequest::post()
        .uri("/settings/providers/fondy")
        .set_json(json!({ "is_active": true, "sandbox": true }));
    let (status, body) = send(db, gateways, req).await;
    assert_eq!(status, StatusCode::OK, "activating provider failed: {body}");
    let teapot = seed_product(db, "Teapot", 45_00, 10).await;
    let order = checkout_one_product(db, "alice", teapot.id, 2).await;
    let api = shop_engine::PaymentFlowApi::new(db.clone(), shop_engine::events::EventProducers::default());
    let payment = shop_engine::db_types::NewPayment::new(
        order.order_id.clone(),
        shop_engine::db_types::PaymentProvider::Fondy,
        order.total_price,
    );
    api.new_payment_attempt(payment).await.expect("Could not record payment attempt");
    order
}

#[actix_web::test]
async fn approved_callback_settles_the_payment_and_advances_the_order() {
    let db = new_db().await;
    let gateways = fondy_gateways();
    let order = order_with_pending_payment(&db, &gateways).await;

    let payload = signed_callback(order.order_id.as_str(), "777", "approved");
    let req = TestRequest::post().uri("/webhooks/fondy").set_payload(payload);
    let (status, body) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK, "webhook failed: {body}");

    let (_, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/orders/{}", order.order_id))).await;
    let settled: Order = parse(&body);
    assert_eq!(settled.status, OrderStatus::Processing);
    assert_eq!(settled.payment_status, OrderPaymentState::Paid);

    let (_, body) =
        send(&db, &gateways, TestRequest::get().uri(&format!("/orders/{}/payments", order.order_id))).await;
    let payments: Vec<Payment> = parse(&body);
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn replayed_callbacks_are_rejected() {
    let db = new_db().await;
    let gateways = fondy_gateways();
    let order = order_with_pending_payment(&db, &gateways).await;

    let payload = signed_callback(order.order_id.as_str(), "777", "approved");
    let req = TestRequest::post().uri("/webhooks/fondy").set_payload(payload.clone());
    let (status, _) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::post().uri("/webhooks/fondy").set_payload(payload);
    let (status, _) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn tampered_callbacks_are_rejected_without_touching_the_order() {
    let db = new_db().await;
    let gateways = fondy_gateways();
    let order = order_with_pending_payment(&db, &gateways).await;

    let mut fields: Value = serde_json::from_slice(&signed_callback(order.order_id.as_str(), "777", "approved")).unwrap();
    fields["amount"] = Value::String("1".to_string());
    let req = TestRequest::post().uri("/webhooks/fondy").set_payload(serde_json::to_vec(&fields).unwrap());
    let (status, _) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/orders/{}", order.order_id))).await;
    let untouched: Order = parse(&body);
    assert_eq!(untouched.status, OrderStatus::Pending);
    assert_eq!(untouched.payment_status, OrderPaymentState::Pending);
}

#[actix_web::test]
async fn in_progress_callbacks_are_acknowledged_but_not_applied() {
    let db = new_db().await;
    let gateways = fondy_gateways();
    let order = order_with_pending_payment(&db, &gateways).await;

    let payload = signed_callback(order.order_id.as_str(), "777", "processing");
    let req = TestRequest::post().uri("/webhooks/fondy").set_payload(payload);
    let (status, body) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Event acknowledged"));

    let (_, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/orders/{}", order.order_id))).await;
    let untouched: Order = parse(&body);
    assert_eq!(untouched.status, OrderStatus::Pending);
}

#[actix_web::test]
async fn webhooks_for_unconfigured_providers_are_rejected() {
    let db = new_db().await;
    // No gateways at all.
    let req = TestRequest::post().uri("/webhooks/fondy").set_payload(b"{}".to_vec());
    let (status, _) = send(&db, &Gateways::default(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn failed_callback_marks_the_attempt_failed_but_keeps_the_order_open() {
    let db = new_db().await;
    let gateways = fondy_gateways();
    let order = order_with_pending_payment(&db, &gateways).await;

    let payload = signed_callback(order.order_id.as_str(), "777", "declined");
    let req = TestRequest::post().uri("/webhooks/fondy").set_payload(payload);
    let (status, _) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/orders/{}", order.order_id))).await;
    let open: Order = parse(&body);
    assert_eq!(open.status, OrderStatus::Pending);

    let (_, body) =
        send(&db, &gateways, TestRequest::get().uri(&format!("/orders/{}/payments", order.order_id))).await;
    let payments: Vec<Payment> = parse(&body);
    assert_eq!(payments[0].status, PaymentStatus::Failed);
}
