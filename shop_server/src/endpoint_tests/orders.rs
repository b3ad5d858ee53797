use actix_web::{http::StatusCode, test::TestRequest};
use shop_engine::db_types::{Order, OrderStatus, Product};

use super::helpers::{checkout_one_product, new_db, parse, seed_product, send, shipping_json};
use crate::gateways::Gateways;

#[actix_web::test]
async fn checkout_creates_an_order_and_empties_the_cart() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let teapot = seed_product(&db, "Teapot", 45_00, 10).await;
    let order = checkout_one_product(&db, "alice", teapot.id, 2).await;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_price.value(), 90_00);
    assert_eq!(order.full_name, "Olena Petrenko");

    let (status, body) = send(&db, &gateways, TestRequest::get().uri("/cart/alice")).await;
    assert_eq!(status, StatusCode::OK);
    let cart: Vec<serde_json::Value> = parse(&body);
    assert!(cart.is_empty());

    // Checked-out stock is reserved.
    let (_, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/products/{}", teapot.id))).await;
    let product: Product = parse(&body);
    assert_eq!(product.stock, 8);
}

#[actix_web::test]
async fn checking_out_an_empty_cart_is_rejected() {
    let db = new_db().await;
    let req = TestRequest::post().uri("/cart/bob/checkout").set_json(shipping_json());
    let (status, _) = send(&db, &Gateways::default(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn orders_can_be_fetched_by_id_and_by_customer() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let teapot = seed_product(&db, "Teapot", 45_00, 10).await;
    let order = checkout_one_product(&db, "alice", teapot.id, 1).await;

    let (status, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/orders/{}", order.order_id))).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Order = parse(&body);
    assert_eq!(fetched.order_id, order.order_id);

    let (status, body) = send(&db, &gateways, TestRequest::get().uri("/customers/alice/orders")).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = parse(&body);
    assert_eq!(orders.len(), 1);

    let (status, _) = send(&db, &gateways, TestRequest::get().uri("/orders/SO-does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cancelling_an_order_restores_stock() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let teapot = seed_product(&db, "Teapot", 45_00, 10).await;
    let order = checkout_one_product(&db, "alice", teapot.id, 3).await;

    let req = TestRequest::post().uri(&format!("/orders/{}/cancel", order.order_id));
    let (status, body) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);
    let cancelled: Order = parse(&body);
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let (_, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/products/{}", teapot.id))).await;
    let product: Product = parse(&body);
    assert_eq!(product.stock, 10);
}

#[actix_web::test]
async fn pending_orders_cannot_be_completed() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let teapot = seed_product(&db, "Teapot", 45_00, 10).await;
    let order = checkout_one_product(&db, "alice", teapot.id, 1).await;

    // Completion requires a cleared payment, i.e. Processing.
    let req = TestRequest::post().uri(&format!("/orders/{}/complete", order.order_id));
    let (status, _) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn editing_a_pending_order_reprices_it() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let teapot = seed_product(&db, "Teapot", 45_00, 10).await;
    let order = checkout_one_product(&db, "alice", teapot.id, 2).await;

    let req = TestRequest::post()
        .uri(&format!("/orders/{}/items/{}", order.order_id, teapot.id))
        .set_json(serde_json::json!({ "quantity": 5 }));
    let (status, body) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);
    let edited: Order = parse(&body);
    assert_eq!(edited.total_price.value(), 225_00);

    let req = TestRequest::delete().uri(&format!("/orders/{}/items/{}", order.order_id, teapot.id));
    let (status, body) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);
    let emptied: Order = parse(&body);
    assert_eq!(emptied.total_price.value(), 0);

    // The freed stock goes back to the shelf.
    let (_, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/products/{}", teapot.id))).await;
    let product: Product = parse(&body);
    assert_eq!(product.stock, 10);
}

#[actix_web::test]
async fn paying_with_an_unconfigured_provider_is_rejected() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let teapot = seed_product(&db, "Teapot", 45_00, 10).await;
    let order = checkout_one_product(&db, "alice", teapot.id, 1).await;

    let req = TestRequest::post()
        .uri(&format!("/orders/{}/pay", order.order_id))
        .set_json(serde_json::json!({ "provider": "Fondy" }));
    let (status, _) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn reservation_settings_round_trip() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let (status, body) = send(&db, &gateways, TestRequest::get().uri("/settings/reservations")).await;
    assert_eq!(status, StatusCode::OK);
    let mut settings: shop_engine::db_types::ReservationSettings = parse(&body);
    assert!(settings.is_enabled);

    settings.reservation_time_minutes = 15;
    settings.is_enabled = false;
    let req = TestRequest::post().uri("/settings/reservations").set_json(&settings);
    let (status, body) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);
    let updated: shop_engine::db_types::ReservationSettings = parse(&body);
    assert_eq!(updated.reservation_time_minutes, 15);
    assert!(!updated.is_enabled);
}
