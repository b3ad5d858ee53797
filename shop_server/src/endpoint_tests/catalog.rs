use actix_web::{http::StatusCode, test::TestRequest};
use shop_engine::db_types::Product;

use super::helpers::{new_db, parse, seed_product, send};
use crate::gateways::Gateways;

#[actix_web::test]
async fn health_check() {
    let db = new_db().await;
    let (status, body) = send(&db, &Gateways::default(), TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn created_products_appear_in_the_catalog() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let teapot = seed_product(&db, "Teapot", 45_00, 10).await;
    assert_eq!(teapot.name, "Teapot");
    assert!(teapot.available);
    let (status, body) = send(&db, &gateways, TestRequest::get().uri("/products")).await;
    assert_eq!(status, StatusCode::OK);
    let listing: Vec<Product> = parse(&body);
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, teapot.id);
}

#[actix_web::test]
async fn unavailable_products_are_hidden_but_fetchable() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let lamp = seed_product(&db, "Desk lamp", 120_00, 3).await;
    let req = TestRequest::post()
        .uri(&format!("/products/{}/availability", lamp.id))
        .set_json(serde_json::json!({ "available": false }));
    let (status, _) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&db, &gateways, TestRequest::get().uri("/products")).await;
    assert_eq!(status, StatusCode::OK);
    let listing: Vec<Product> = parse(&body);
    assert!(listing.is_empty());

    // Direct fetch still works, for admin screens and order history.
    let (status, body) = send(&db, &gateways, TestRequest::get().uri(&format!("/products/{}", lamp.id))).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Product = parse(&body);
    assert!(!fetched.available);
}

#[actix_web::test]
async fn missing_product_is_a_404() {
    let db = new_db().await;
    let (status, _) = send(&db, &Gateways::default(), TestRequest::get().uri("/products/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn restocking_updates_the_stock_level() {
    let db = new_db().await;
    let gateways = Gateways::default();
    let mug = seed_product(&db, "Mug", 15_00, 0).await;
    let req =
        TestRequest::post().uri(&format!("/products/{}/stock", mug.id)).set_json(serde_json::json!({ "stock": 25 }));
    let (status, body) = send(&db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK);
    let updated: Product = parse(&body);
    assert_eq!(updated.stock, 25);
}
