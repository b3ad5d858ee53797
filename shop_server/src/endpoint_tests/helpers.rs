//! Shared scaffolding for the endpoint tests.
//!
//! Each test runs against a real SQLite database created from the migrations, so the full stack from
//! route handler to storage is exercised. A fresh service is initialised per request; state lives in the
//! database file, not the service.
use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use serde::de::DeserializeOwned;
use shop_engine::{
    db_types::{Order, Product},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    CatalogApi,
    OrderFlowApi,
    PaymentFlowApi,
    SettingsApi,
    SqliteDatabase,
};

use crate::{config::ServerConfig, gateways::Gateways, routes, webhook_routes};

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to test database")
}

pub async fn send(db: &SqliteDatabase, gateways: &Gateways, req: TestRequest) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(CatalogApi::new(db.clone())))
        .app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default())))
        .app_data(web::Data::new(PaymentFlowApi::new(db.clone(), EventProducers::default())))
        .app_data(web::Data::new(SettingsApi::new(db.clone())))
        .app_data(web::Data::new(gateways.clone()))
        .app_data(web::Data::new(ServerConfig::default()))
        .service(routes::health)
        .service(routes::list_products)
        .service(routes::get_product)
        .service(routes::create_product)
        .service(routes::set_product_availability)
        .service(routes::set_product_stock)
        .service(routes::get_cart)
        .service(routes::add_to_cart)
        .service(routes::set_cart_quantity)
        .service(routes::remove_from_cart)
        .service(routes::checkout)
        .service(routes::get_order)
        .service(routes::get_order_items)
        .service(routes::customer_orders)
        .service(routes::cancel_order)
        .service(routes::complete_order)
        .service(routes::set_order_item_quantity)
        .service(routes::remove_order_item)
        .service(routes::order_payments)
        .service(routes::set_payment_status)
        .service(routes::get_reservation_settings)
        .service(routes::update_reservation_settings)
        .service(routes::set_provider_settings)
        .service(webhook_routes::stripe_webhook)
        .service(webhook_routes::paypal_webhook)
        .service(webhook_routes::fondy_webhook)
        .service(webhook_routes::liqpay_webhook)
        .service(webhook_routes::portmone_webhook);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn parse<T: DeserializeOwned>(body: &str) -> T {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Could not parse response body: {e}\n{body}"))
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price_minor: i64, stock: i64) -> Product {
    let req = TestRequest::post()
        .uri("/products")
        .set_json(serde_json::json!({ "name": name, "price": price_minor, "stock": stock }));
    let (status, body) = send(db, &Gateways::default(), req).await;
    assert_eq!(status, StatusCode::CREATED, "seeding product failed: {body}");
    parse(&body)
}

/// Adds `quantity` of `product_id` to the customer's cart and checks the cart out, returning the new
/// order.
pub async fn checkout_one_product(db: &SqliteDatabase, customer_id: &str, product_id: i64, quantity: i64) -> Order {
    let gateways = Gateways::default();
    let req = TestRequest::post()
        .uri(&format!("/cart/{customer_id}/items"))
        .set_json(serde_json::json!({ "product_id": product_id, "quantity": quantity }));
    let (status, body) = send(db, &gateways, req).await;
    assert_eq!(status, StatusCode::OK, "adding to cart failed: {body}");
    let req = TestRequest::post().uri(&format!("/cart/{customer_id}/checkout")).set_json(shipping_json());
    let (status, body) = send(db, &gateways, req).await;
    assert_eq!(status, StatusCode::CREATED, "checkout failed: {body}");
    parse(&body)
}

pub fn shipping_json() -> serde_json::Value {
    serde_json::json!({
        "full_name": "Olena Petrenko",
        "address": "1 Khreshchatyk St, Kyiv",
        "phone": "+380501112233",
        "email": "olena@example.com",
    })
}
