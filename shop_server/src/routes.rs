//! Route handlers for the storefront API.
//!
//! Handlers are concrete over [`SqliteDatabase`]; the engine's trait seams exist so the API layer can be
//! backed by something else, but the server only ever ships with the SQLite backend.
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use log::*;
use payment_gateways::InitiateRequest;
use shop_engine::{
    db_types::{NewPayment, NewProduct, OrderId, OrderStatus, PaymentStatus, ReservationSettings},
    CatalogApi,
    OrderFlowApi,
    PaymentFlowApi,
    SettingsApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    data_objects::{
        AddToCartRequest,
        AvailabilityRequest,
        CheckoutRequest,
        PayRequest,
        ProviderSettingsRequest,
        QuantityRequest,
        StockRequest,
    },
    errors::ServerError,
    gateways::Gateways,
};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Catalog  ----------------------------------------------------

#[get("/products")]
pub async fn list_products(api: web::Data<CatalogApi<SqliteDatabase>>) -> Result<HttpResponse, ServerError> {
    let products = api.available_products().await?;
    Ok(HttpResponse::Ok().json(products))
}

#[get("/products/{id}")]
pub async fn get_product(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let product = api.product(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Product {id} not found")))?;
    Ok(HttpResponse::Ok().json(product))
}

#[post("/products")]
pub async fn create_product(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.add_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

#[post("/products/{id}/availability")]
pub async fn set_product_availability(
    path: web::Path<i64>,
    body: web::Json<AvailabilityRequest>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.set_availability(path.into_inner(), body.available).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[post("/products/{id}/stock")]
pub async fn set_product_stock(
    path: web::Path<i64>,
    body: web::Json<StockRequest>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.set_stock(path.into_inner(), body.stock).await?;
    Ok(HttpResponse::Ok().json(product))
}

//----------------------------------------------    Cart   ----------------------------------------------------

#[get("/cart/{customer_id}")]
pub async fn get_cart(
    path: web::Path<String>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let lines = api.cart(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(lines))
}

#[post("/cart/{customer_id}/items")]
pub async fn add_to_cart(
    path: web::Path<String>,
    body: web::Json<AddToCartRequest>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = path.into_inner();
    let lines = api.add_to_cart(&customer_id, body.product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(lines))
}

#[post("/cart/{customer_id}/items/{product_id}")]
pub async fn set_cart_quantity(
    path: web::Path<(String, i64)>,
    body: web::Json<QuantityRequest>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let (customer_id, product_id) = path.into_inner();
    let lines = api.set_cart_quantity(&customer_id, product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(lines))
}

#[delete("/cart/{customer_id}/items/{product_id}")]
pub async fn remove_from_cart(
    path: web::Path<(String, i64)>,
    api: web::Data<CatalogApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let (customer_id, product_id) = path.into_inner();
    let lines = api.remove_from_cart(&customer_id, product_id).await?;
    Ok(HttpResponse::Ok().json(lines))
}

//----------------------------------------------   Orders  ----------------------------------------------------

#[post("/cart/{customer_id}/checkout")]
pub async fn checkout(
    path: web::Path<String>,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = path.into_inner();
    let order = api.checkout(&customer_id, body.into_inner().shipping).await?;
    Ok(HttpResponse::Created().json(order))
}

#[get("/orders/{order_id}")]
pub async fn get_order(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let order =
        api.order(&order_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    Ok(HttpResponse::Ok().json(order))
}

#[get("/orders/{order_id}/items")]
pub async fn get_order_items(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let items = api.order_items(&OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[get("/customers/{customer_id}/orders")]
pub async fn customer_orders(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_customer(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[post("/orders/{order_id}/cancel")]
pub async fn cancel_order(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.cancel_order(&OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/orders/{order_id}/complete")]
pub async fn complete_order(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.update_order_status(&OrderId(path.into_inner()), OrderStatus::Completed).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/orders/{order_id}/items/{product_id}")]
pub async fn set_order_item_quantity(
    path: web::Path<(String, i64)>,
    body: web::Json<QuantityRequest>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let (order_id, product_id) = path.into_inner();
    let order = api.set_order_item_quantity(&OrderId(order_id), product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[delete("/orders/{order_id}/items/{product_id}")]
pub async fn remove_order_item(
    path: web::Path<(String, i64)>,
    api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let (order_id, product_id) = path.into_inner();
    let order = api.remove_order_item(&OrderId(order_id), product_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------  Payments ----------------------------------------------------

/// Starts a payment for an order: records the attempt (amount pinned to the order total) and asks the
/// provider for a redirect. If the provider cannot be reached the attempt stays pending and the customer
/// may retry.
#[post("/orders/{order_id}/pay")]
pub async fn pay_order(
    path: web::Path<String>,
    body: web::Json<PayRequest>,
    orders: web::Data<OrderFlowApi<SqliteDatabase>>,
    payments: web::Data<PaymentFlowApi<SqliteDatabase>>,
    gateways: web::Data<Gateways>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let provider = body.provider;
    let order = orders
        .order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    let client = gateways
        .get(provider)
        .ok_or_else(|| ServerError::InvalidRequest(format!("Provider {provider} is not configured")))?;
    let payment = payments
        .new_payment_attempt(NewPayment::new(order.order_id.clone(), provider, order.total_price))
        .await?;
    let request = InitiateRequest {
        order_id: order.order_id.clone(),
        amount: order.total_price,
        currency: config.currency.clone(),
        description: format!("Order {}", order.order_id),
        return_url: config.return_url.clone(),
        callback_url: config.callback_url_for(provider),
        customer_email: order.email.clone(),
    };
    let initiation = match client.initiate(&request).await {
        Ok(init) => init,
        Err(e) => {
            // The attempt stays Pending; the customer can retry and the next callback still matches.
            warn!("💻️ Could not initiate {provider} payment for order [{}]: {e}", order.order_id);
            return Err(e.into());
        },
    };
    let payment = payments
        .attach_payment_response(payment.id, initiation.external_id.as_deref(), &initiation.raw)
        .await?;
    info!("💻️ Payment {} for order [{}] initiated via {provider}", payment.id, order.order_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "payment_id": payment.id,
        "redirect": initiation.redirect,
    })))
}

#[get("/orders/{order_id}/payments")]
pub async fn order_payments(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let payments = api.payments_for_order(&OrderId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(payments))
}

#[post("/payments/{payment_id}/status")]
pub async fn set_payment_status(
    path: web::Path<i64>,
    body: web::Json<PaymentStatus>,
    api: web::Data<PaymentFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let payment = api.update_payment_status(path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//---------------------------------------------- Settings  ----------------------------------------------------

#[get("/settings/reservations")]
pub async fn get_reservation_settings(
    api: web::Data<SettingsApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let settings = api.reservation_settings().await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[post("/settings/reservations")]
pub async fn update_reservation_settings(
    body: web::Json<ReservationSettings>,
    api: web::Data<SettingsApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let settings = api.update_reservation_settings(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[post("/settings/providers/{provider}")]
pub async fn set_provider_settings(
    path: web::Path<String>,
    body: web::Json<ProviderSettingsRequest>,
    api: web::Data<SettingsApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let provider = path
        .into_inner()
        .parse()
        .map_err(|e| ServerError::InvalidRequestPath(format!("{e}")))?;
    let settings = api.set_provider_active(provider, body.is_active, body.sandbox).await?;
    Ok(HttpResponse::Ok().json(settings))
}
