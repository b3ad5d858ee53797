use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use shop_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CatalogApi,
    OrderFlowApi,
    PaymentFlowApi,
    SettingsApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    gateways::Gateways,
    notifier::{wire_mail_hooks, LogMailSender},
    reservation_worker::start_reservation_worker,
    routes::{
        add_to_cart,
        cancel_order,
        checkout,
        complete_order,
        create_product,
        customer_orders,
        get_cart,
        get_order,
        get_order_items,
        get_product,
        get_reservation_settings,
        health,
        list_products,
        order_payments,
        pay_order,
        remove_from_cart,
        remove_order_item,
        set_cart_quantity,
        set_order_item_quantity,
        set_payment_status,
        set_product_availability,
        set_product_stock,
        set_provider_settings,
        update_reservation_settings,
    },
    webhook_routes::{fondy_webhook, liqpay_webhook, paypal_webhook, portmone_webhook, stripe_webhook},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mut hooks = EventHooks::default();
    wire_mail_hooks(&mut hooks, Arc::new(LogMailSender));
    let handlers = EventHandlers::new(25, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let gateways = Gateways::from_env()?;
    let _sweeper = start_reservation_worker(db.clone(), producers.clone());
    let srv = create_server_instance(config, db, producers, gateways)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    gateways: Gateways,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let catalog_api = CatalogApi::new(db.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), producers.clone());
        let settings_api = SettingsApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shop::access_log"))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(settings_api))
            .app_data(web::Data::new(gateways.clone()))
            .app_data(web::Data::new(config.clone()))
            .service(health)
            .service(list_products)
            .service(get_product)
            .service(create_product)
            .service(set_product_availability)
            .service(set_product_stock)
            .service(get_cart)
            .service(add_to_cart)
            .service(set_cart_quantity)
            .service(remove_from_cart)
            .service(checkout)
            .service(get_order)
            .service(get_order_items)
            .service(customer_orders)
            .service(cancel_order)
            .service(complete_order)
            .service(set_order_item_quantity)
            .service(remove_order_item)
            .service(pay_order)
            .service(order_payments)
            .service(set_payment_status)
            .service(get_reservation_settings)
            .service(update_reservation_settings)
            .service(set_provider_settings)
            .service(stripe_webhook)
            .service(paypal_webhook)
            .service(fondy_webhook)
            .service(liqpay_webhook)
            .service(portmone_webhook)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?;
    info!("🚀️ Server bound to {host}:{port}");
    Ok(srv.run())
}
