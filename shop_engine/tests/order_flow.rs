use chrono::{Duration, Utc};
use shop_common::Money;
use shop_engine::{
    db_types::{NewProduct, OrderStatus, ShippingInfo},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{CatalogApiError, CatalogManagement, SettingsManagement, StorefrontError},
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
};

fn shipping() -> ShippingInfo {
    ShippingInfo {
        full_name: "Olena Kovalenko".to_string(),
        address: "vul. Khreshchatyk 1, Kyiv".to_string(),
        phone: "+380501234567".to_string(),
        email: "olena@example.com".to_string(),
    }
}

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn seed_product(db: &SqliteDatabase, name: &str, price: i64, stock: i64) -> i64 {
    let product = db
        .insert_product(NewProduct::new(name, Money::from_major(price), stock))
        .await
        .expect("Error inserting product");
    product.id
}

#[tokio::test]
async fn checkout_reserves_stock_and_clears_cart() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    let tee = seed_product(&db, "T-shirt", 25, 4).await;
    catalog.add_to_cart("cust-1", mug, 2).await.unwrap();
    catalog.add_to_cart("cust-1", tee, 1).await.unwrap();

    let order = orders.checkout("cust-1", shipping()).await.expect("Checkout failed");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_price, Money::from_major(2 * 15 + 25));
    assert!(order.reserved_until.is_some(), "Reservations are enabled by default");

    // Stock was decremented at checkout, not at payment.
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 8);
    assert_eq!(catalog.product(tee).await.unwrap().unwrap().stock, 3);
    assert!(catalog.cart("cust-1").await.unwrap().is_empty(), "Cart should be cleared");

    let items = orders.order_items(&order.order_id).await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn checkout_with_empty_cart_fails() {
    let db = new_db().await;
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    let err = orders.checkout("nobody", shipping()).await.unwrap_err();
    assert!(matches!(err, StorefrontError::EmptyCart));
}

#[tokio::test]
async fn checkout_rolls_back_when_any_line_cannot_be_reserved() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    let rare = seed_product(&db, "Rare print", 100, 1).await;
    catalog.add_to_cart("cust-2", mug, 3).await.unwrap();
    catalog.add_to_cart("cust-2", rare, 2).await.unwrap();

    let err = orders.checkout("cust-2", shipping()).await.unwrap_err();
    match err {
        StorefrontError::InsufficientStock { product_id, requested, available } => {
            assert_eq!(product_id, rare);
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        },
        other => panic!("Expected InsufficientStock, got {other}"),
    }
    // The mug decrement must have rolled back with the failed transaction.
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 10);
    assert_eq!(catalog.product(rare).await.unwrap().unwrap().stock, 1);
    assert_eq!(catalog.cart("cust-2").await.unwrap().len(), 2, "Cart survives a failed checkout");
}

#[tokio::test]
async fn competing_checkouts_cannot_oversell() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let lamp = seed_product(&db, "Lamp", 80, 5).await;
    catalog.add_to_cart("cust-a", lamp, 3).await.unwrap();
    catalog.add_to_cart("cust-b", lamp, 3).await.unwrap();

    orders.checkout("cust-a", shipping()).await.expect("First checkout should succeed");
    let err = orders.checkout("cust-b", shipping()).await.unwrap_err();
    assert!(matches!(err, StorefrontError::InsufficientStock { available: 2, requested: 3, .. }));
    // The loser's failure must not eat into the remaining stock.
    assert_eq!(catalog.product(lamp).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
async fn simultaneous_checkouts_for_the_last_units_cannot_oversell() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let lamp = seed_product(&db, "Lamp", 80, 5).await;
    catalog.add_to_cart("racer-a", lamp, 3).await.unwrap();
    catalog.add_to_cart("racer-b", lamp, 3).await.unwrap();

    // Both checkouts run on the same pool at the same time. The conditional stock decrement decides
    // the winner; the loser's transaction rolls back whole.
    let race_a = {
        let db = db.clone();
        tokio::spawn(async move {
            OrderFlowApi::new(db.clone(), EventProducers::default()).checkout("racer-a", shipping()).await
        })
    };
    let race_b = {
        let db = db.clone();
        tokio::spawn(async move {
            OrderFlowApi::new(db.clone(), EventProducers::default()).checkout("racer-b", shipping()).await
        })
    };
    let (a, b) = (race_a.await.unwrap(), race_b.await.unwrap());

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "Exactly one checkout may claim the stock. Got {a:?} and {b:?}");
    let stock = catalog.product(lamp).await.unwrap().unwrap().stock;
    assert_eq!(stock, 2, "Five units minus the winner's three");
}

#[tokio::test]
async fn order_line_quantity_below_one_is_rejected() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-13", mug, 2).await.unwrap();
    let order = orders.checkout("cust-13", shipping()).await.unwrap();

    let err = orders.set_order_item_quantity(&order.order_id, mug, 0).await.unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidQuantity(0)));
    let err = orders.set_order_item_quantity(&order.order_id, mug, -2).await.unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidQuantity(-2)));
    // The rejected edits released nothing and repriced nothing.
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 8);
    let order = orders.order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.total_price, Money::from_major(30));
}

#[tokio::test]
async fn unavailable_product_cannot_be_added_to_cart() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.set_availability(mug, false).await.unwrap();
    let err = catalog.add_to_cart("cust-3", mug, 1).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::ProductUnavailable(id) if id == mug));
}

#[tokio::test]
async fn frozen_prices_survive_catalog_changes() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-4", mug, 2).await.unwrap();
    let order = orders.checkout("cust-4", shipping()).await.unwrap();

    // Repricing the product after checkout must not touch the order.
    sqlx::query("UPDATE products SET price = $1 WHERE id = $2")
        .bind(Money::from_major(99))
        .bind(mug)
        .execute(db.pool())
        .await
        .unwrap();
    let items = orders.order_items(&order.order_id).await.unwrap();
    assert_eq!(items[0].price, Money::from_major(15));
    let refetched = orders.order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refetched.total_price, Money::from_major(30));
}

#[tokio::test]
async fn cancelling_an_order_releases_stock_and_is_idempotent() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-5", mug, 4).await.unwrap();
    let order = orders.checkout("cust-5", shipping()).await.unwrap();
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 6);

    let cancelled = orders.cancel_order(&order.order_id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.reserved_until.is_none());
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 10);

    // A second cancellation is a no-op, not an error, and must not release stock twice.
    let again = orders.cancel_order(&order.order_id).await.unwrap();
    assert_eq!(again.status, OrderStatus::Cancelled);
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
async fn completed_orders_cannot_be_cancelled() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-6", mug, 1).await.unwrap();
    let order = orders.checkout("cust-6", shipping()).await.unwrap();
    orders.update_order_status(&order.order_id, OrderStatus::Processing).await.unwrap();
    orders.update_order_status(&order.order_id, OrderStatus::Completed).await.unwrap();

    let err = orders.cancel_order(&order.order_id).await.unwrap_err();
    assert!(matches!(err, StorefrontError::OrderTransition(_)));
}

#[tokio::test]
async fn editing_a_pending_order_adjusts_stock_and_total() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    let tee = seed_product(&db, "T-shirt", 25, 5).await;
    catalog.add_to_cart("cust-7", mug, 2).await.unwrap();
    catalog.add_to_cart("cust-7", tee, 1).await.unwrap();
    let order = orders.checkout("cust-7", shipping()).await.unwrap();
    assert_eq!(order.total_price, Money::from_major(55));

    // Bump the mug line from 2 to 5. Three more units come out of stock and the total follows.
    let order = orders.set_order_item_quantity(&order.order_id, mug, 5).await.unwrap();
    assert_eq!(order.total_price, Money::from_major(5 * 15 + 25));
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 5);

    // Drop the tee entirely.
    let order = orders.remove_order_item(&order.order_id, tee).await.unwrap();
    assert_eq!(order.total_price, Money::from_major(75));
    assert_eq!(catalog.product(tee).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn processing_orders_cannot_be_edited() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-8", mug, 2).await.unwrap();
    let order = orders.checkout("cust-8", shipping()).await.unwrap();
    orders.update_order_status(&order.order_id, OrderStatus::Processing).await.unwrap();

    let err = orders.set_order_item_quantity(&order.order_id, mug, 1).await.unwrap_err();
    assert!(matches!(err, StorefrontError::OrderModificationForbidden(_)));
    let err = orders.remove_order_item(&order.order_id, mug).await.unwrap_err();
    assert!(matches!(err, StorefrontError::OrderModificationForbidden(_)));
}

#[tokio::test]
async fn reservation_sweep_cancels_expired_orders_only() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-9", mug, 2).await.unwrap();
    let expired = orders.checkout("cust-9", shipping()).await.unwrap();
    catalog.add_to_cart("cust-10", mug, 1).await.unwrap();
    let fresh = orders.checkout("cust-10", shipping()).await.unwrap();

    // Backdate the first order's reservation past its deadline.
    sqlx::query("UPDATE orders SET reserved_until = $1 WHERE order_id = $2")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(expired.order_id.as_str())
        .execute(db.pool())
        .await
        .unwrap();

    let cancelled = orders.expire_reservations().await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].order_id, expired.order_id);
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 9, "Only the expired order's stock returns");

    let fresh = orders.order(&fresh.order_id).await.unwrap().unwrap();
    assert_eq!(fresh.status, OrderStatus::Pending);
}

#[tokio::test]
async fn sweep_respects_auto_cancel_flag() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mut policy = SettingsManagement::reservation_settings(&db).await.unwrap();
    policy.auto_cancel_enabled = false;
    db.update_reservation_settings(policy).await.unwrap();

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-11", mug, 1).await.unwrap();
    let order = orders.checkout("cust-11", shipping()).await.unwrap();
    sqlx::query("UPDATE orders SET reserved_until = $1 WHERE order_id = $2")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(order.order_id.as_str())
        .execute(db.pool())
        .await
        .unwrap();

    let cancelled = orders.expire_reservations().await.unwrap();
    assert!(cancelled.is_empty(), "Auto-cancel is off; expired orders stay put");
    let order = orders.order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn reservations_disabled_means_no_deadline() {
    let db = new_db().await;
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let mut policy = SettingsManagement::reservation_settings(&db).await.unwrap();
    policy.is_enabled = false;
    db.update_reservation_settings(policy).await.unwrap();

    let mug = seed_product(&db, "Mug", 15, 10).await;
    catalog.add_to_cart("cust-12", mug, 1).await.unwrap();
    let order = orders.checkout("cust-12", shipping()).await.unwrap();
    assert!(order.reserved_until.is_none());
    // Stock is still reserved; only the deadline is absent.
    assert_eq!(catalog.product(mug).await.unwrap().unwrap().stock, 9);
}
