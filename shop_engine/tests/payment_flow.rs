use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use shop_common::Money;
use shop_engine::{
    db_types::{
        NewPayment,
        NewProduct,
        Order,
        OrderPaymentState,
        OrderStatus,
        PaymentProvider,
        PaymentStatus,
        ShippingInfo,
        WebhookUpdate,
    },
    events::{EventHandlers, EventHooks, EventProducers},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{CatalogManagement, SettingsManagement, StorefrontError},
    CatalogApi,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};

fn shipping() -> ShippingInfo {
    ShippingInfo {
        full_name: "Taras Shevchenko".to_string(),
        address: "vul. Soborna 10, Lviv".to_string(),
        phone: "+380671112233".to_string(),
        email: "taras@example.com".to_string(),
    }
}

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Seeds a product, puts it in a cart and checks out, returning the pending order.
async fn order_with_total(db: &SqliteDatabase, customer_id: &str, price: i64, quantity: i64) -> Order {
    let catalog = CatalogApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    let product =
        db.insert_product(NewProduct::new("Poster", Money::from_major(price), 100)).await.expect("Error inserting product");
    catalog.add_to_cart(customer_id, product.id, quantity).await.unwrap();
    orders.checkout(customer_id, shipping()).await.expect("Checkout failed")
}

async fn activate(db: &SqliteDatabase, provider: PaymentProvider) {
    db.set_provider_active(provider, true, true).await.unwrap();
}

fn paid_webhook(order: &Order, event_id: &str) -> WebhookUpdate {
    WebhookUpdate {
        provider: PaymentProvider::Stripe,
        event_id: event_id.to_string(),
        order_id: order.order_id.clone(),
        external_id: Some("pi_12345".to_string()),
        status: PaymentStatus::Paid,
        raw: r#"{"type":"payment_intent.succeeded"}"#.to_string(),
    }
}

#[tokio::test]
async fn inactive_provider_rejects_payment_attempts() {
    let db = new_db().await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-1", 20, 1).await;

    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Stripe, order.total_price);
    let err = payments.new_payment_attempt(attempt).await.unwrap_err();
    assert!(matches!(err, StorefrontError::UnsupportedProvider(PaymentProvider::Stripe)));
}

#[tokio::test]
async fn payment_amount_must_match_order_total() {
    let db = new_db().await;
    activate(&db, PaymentProvider::Stripe).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-2", 20, 2).await;

    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Stripe, Money::from_major(5));
    let err = payments.new_payment_attempt(attempt).await.unwrap_err();
    match err {
        StorefrontError::PaymentAmountMismatch { expected, actual } => {
            assert_eq!(expected, Money::from_major(40));
            assert_eq!(actual, Money::from_major(5));
        },
        other => panic!("Expected PaymentAmountMismatch, got {other}"),
    }
}

#[tokio::test]
async fn first_payment_attempt_moves_order_to_pending_payment() {
    let db = new_db().await;
    activate(&db, PaymentProvider::LiqPay).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-3", 30, 1).await;
    assert_eq!(order.payment_status, OrderPaymentState::Unpaid);

    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::LiqPay, order.total_price);
    let payment = payments.new_payment_attempt(attempt).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    let order = orders.order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, OrderPaymentState::Pending);
}

#[tokio::test]
async fn paid_webhook_settles_payment_and_advances_order() {
    let db = new_db().await;
    activate(&db, PaymentProvider::Stripe).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-4", 50, 1).await;

    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Stripe, order.total_price);
    payments.new_payment_attempt(attempt).await.unwrap();

    let outcome = payments.apply_webhook(paid_webhook(&order, "evt_001")).await.unwrap();
    assert!(outcome.order_was_paid);
    assert_eq!(outcome.payment.status, PaymentStatus::Paid);
    assert_eq!(outcome.payment.external_id.as_deref(), Some("pi_12345"));
    assert_eq!(outcome.order.payment_status, OrderPaymentState::Paid);
    assert_eq!(outcome.order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn replayed_webhook_is_rejected_and_changes_nothing() {
    let db = new_db().await;
    activate(&db, PaymentProvider::Stripe).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-5", 50, 1).await;
    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Stripe, order.total_price);
    payments.new_payment_attempt(attempt).await.unwrap();

    payments.apply_webhook(paid_webhook(&order, "evt_dup")).await.unwrap();
    let err = payments.apply_webhook(paid_webhook(&order, "evt_dup")).await.unwrap_err();
    assert!(matches!(err, StorefrontError::ReplayedWebhook { .. }));

    // Still exactly one paid payment; no double-processing.
    let history = payments.payments_for_order(&order.order_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, PaymentStatus::Paid);
}

#[tokio::test]
async fn failed_payment_can_be_retried() {
    let db = new_db().await;
    activate(&db, PaymentProvider::Fondy).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-6", 25, 1).await;

    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Fondy, order.total_price);
    let payment = payments.new_payment_attempt(attempt).await.unwrap();
    let failed = payments.update_payment_status(payment.id, PaymentStatus::Failed).await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);

    // Failed -> Pending is the retry path.
    let retried = payments.update_payment_status(payment.id, PaymentStatus::Pending).await.unwrap();
    assert_eq!(retried.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn terminal_payment_states_reject_invalid_transitions() {
    let db = new_db().await;
    activate(&db, PaymentProvider::PayPal).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-7", 25, 1).await;

    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::PayPal, order.total_price);
    let payment = payments.new_payment_attempt(attempt).await.unwrap();
    payments.update_payment_status(payment.id, PaymentStatus::Paid).await.unwrap();

    let err = payments.update_payment_status(payment.id, PaymentStatus::Failed).await.unwrap_err();
    assert!(matches!(err, StorefrontError::PaymentTransition(_)));
    // Paid -> Refunded is allowed.
    let refunded = payments.update_payment_status(payment.id, PaymentStatus::Refunded).await.unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn webhook_without_external_id_matches_latest_pending_attempt() {
    let db = new_db().await;
    activate(&db, PaymentProvider::Portmone).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-8", 40, 1).await;
    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Portmone, order.total_price);
    let payment = payments.new_payment_attempt(attempt).await.unwrap();
    assert!(payment.external_id.is_none());

    let update = WebhookUpdate {
        provider: PaymentProvider::Portmone,
        event_id: "pm-evt-1".to_string(),
        order_id: order.order_id.clone(),
        external_id: None,
        status: PaymentStatus::Paid,
        raw: "{}".to_string(),
    };
    let outcome = payments.apply_webhook(update).await.unwrap();
    assert_eq!(outcome.payment.id, payment.id);
    assert!(outcome.order_was_paid);
}

#[tokio::test]
async fn refund_with_a_different_reference_matches_the_settled_attempt() {
    let db = new_db().await;
    activate(&db, PaymentProvider::Stripe).await;
    let payments = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let order = order_with_total(&db, "cust-10", 80, 1).await;
    let mut attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Stripe, order.total_price);
    attempt.external_id = Some("cs_123".to_string());
    let payment = payments.new_payment_attempt(attempt).await.unwrap();

    let mut settle = paid_webhook(&order, "evt_settle");
    settle.external_id = Some("cs_123".to_string());
    payments.apply_webhook(settle).await.unwrap();

    // Stripe reports refunds against the charge, not the checkout session we stored.
    let refund = WebhookUpdate {
        provider: PaymentProvider::Stripe,
        event_id: "evt_refund".to_string(),
        order_id: order.order_id.clone(),
        external_id: Some("ch_999".to_string()),
        status: PaymentStatus::Refunded,
        raw: r#"{"type":"charge.refunded"}"#.to_string(),
    };
    let outcome = payments.apply_webhook(refund).await.unwrap();
    assert_eq!(outcome.payment.id, payment.id);
    assert_eq!(outcome.payment.status, PaymentStatus::Refunded);
    assert_eq!(outcome.order.payment_status, OrderPaymentState::Refunded);
    assert!(!outcome.order_was_paid);
}

#[tokio::test]
async fn order_paid_hook_fires_exactly_once() {
    let db = new_db().await;
    activate(&db, PaymentProvider::Stripe).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |_event| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    });
    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let payments = PaymentFlowApi::new(db.clone(), producers);
    let order = order_with_total(&db, "cust-9", 60, 1).await;
    let attempt = NewPayment::new(order.order_id.clone(), PaymentProvider::Stripe, order.total_price);
    payments.new_payment_attempt(attempt).await.unwrap();
    payments.apply_webhook(paid_webhook(&order, "evt_hook")).await.unwrap();
    // Replay must not re-fire the hook.
    let _ = payments.apply_webhook(paid_webhook(&order, "evt_hook")).await;

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
