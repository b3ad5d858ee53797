use log::*;
use shop_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SettingsApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the reservation sweep worker. Do not await the returned JoinHandle, as it runs indefinitely.
///
/// The sleep between passes tracks `cleanup_interval_minutes` from the reservation settings, re-read on
/// every pass so that policy changes take effect without a restart.
pub fn start_reservation_worker(db: SqliteDatabase, producers: EventProducers) -> JoinHandle<()> {
    tokio::spawn(async move {
        let orders = OrderFlowApi::new(db.clone(), producers);
        let settings = SettingsApi::new(db);
        info!("🕰️ Reservation sweep worker started");
        loop {
            let interval = match settings.reservation_settings().await {
                Ok(policy) => policy.cleanup_interval(),
                Err(e) => {
                    error!("🕰️ Could not read reservation settings: {e}. Using a 5 minute interval.");
                    chrono::Duration::minutes(5)
                },
            };
            let sleep_for = interval.to_std().unwrap_or(std::time::Duration::from_secs(300));
            tokio::time::sleep(sleep_for).await;
            match orders.expire_reservations().await {
                Ok(cancelled) if cancelled.is_empty() => {
                    debug!("🕰️ Reservation sweep complete. Nothing to do.");
                },
                Ok(cancelled) => {
                    info!("🕰️ Reservation sweep cancelled {} orders: {}", cancelled.len(), order_list(&cancelled));
                },
                Err(e) => {
                    error!("🕰️ Error running reservation sweep: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] customer: {}", o.order_id, o.customer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
