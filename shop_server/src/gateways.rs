use std::collections::HashMap;

use log::*;
use payment_gateways::{GatewayClient, GatewayError};
use shop_engine::db_types::{PaymentProvider, GATEWAY_PROVIDERS};

/// The set of provider adapters this server instance managed to configure at startup. A provider that is
/// active in the database but missing from this map cannot take payments, and its webhook endpoint
/// answers 400.
#[derive(Clone, Default)]
pub struct Gateways {
    clients: HashMap<PaymentProvider, GatewayClient>,
}

impl Gateways {
    /// Builds every adapter whose credentials are present in the environment. Missing credentials are
    /// logged and skipped; anything else is a hard startup error.
    pub fn from_env() -> Result<Self, GatewayError> {
        let mut clients = HashMap::new();
        for provider in GATEWAY_PROVIDERS {
            match GatewayClient::from_env(provider) {
                Ok(client) => {
                    info!("🪛️ Payment provider {provider} configured");
                    clients.insert(provider, client);
                },
                Err(GatewayError::NotConfigured(_)) => {
                    warn!("🪛️ Payment provider {provider} has no credentials set and will be unavailable");
                },
                Err(e) => return Err(e),
            }
        }
        Ok(Self { clients })
    }

    pub fn get(&self, provider: PaymentProvider) -> Option<&GatewayClient> {
        self.clients.get(&provider)
    }

    pub fn insert(&mut self, client: GatewayClient) {
        self.clients.insert(client.provider(), client);
    }

    pub fn configured_providers(&self) -> Vec<PaymentProvider> {
        self.clients.keys().copied().collect()
    }
}
