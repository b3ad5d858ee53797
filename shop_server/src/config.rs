use std::env;

use log::*;
use shop_common::DEFAULT_CURRENCY_CODE;

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 8340;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The externally visible base URL of this server, used to build the providers' callback URLs,
    /// e.g. `https://shop.example.com`.
    pub public_base_url: String,
    /// Where providers send the customer after checkout.
    pub return_url: String,
    /// ISO currency code quoted to providers.
    pub currency: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: String::default(),
            public_base_url: format!("http://{DEFAULT_SHOP_HOST}:{DEFAULT_SHOP_PORT}"),
            return_url: format!("http://{DEFAULT_SHOP_HOST}:{DEFAULT_SHOP_PORT}/thanks"),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = env::var("SHOP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SHOP_PORT. {e} Using the default, {DEFAULT_SHOP_PORT}, \
                         instead."
                    );
                    DEFAULT_SHOP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SHOP_DATABASE_URL is not set. Please set it to the URL for the shop database.");
            String::default()
        });
        let public_base_url = env::var("SHOP_PUBLIC_BASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_PUBLIC_BASE_URL is not set. Payment providers will be given a localhost callback URL.");
            format!("http://{host}:{port}")
        });
        let return_url = env::var("SHOP_RETURN_URL").ok().unwrap_or_else(|| format!("{public_base_url}/thanks"));
        let currency = env::var("SHOP_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        Self { host, port, database_url, public_base_url, return_url, currency }
    }

    /// The server-to-server callback URL registered with `provider`.
    pub fn callback_url_for(&self, provider: shop_engine::db_types::PaymentProvider) -> String {
        format!("{}/webhooks/{}", self.public_base_url, provider.to_string().to_ascii_lowercase())
    }
}
