use std::env;

use crate::attribution::Destination;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Stripe API secret key, used to resolve customer references mid-ingestion.
    pub stripe_secret_key: String,
    /// Shared secret for webhook signature verification.
    pub stripe_webhook_secret: String,
    /// Process-wide default attribution destination. Both parts must be set;
    /// otherwise conversions without a matching campaign mapping skip attribution.
    pub meta_pixel_id: Option<String>,
    pub meta_access_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "adledger.db".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            meta_pixel_id: env::var("META_PIXEL_ID").ok().filter(|v| !v.is_empty()),
            meta_access_token: env::var("META_ACCESS_TOKEN").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The statically configured fallback destination, if fully configured.
    pub fn default_destination(&self) -> Option<Destination> {
        match (&self.meta_pixel_id, &self.meta_access_token) {
            (Some(pixel_id), Some(access_token)) => Some(Destination {
                pixel_id: pixel_id.clone(),
                access_token: access_token.clone(),
            }),
            _ => None,
        }
    }
}
