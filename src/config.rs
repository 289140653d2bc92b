//! Environment configuration gathered once at startup and passed down
//! explicitly; no component reads ambient globals after boot.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub payment_secret_key: String,
}

impl Config {
    /// Reads configuration from environment variables. `DATABASE_URL`
    /// is required; everything else has a default.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8083),
            nats_url: std::env::var("NATS_URL").ok(),
            payment_secret_key: std::env::var("PAYMENT_SECRET_KEY")
                .unwrap_or_else(|_| "sk_test_simulated".to_string()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_joins_host_and_port() {
        let config = Config {
            database_url: "postgres://localhost/shoply".into(),
            host: "127.0.0.1".into(),
            port: 9000,
            nats_url: None,
            payment_secret_key: "sk_test_simulated".into(),
        };
        assert_eq!(config.addr(), "127.0.0.1:9000");
    }
}
