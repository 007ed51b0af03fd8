use anyhow::Context;
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret_key = std::env::var("WARBLER_SECRET_KEY").unwrap_or_else(|_| {
            warn!("WARBLER_SECRET_KEY not set, using the development secret");
            DEV_SECRET.into()
        });

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "warbler.db".into()),
            secret_key,
            host: std::env::var("WARBLER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("WARBLER_PORT")
                .unwrap_or_else(|_| "5000".into())
                .parse()
                .context("WARBLER_PORT must be a port number")?,
        })
    }
}
