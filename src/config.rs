use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

/// Origins the payment front end is served from.
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://usepaystrata.com",
    "https://www.usepaystrata.com",
    "http://localhost:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    // Database
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    // Redis
    pub redis_url: String,

    // Biller
    pub biller_base_url: String,
    pub biller_user_id: String,
    pub biller_api_key: String,

    // Price feed
    pub price_api_url: String,
    pub price_api_key: Option<String>,
    pub price_cache_ttl_secs: u64,

    // Admin auth
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    // HTTP
    pub allowed_origins: Vec<String>,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Key rate limits on `X-Forwarded-For` instead of the peer address.
    pub trust_proxy: bool,

    // Analytics
    pub profit_margin: Decimal,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let environment = Self::parse_environment()?;

        let config = Self {
            environment,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_var("PORT", "3001")?,

            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: Self::parse_var("DB_MAX_CONNECTIONS", "10")?,
            run_migrations: Self::parse_var("RUN_MIGRATIONS", "true")?,

            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            biller_base_url: std::env::var("BILLER_BASE_URL")
                .context("BILLER_BASE_URL required")?,
            biller_user_id: std::env::var("BILLER_USER_ID")
                .context("BILLER_USER_ID required")?,
            biller_api_key: std::env::var("BILLER_API_KEY")
                .context("BILLER_API_KEY required")?,

            price_api_url: std::env::var("PRICE_API_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
            price_api_key: std::env::var("PRICE_API_KEY").ok(),
            price_cache_ttl_secs: Self::parse_var("PRICE_CACHE_TTL_SECS", "300")?,

            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET required")?,
            jwt_expiry_hours: Self::parse_var("JWT_EXPIRY_HOURS", "24")?,
            admin_email: std::env::var("ADMIN_EMAIL").ok(),
            admin_password: std::env::var("ADMIN_PASSWORD").ok(),

            allowed_origins: Self::allowed_origins(std::env::var("CORS_ORIGIN").ok().as_deref()),
            rate_limit_max_requests: Self::parse_var("RATE_LIMIT_MAX_REQUESTS", "100")?,
            rate_limit_window_secs: Self::parse_var("RATE_LIMIT_WINDOW_SECS", "900")?,
            trust_proxy: Self::parse_var("TRUST_PROXY", "false")?,

            profit_margin: Self::parse_var("PROFIT_MARGIN", "0.05")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment() -> Result<Environment> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_var<T>(var: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        std::env::var(var)
            .unwrap_or_else(|_| default.to_string())
            .parse()
            .with_context(|| format!("Invalid {}", var))
    }

    /// Built-in origins plus the comma separated extras from `CORS_ORIGIN`.
    pub fn allowed_origins(extra: Option<&str>) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(extra) = extra {
            origins.extend(
                extra
                    .split(',')
                    .map(|origin| origin.trim().trim_end_matches('/').to_string())
                    .filter(|origin| !origin.is_empty()),
            );
        }

        origins.dedup();
        origins
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn validate(&self) -> Result<()> {
        if !self.biller_base_url.starts_with("http") {
            bail!("BILLER_BASE_URL must be HTTP(S) URL");
        }
        if !self.price_api_url.starts_with("http") {
            bail!("PRICE_API_URL must be HTTP(S) URL");
        }

        if self.environment == Environment::Production && self.database_url.is_none() {
            bail!("DATABASE_URL required in production");
        }

        if !self.is_development() && self.jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters");
        }

        if self.admin_email.is_some() != self.admin_password.is_some() {
            bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together");
        }

        if self.rate_limit_max_requests == 0 || self.rate_limit_window_secs == 0 {
            bail!("Rate limit settings must be greater than zero");
        }

        if self.profit_margin < Decimal::ZERO || self.profit_margin > Decimal::ONE {
            bail!("PROFIT_MARGIN must be between 0 and 1");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}
