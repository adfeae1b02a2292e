use std::env;

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
    pub stripe: StripeConfig,
    pub completion: CompletionConfig,
    pub public_base_url: String,
    pub currency: String,
    pub order_number_prefix: String,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;

        let stripe = StripeConfig {
            secret_key: env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY is not set")?,
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .context("STRIPE_WEBHOOK_SECRET is not set")?,
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
        };

        let completion = CompletionConfig {
            api_url: env::var("COMPLETION_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            api_key: env::var("COMPLETION_API_KEY").ok(),
            model: env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        };

        let order_number_prefix =
            env::var("ORDER_NUMBER_PREFIX").unwrap_or_else(|_| "AVO".to_string());
        validate_prefix(&order_number_prefix)?;

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password_hash: env::var("ADMIN_PASSWORD_HASH").ok(),
            stripe,
            completion,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            currency: env::var("STORE_CURRENCY")
                .unwrap_or_else(|_| "eur".to_string())
                .to_lowercase(),
            order_number_prefix,
        })
    }
}

fn validate_prefix(prefix: &str) -> anyhow::Result<()> {
    if prefix.len() != 3 || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        bail!("ORDER_NUMBER_PREFIX must be exactly 3 uppercase letters, got {prefix:?}");
    }
    Ok(())
}
