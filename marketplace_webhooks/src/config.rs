use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use shopify_admin::DEFAULT_API_VERSION;

use crate::retry::RetryConfig;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub database_url: String,
    /// Admin API version used for every store the processor talks to.
    pub shopify_api_version: String,
    /// Buffer size for the event hook channels.
    pub event_buffer_size: usize,
    /// Retry policy applied to transient remote failures.
    pub retry: RetryConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            shopify_api_version: DEFAULT_API_VERSION.to_string(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("DMG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ DMG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let shopify_api_version = env::var("DMG_SHOPIFY_API_VERSION").ok().unwrap_or_else(|| {
            warn!("🪛️ DMG_SHOPIFY_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let event_buffer_size = parse_env_var("DMG_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let default_retry = RetryConfig::default();
        let retry = RetryConfig {
            initial_delay: Duration::from_millis(parse_env_var(
                "DMG_RETRY_INITIAL_DELAY_MS",
                default_retry.initial_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(parse_env_var(
                "DMG_RETRY_MAX_DELAY_MS",
                default_retry.max_delay.as_millis() as u64,
            )),
            max_attempts: parse_env_var("DMG_RETRY_MAX_ATTEMPTS", default_retry.max_attempts),
            ..default_retry
        };
        Self { database_url, shopify_api_version, event_buffer_size, retry }
    }
}

fn parse_env_var<T: FromStr + Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(s) => match s.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                error!("🪛️ {s} is not a valid value for {name}. Using the default, {default}, instead.");
                default
            },
        },
        Err(_) => default,
    }
}
