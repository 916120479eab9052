use dmg_common::Secret;
use log::*;

pub const DEFAULT_API_VERSION: &str = "2024-07";

/// Connection details for a single Shopify storefront's Admin API. Every merchant store carries its own access
/// token, so handler code builds one of these per store from the credentials kept in the database.
#[derive(Debug, Clone, Default)]
pub struct ShopifyConfig {
    pub store_url: String,
    pub admin_access_token: Secret<String>,
    pub api_version: String,
}

impl ShopifyConfig {
    pub fn new(store_url: impl Into<String>, admin_access_token: impl Into<String>) -> Self {
        Self {
            store_url: store_url.into(),
            admin_access_token: Secret::new(admin_access_token.into()),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Fallback configuration for tools that talk to a single store only. Prefer [`ShopifyConfig::new`] with
    /// credentials from the store record.
    pub fn from_env_or_default() -> Self {
        let store_url = std::env::var("DMG_SHOPIFY_SHOP").unwrap_or_else(|_| {
            warn!("DMG_SHOPIFY_SHOP not set, using (probably useless) default");
            "example.myshopify.com".to_string()
        });
        let api_version = std::env::var("DMG_SHOPIFY_API_VERSION").unwrap_or_else(|_| {
            warn!("DMG_SHOPIFY_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let admin_access_token = Secret::new(std::env::var("DMG_SHOPIFY_ADMIN_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("DMG_SHOPIFY_ADMIN_ACCESS_TOKEN not set, using (probably useless) default");
            "shpat_00000000000000".to_string()
        }));
        Self { store_url, admin_access_token, api_version }
    }
}
