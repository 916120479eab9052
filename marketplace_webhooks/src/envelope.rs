use std::{collections::HashMap, fmt::Display, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::errors::HandlerError;

pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";
pub const TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const ORDER_ID_HEADER: &str = "X-Shopify-Order-Id";
pub const PRODUCT_ID_HEADER: &str = "X-Shopify-Product-Id";

/// One delivered webhook, as handed over by the queue transport: the forwarded Shopify headers plus the raw body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub metadata: HashMap<String, String>,
    pub payload: Value,
}

impl EventEnvelope {
    pub fn shop_domain(&self) -> Option<&str> {
        self.metadata.get(SHOP_DOMAIN_HEADER).map(String::as_str)
    }

    pub fn topic(&self) -> Option<&str> {
        self.metadata.get(TOPIC_HEADER).map(String::as_str)
    }

    /// The remote order reference forwarded in the headers, if present. Only used for logging; handlers work off
    /// the payload's `admin_graphql_api_id`.
    pub fn order_ref(&self) -> Option<&str> {
        self.metadata.get(ORDER_ID_HEADER).map(String::as_str)
    }

    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| HandlerError::MalformedPayload(e.to_string()))
    }
}

#[derive(Debug, Clone, Error)]
#[error("No handler is registered for topic '{0}'")]
pub struct UnknownTopic(pub String);

/// The webhook topics the gateway subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookTopic {
    OrdersCreate,
    OrdersPaid,
    OrdersCancelled,
    OrdersFulfilled,
    ProductsCreate,
    ProductsUpdate,
    AppUninstalled,
}

impl FromStr for WebhookTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders/create" => Ok(Self::OrdersCreate),
            "orders/paid" => Ok(Self::OrdersPaid),
            "orders/cancelled" => Ok(Self::OrdersCancelled),
            "orders/fulfilled" => Ok(Self::OrdersFulfilled),
            "products/create" => Ok(Self::ProductsCreate),
            "products/update" => Ok(Self::ProductsUpdate),
            "app/uninstalled" => Ok(Self::AppUninstalled),
            s => Err(UnknownTopic(s.to_string())),
        }
    }
}

impl Display for WebhookTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OrdersCreate => "orders/create",
            Self::OrdersPaid => "orders/paid",
            Self::OrdersCancelled => "orders/cancelled",
            Self::OrdersFulfilled => "orders/fulfilled",
            Self::ProductsCreate => "products/create",
            Self::ProductsUpdate => "products/update",
            Self::AppUninstalled => "app/uninstalled",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn topic_round_trip() {
        for topic in [
            WebhookTopic::OrdersCreate,
            WebhookTopic::OrdersPaid,
            WebhookTopic::OrdersCancelled,
            WebhookTopic::OrdersFulfilled,
            WebhookTopic::ProductsCreate,
            WebhookTopic::ProductsUpdate,
            WebhookTopic::AppUninstalled,
        ] {
            assert_eq!(topic.to_string().parse::<WebhookTopic>().unwrap(), topic);
        }
        assert!("orders/edited".parse::<WebhookTopic>().is_err());
    }

    #[test]
    fn envelope_accessors() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "metadata": {
                "X-Shopify-Shop-Domain": "marketplace.myshopify.com",
                "X-Shopify-Topic": "orders/create",
                "X-Shopify-Order-Id": "6543210"
            },
            "payload": { "id": 6543210 }
        }))
        .unwrap();
        assert_eq!(envelope.shop_domain(), Some("marketplace.myshopify.com"));
        assert_eq!(envelope.topic(), Some("orders/create"));
        assert_eq!(envelope.order_ref(), Some("6543210"));
    }
}
