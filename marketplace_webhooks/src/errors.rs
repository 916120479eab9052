use std::fmt::Display;

use marketplace_engine::traits::{CatalogError, OrderFlowError};
use shopify_admin::ShopifyApiError;
use thiserror::Error;

/// What a handler reports back per webhook. Every failure is classified, so the caller can tell a transient remote
/// hiccup from bad data; nothing is silently swallowed.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Webhook payload was malformed: {0}")]
    MalformedPayload(String),
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Data invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Remote call failed: {0}")]
    RemoteCall(#[from] ShopifyApiError),
    #[error("Database failure: {0}")]
    Database(String),
}

impl HandlerError {
    /// Only transient remote failures are worth retrying; every other class will fail the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RemoteCall(e) if e.is_transient())
    }
}

impl From<OrderFlowError> for HandlerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(msg) => Self::Database(msg),
            OrderFlowError::OrderNotFound(id) => Self::NotFound(format!("order {id}")),
            OrderFlowError::MissingCounterpart(_) | OrderFlowError::AmbiguousMarketplaceStore(_) => {
                Self::InvariantViolation(e.to_string())
            },
            OrderFlowError::NoMarketplaceStore | OrderFlowError::OrderAlreadyExists(_) => {
                Self::PreconditionFailed(e.to_string())
            },
        }
    }
}

impl From<CatalogError> for HandlerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(msg) => Self::Database(msg),
            CatalogError::ProductAlreadyExists(_) | CatalogError::StoreNotFound(_) => {
                Self::PreconditionFailed(e.to_string())
            },
        }
    }
}

/// The success-side report for a handled webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Processed,
    /// The webhook was a redelivery; the work was already done.
    AlreadyProcessed,
    /// Nothing to do for this event (e.g. an order with no bundle lines, or an unsubscribed topic).
    Skipped(String),
}

impl Display for HandlerOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processed => write!(f, "processed"),
            Self::AlreadyProcessed => write!(f, "already processed"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// Errors from the processor shell itself (setup and envelope stream handling), as opposed to per-webhook handler
/// failures.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Could not initialize the processor. {0}")]
    InitializeError(String),
    #[error("An I/O error happened while reading envelopes. {0}")]
    IOError(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use marketplace_engine::{db_types::OrderId, traits::OrderFlowError};
    use shopify_admin::ShopifyApiError;

    use super::HandlerError;

    #[test]
    fn transience_follows_the_remote_classification() {
        let transient =
            HandlerError::RemoteCall(ShopifyApiError::QueryError { status: 502, message: "bad gateway".into() });
        assert!(transient.is_transient());
        let permanent = HandlerError::RemoteCall(ShopifyApiError::UserErrors("variant gone".into()));
        assert!(!permanent.is_transient());
        assert!(!HandlerError::Database("locked".into()).is_transient());
        assert!(!HandlerError::InvariantViolation("no mapping".into()).is_transient());
    }

    #[test]
    fn engine_errors_map_to_classes() {
        let e: HandlerError = OrderFlowError::OrderNotFound(OrderId("gid://shopify/Order/1".into())).into();
        assert!(matches!(e, HandlerError::NotFound(_)));
        let e: HandlerError = OrderFlowError::MissingCounterpart(OrderId("gid://shopify/Order/1".into())).into();
        assert!(matches!(e, HandlerError::InvariantViolation(_)));
        let e: HandlerError = OrderFlowError::NoMarketplaceStore.into();
        assert!(matches!(e, HandlerError::PreconditionFailed(_)));
        let e: HandlerError = OrderFlowError::DatabaseError("disk I/O".into()).into();
        assert!(matches!(e, HandlerError::Database(_)));
    }
}
