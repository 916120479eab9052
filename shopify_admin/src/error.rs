use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid GraphQL query: {0}")]
    InvalidGraphQL(String),
    #[error("GraphQL query failed: {0}")]
    GraphQLError(String),
    #[error("Mutation was rejected: {0}")]
    UserErrors(String),
    #[error("Invalid currency amount: {0}")]
    InvalidCurrencyAmount(String),
    #[error("The query returned an empty response")]
    EmptyResponse,
}

impl ShopifyApiError {
    /// Transient errors are worth retrying: the request never reached Shopify, or Shopify reported a server-side or
    /// throttling failure. Everything else reflects a bad request or bad data and will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RestResponseError(_) => true,
            Self::QueryError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::ShopifyApiError;

    #[test]
    fn transient_classification() {
        assert!(ShopifyApiError::RestResponseError("connection reset".into()).is_transient());
        assert!(ShopifyApiError::QueryError { status: 503, message: "unavailable".into() }.is_transient());
        assert!(ShopifyApiError::QueryError { status: 429, message: "throttled".into() }.is_transient());
        assert!(!ShopifyApiError::QueryError { status: 404, message: "not found".into() }.is_transient());
        assert!(!ShopifyApiError::UserErrors("variant does not exist".into()).is_transient());
        assert!(!ShopifyApiError::JsonError("bad payload".into()).is_transient());
    }
}
