use marketplace_engine::db_types::Store;
use shopify_admin::{
    data_objects::{DraftOrderInput, FulfillmentInput, ProductDetails, ProductVariantNode},
    CancelOptions,
    ShopifyAdminApi,
    ShopifyApiError,
    ShopifyConfig,
};

/// Credentials for one storefront's Admin API. Every merchant carries its own access token, so the remote calls
/// take the auth explicitly rather than binding a client to a single store.
#[derive(Debug, Clone)]
pub struct StoreAuth {
    pub store_url: String,
    pub access_token: String,
}

impl From<&Store> for StoreAuth {
    fn from(store: &Store) -> Self {
        Self { store_url: store.store_url.clone(), access_token: store.access_token.clone() }
    }
}

/// The remote commerce operations the handlers need. The one production implementation talks to the Shopify Admin
/// API; tests substitute a mock.
#[allow(async_fn_in_trait)]
pub trait RemoteCommerce: Clone {
    /// Resolves a storefront variant gid to its variant record and owning product.
    async fn fetch_variant_product(
        &self,
        auth: &StoreAuth,
        variant_gid: &str,
    ) -> Result<ProductVariantNode, ShopifyApiError>;

    async fn fetch_product(&self, auth: &StoreAuth, product_gid: &str)
        -> Result<Option<ProductDetails>, ShopifyApiError>;

    /// Stages a draft order, completes it, and resolves the gid of the resulting order. Not idempotent: callers
    /// must not retry this blindly.
    async fn place_draft_order(
        &self,
        auth: &StoreAuth,
        input: &DraftOrderInput,
        payment_pending: bool,
    ) -> Result<String, ShopifyApiError>;

    async fn mark_order_as_paid(&self, auth: &StoreAuth, order_gid: &str) -> Result<(), ShopifyApiError>;

    async fn cancel_order(
        &self,
        auth: &StoreAuth,
        order_gid: &str,
        options: &CancelOptions,
    ) -> Result<(), ShopifyApiError>;

    async fn fulfillment_order_id(&self, auth: &StoreAuth, order_gid: &str) -> Result<Option<String>, ShopifyApiError>;

    async fn create_fulfillment(&self, auth: &StoreAuth, input: &FulfillmentInput) -> Result<(), ShopifyApiError>;

    async fn delete_product(&self, auth: &StoreAuth, product_gid: &str) -> Result<(), ShopifyApiError>;

    async fn delete_discount(&self, auth: &StoreAuth, discount_gid: &str) -> Result<(), ShopifyApiError>;
}

/// [`RemoteCommerce`] backed by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct ShopifyRemote {
    api_version: String,
}

impl ShopifyRemote {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self { api_version: api_version.into() }
    }

    fn api(&self, auth: &StoreAuth) -> Result<ShopifyAdminApi, ShopifyApiError> {
        let config = ShopifyConfig::new(&auth.store_url, &auth.access_token).with_api_version(&self.api_version);
        ShopifyAdminApi::new(config)
    }
}

impl RemoteCommerce for ShopifyRemote {
    async fn fetch_variant_product(
        &self,
        auth: &StoreAuth,
        variant_gid: &str,
    ) -> Result<ProductVariantNode, ShopifyApiError> {
        self.api(auth)?.fetch_variant_product(variant_gid).await
    }

    async fn fetch_product(
        &self,
        auth: &StoreAuth,
        product_gid: &str,
    ) -> Result<Option<ProductDetails>, ShopifyApiError> {
        self.api(auth)?.fetch_product(product_gid).await
    }

    async fn place_draft_order(
        &self,
        auth: &StoreAuth,
        input: &DraftOrderInput,
        payment_pending: bool,
    ) -> Result<String, ShopifyApiError> {
        let api = self.api(auth)?;
        let draft_gid = api.create_draft_order(input).await?;
        api.complete_draft_order(&draft_gid, payment_pending).await?;
        let order = api.order_for_draft_order(&draft_gid).await?;
        order.ok_or(ShopifyApiError::EmptyResponse)
    }

    async fn mark_order_as_paid(&self, auth: &StoreAuth, order_gid: &str) -> Result<(), ShopifyApiError> {
        self.api(auth)?.mark_order_as_paid(order_gid).await
    }

    async fn cancel_order(
        &self,
        auth: &StoreAuth,
        order_gid: &str,
        options: &CancelOptions,
    ) -> Result<(), ShopifyApiError> {
        self.api(auth)?.cancel_order(order_gid, options).await
    }

    async fn fulfillment_order_id(&self, auth: &StoreAuth, order_gid: &str) -> Result<Option<String>, ShopifyApiError> {
        self.api(auth)?.fulfillment_order_id(order_gid).await
    }

    async fn create_fulfillment(&self, auth: &StoreAuth, input: &FulfillmentInput) -> Result<(), ShopifyApiError> {
        self.api(auth)?.create_fulfillment(input).await
    }

    async fn delete_product(&self, auth: &StoreAuth, product_gid: &str) -> Result<(), ShopifyApiError> {
        self.api(auth)?.delete_product(product_gid).await
    }

    async fn delete_discount(&self, auth: &StoreAuth, discount_gid: &str) -> Result<(), ShopifyApiError> {
        self.api(auth)?.delete_discount(discount_gid).await
    }
}
