use std::sync::Arc;

use graphql_parser::parse_query;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::ShopifyConfig,
    data_objects::{DraftOrderInput, FulfillmentInput, Nodes, ProductDetails, ProductVariantNode},
    ShopifyApiError,
};

const CREATE_DRAFT_ORDER: &str = r#"
mutation CreateDraftOrder($input: DraftOrderInput!) {
  draftOrderCreate(input: $input) {
    draftOrder { id }
    userErrors { field message }
  }
}"#;

const COMPLETE_DRAFT_ORDER: &str = r#"
mutation CompleteDraftOrder($id: ID!, $paymentPending: Boolean) {
  draftOrderComplete(id: $id, paymentPending: $paymentPending) {
    draftOrder { id }
    userErrors { field message }
  }
}"#;

const ORDER_FOR_DRAFT_ORDER: &str = r#"
query OrderForDraftOrder($id: ID!) {
  draftOrder(id: $id) { order { id } }
}"#;

const MARK_ORDER_PAID: &str = r#"
mutation MarkOrderPaid($input: OrderMarkAsPaidInput!) {
  orderMarkAsPaid(input: $input) {
    order { id }
    userErrors { field message }
  }
}"#;

const CANCEL_ORDER: &str = r#"
mutation CancelOrder($orderId: ID!, $notifyCustomer: Boolean, $reason: OrderCancelReason!, $refund: Boolean!, $restock: Boolean!, $staffNote: String) {
  orderCancel(orderId: $orderId, notifyCustomer: $notifyCustomer, reason: $reason, refund: $refund, restock: $restock, staffNote: $staffNote) {
    job { id }
    orderCancelUserErrors { field message }
  }
}"#;

const FULFILLMENT_ORDERS: &str = r#"
query FulfillmentOrders($id: ID!) {
  order(id: $id) {
    fulfillmentOrders(first: 1) { nodes { id } }
  }
}"#;

const CREATE_FULFILLMENT: &str = r#"
mutation CreateFulfillment($fulfillment: FulfillmentV2Input!) {
  fulfillmentCreateV2(fulfillment: $fulfillment) {
    fulfillment { id status }
    userErrors { field message }
  }
}"#;

const PRODUCT_FROM_VARIANT: &str = r#"
query ProductFromVariant($variantId: ID!) {
  productVariant(id: $variantId) {
    id title price
    product { id title }
  }
}"#;

const PRODUCT_DETAILS: &str = r#"
query ProductDetails($id: ID!) {
  product(id: $id) {
    id title handle description descriptionHtml vendor productType tags onlineStoreUrl createdAt updatedAt
    variants(first: 100) { nodes { id title price inventoryQuantity } }
  }
}"#;

const DELETE_PRODUCT: &str = r#"
mutation DeleteProduct($input: ProductDeleteInput!) {
  productDelete(input: $input) {
    deletedProductId
    userErrors { field message }
  }
}"#;

const DELETE_DISCOUNT: &str = r#"
mutation DeleteDiscount($id: ID!) {
  discountCodeDelete(id: $id) {
    deletedCodeDiscountId
    userErrors { field message }
  }
}"#;

/// Options for the remote order-cancellation mutation. The defaults match what the marketplace sends when a shopper
/// cancels: refund and restock, and let Shopify notify the customer.
#[derive(Debug, Clone)]
pub struct CancelOptions {
    pub notify_customer: bool,
    pub reason: String,
    pub refund: bool,
    pub restock: bool,
    pub staff_note: String,
}

impl Default for CancelOptions {
    fn default() -> Self {
        Self {
            notify_customer: true,
            reason: "CUSTOMER".to_string(),
            refund: true,
            restock: true,
            staff_note: String::new(),
        }
    }
}

#[derive(Clone)]
pub struct ShopifyAdminApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

impl ShopifyAdminApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.admin_access_token.reveal().as_str())
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        headers.insert("X-Shopify-Access-Token", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn store_url(&self) -> &str {
        &self.config.store_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://{}/admin/api/{}{path}", self.config.store_url, self.config.api_version)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, ShopifyApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            Err(ShopifyApiError::QueryError { status, message })
        }
    }

    pub async fn graphql_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, ShopifyApiError> {
        let query = parse_query::<String>(query).map_err(|e| ShopifyApiError::InvalidGraphQL(e.to_string()))?;
        let mut body = serde_json::json!({
            "query": query.to_string(),
        });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        trace!("Sending GraphQL query: {body}");
        let result = self.rest_query::<Value, Value>(Method::POST, "/graphql.json", &[], Some(body)).await?;
        if let Some(errors) = result["errors"].as_array() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(ShopifyApiError::GraphQLError(e));
        }
        let data = result["data"].clone();
        trace!("GraphQL response: {data}");
        if data.is_null() {
            return Err(ShopifyApiError::EmptyResponse);
        }
        let result = serde_json::from_value(data).map_err(|e| ShopifyApiError::JsonError(e.to_string()))?;
        Ok(result)
    }

    /// Resolves a storefront variant gid to its variant record and owning product.
    pub async fn fetch_variant_product(&self, variant_gid: &str) -> Result<ProductVariantNode, ShopifyApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct VariantResponse {
            product_variant: Option<ProductVariantNode>,
        }
        let variables = serde_json::json!({ "variantId": variant_gid });
        let result = self.graphql_query::<VariantResponse>(PRODUCT_FROM_VARIANT, Some(variables)).await?;
        let variant = result.product_variant.ok_or(ShopifyApiError::EmptyResponse)?;
        debug!("Resolved variant {variant_gid} to product {} ({})", variant.product.id, variant.product.title);
        Ok(variant)
    }

    /// Fetches the full product record (including its first 100 variants) for a product gid.
    pub async fn fetch_product(&self, product_gid: &str) -> Result<Option<ProductDetails>, ShopifyApiError> {
        #[derive(Deserialize)]
        struct ProductResponse {
            product: Option<ProductDetails>,
        }
        let variables = serde_json::json!({ "id": product_gid });
        let result = self.graphql_query::<ProductResponse>(PRODUCT_DETAILS, Some(variables)).await?;
        if let Some(p) = &result.product {
            debug!("Fetched product {product_gid}: {} ({} variants)", p.title, p.variants.nodes.len());
        }
        Ok(result.product)
    }

    /// Stages a draft order and returns its gid.
    pub async fn create_draft_order(&self, input: &DraftOrderInput) -> Result<String, ShopifyApiError> {
        let variables = serde_json::json!({ "input": input });
        debug!("Creating draft order on {} with {} lines", self.config.store_url, input.line_items.len());
        let response = self.graphql_query::<Value>(CREATE_DRAFT_ORDER, Some(variables)).await?;
        check_user_errors(&response["draftOrderCreate"]["userErrors"])?;
        let id = response["draftOrderCreate"]["draftOrder"]["id"]
            .as_str()
            .ok_or(ShopifyApiError::EmptyResponse)?
            .to_string();
        info!("Created draft order {id} on {}", self.config.store_url);
        Ok(id)
    }

    /// Completes a draft order. `payment_pending` leaves the resulting order unpaid.
    pub async fn complete_draft_order(&self, draft_gid: &str, payment_pending: bool) -> Result<(), ShopifyApiError> {
        let variables = serde_json::json!({ "id": draft_gid, "paymentPending": payment_pending });
        let response = self.graphql_query::<Value>(COMPLETE_DRAFT_ORDER, Some(variables)).await?;
        check_user_errors(&response["draftOrderComplete"]["userErrors"])?;
        info!("Completed draft order {draft_gid} (payment pending: {payment_pending})");
        Ok(())
    }

    /// Returns the gid of the order created when the draft order completed.
    pub async fn order_for_draft_order(&self, draft_gid: &str) -> Result<Option<String>, ShopifyApiError> {
        let variables = serde_json::json!({ "id": draft_gid });
        let response = self.graphql_query::<Value>(ORDER_FOR_DRAFT_ORDER, Some(variables)).await?;
        Ok(response["draftOrder"]["order"]["id"].as_str().map(|s| s.to_string()))
    }

    pub async fn mark_order_as_paid(&self, order_gid: &str) -> Result<(), ShopifyApiError> {
        let variables = serde_json::json!({ "input": { "id": order_gid } });
        debug!("Marking order {order_gid} as paid");
        let response = self.graphql_query::<Value>(MARK_ORDER_PAID, Some(variables)).await?;
        check_user_errors(&response["orderMarkAsPaid"]["userErrors"])?;
        info!("Marked order {order_gid} as paid");
        Ok(())
    }

    pub async fn cancel_order(&self, order_gid: &str, options: &CancelOptions) -> Result<(), ShopifyApiError> {
        let variables = serde_json::json!({
            "orderId": order_gid,
            "notifyCustomer": options.notify_customer,
            "reason": options.reason,
            "refund": options.refund,
            "restock": options.restock,
            "staffNote": options.staff_note,
        });
        debug!("Cancelling order {order_gid}");
        let response = self.graphql_query::<Value>(CANCEL_ORDER, Some(variables)).await?;
        check_user_errors(&response["orderCancel"]["orderCancelUserErrors"])?;
        info!("Cancelled order {order_gid}");
        Ok(())
    }

    /// Returns the first fulfillment order attached to an order, if any.
    pub async fn fulfillment_order_id(&self, order_gid: &str) -> Result<Option<String>, ShopifyApiError> {
        #[derive(Deserialize)]
        struct FulfillmentOrderNode {
            id: String,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct OrderNode {
            fulfillment_orders: Nodes<FulfillmentOrderNode>,
        }
        #[derive(Deserialize)]
        struct OrderResponse {
            order: Option<OrderNode>,
        }
        let variables = serde_json::json!({ "id": order_gid });
        let result = self.graphql_query::<OrderResponse>(FULFILLMENT_ORDERS, Some(variables)).await?;
        Ok(result.order.and_then(|o| o.fulfillment_orders.nodes.into_iter().next()).map(|n| n.id))
    }

    pub async fn create_fulfillment(&self, fulfillment: &FulfillmentInput) -> Result<(), ShopifyApiError> {
        let variables = serde_json::json!({ "fulfillment": fulfillment });
        let response = self.graphql_query::<Value>(CREATE_FULFILLMENT, Some(variables)).await?;
        check_user_errors(&response["fulfillmentCreateV2"]["userErrors"])?;
        info!("Created fulfillment on {}", self.config.store_url);
        Ok(())
    }

    pub async fn delete_product(&self, product_gid: &str) -> Result<(), ShopifyApiError> {
        let variables = serde_json::json!({ "input": { "id": product_gid } });
        debug!("Deleting product {product_gid} from {}", self.config.store_url);
        let response = self.graphql_query::<Value>(DELETE_PRODUCT, Some(variables)).await?;
        check_user_errors(&response["productDelete"]["userErrors"])?;
        info!("Deleted product {product_gid}");
        Ok(())
    }

    pub async fn delete_discount(&self, discount_gid: &str) -> Result<(), ShopifyApiError> {
        let variables = serde_json::json!({ "id": discount_gid });
        debug!("Deleting discount {discount_gid} from {}", self.config.store_url);
        let response = self.graphql_query::<Value>(DELETE_DISCOUNT, Some(variables)).await?;
        check_user_errors(&response["discountCodeDelete"]["userErrors"])?;
        info!("Deleted discount {discount_gid}");
        Ok(())
    }
}

/// Mutations report domain-level rejections in a `userErrors` array next to the payload rather than as GraphQL
/// errors. A non-empty array fails the call.
fn check_user_errors(errors: &Value) -> Result<(), ShopifyApiError> {
    if let Some(errors) = errors.as_array() {
        if !errors.is_empty() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(ShopifyApiError::UserErrors(e));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::check_user_errors;

    #[test]
    fn user_errors_are_rejected() {
        assert!(check_user_errors(&json!([])).is_ok());
        assert!(check_user_errors(&json!(null)).is_ok());
        let err = check_user_errors(&json!([{"field": "lineItems", "message": "Variant does not exist"}]));
        assert!(err.is_err());
    }
}
