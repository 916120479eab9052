use dmg_common::Money;
use serde::{Deserialize, Serialize};

//--------------------------------------  Webhook payloads  ----------------------------------------------------------
// Webhook bodies arrive in the Admin REST shape (snake_case, numeric ids). Only the fields the handlers read are
// modelled; everything else in the payload is ignored by serde.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderWebhook {
    pub id: i64,
    pub admin_graphql_api_id: String,
    pub created_at: String,
    pub currency: String,
    pub financial_status: String,
    #[serde(default)]
    pub current_total_discounts: Option<String>,
    #[serde(default)]
    pub order_status_url: Option<String>,
    #[serde(default)]
    pub payment_gateway_names: Vec<String>,
    #[serde(default)]
    pub customer: Option<CustomerPayload>,
    #[serde(default)]
    pub billing_address: Option<AddressPayload>,
    #[serde(default)]
    pub line_items: Vec<LineItemPayload>,
    #[serde(default)]
    pub fulfillments: Vec<FulfillmentPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerPayload {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl CustomerPayload {
    /// "First Last" with either part possibly missing.
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{first} {last}").trim().to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressPayload {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItemPayload {
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    #[serde(default)]
    pub properties: Vec<LineItemProperty>,
    #[serde(default)]
    pub discount_allocations: Vec<DiscountAllocation>,
}

impl LineItemPayload {
    /// A line is a packaging line when the storefront attached a `packaging=true` property to it.
    pub fn wants_packaging(&self) -> bool {
        self.properties.iter().any(|p| p.name == "packaging" && p.value == "true")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItemProperty {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscountAllocation {
    pub amount: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FulfillmentPayload {
    pub tracking_company: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductWebhook {
    pub id: i64,
    pub admin_graphql_api_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppUninstalledWebhook {
    pub myshopify_domain: String,
    #[serde(default)]
    pub name: Option<String>,
}

//--------------------------------------  GraphQL responses  ---------------------------------------------------------

/// The `nodes` form of a GraphQL connection.
#[derive(Debug, Clone, Deserialize)]
pub struct Nodes<T> {
    pub nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRef {
    pub id: String,
    pub title: String,
}

/// A product variant resolved through `productVariant(id:)`, carrying its owning product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariantNode {
    pub id: String,
    pub title: String,
    pub price: String,
    pub product: ProductRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDetails {
    pub id: String,
    pub title: String,
    pub price: String,
    #[serde(default)]
    pub inventory_quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub online_store_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub variants: Nodes<VariantDetails>,
}

impl ProductDetails {
    pub fn total_inventory(&self) -> i64 {
        self.variants.nodes.iter().map(|v| v.inventory_quantity).sum()
    }
}

//--------------------------------------  Mutation inputs  -----------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderInput {
    pub line_items: Vec<DraftOrderLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddressInput>,
    pub tags: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderLineItem {
    pub variant_id: String,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_discount: Option<AppliedDiscount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub value: f64,
    pub value_type: String,
}

impl AppliedDiscount {
    /// A fixed-amount discount. Shopify wants the value in major units.
    pub fn fixed(amount: Money) -> Self {
        #[allow(clippy::cast_precision_loss)]
        Self { value: amount.value() as f64 / 100.0, value_type: "FIXED_AMOUNT".to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShippingAddressInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

impl From<&AddressPayload> for ShippingAddressInput {
    fn from(a: &AddressPayload) -> Self {
        Self {
            address1: a.address1.clone(),
            city: a.city.clone(),
            province: a.province.clone(),
            country: a.country.clone(),
            zip: a.zip.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentInput {
    pub line_items_by_fulfillment_order: Vec<FulfillmentOrderRef>,
    pub notify_customer: bool,
    pub tracking_info: TrackingInfoInput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentOrderRef {
    pub fulfillment_order_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingInfoInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&FulfillmentPayload> for TrackingInfoInput {
    fn from(f: &FulfillmentPayload) -> Self {
        Self { company: f.tracking_company.clone(), number: f.tracking_number.clone(), url: f.tracking_url.clone() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn packaging_property() {
        let line = LineItemPayload {
            properties: vec![LineItemProperty { name: "packaging".into(), value: "true".into() }],
            ..Default::default()
        };
        assert!(line.wants_packaging());
        let line = LineItemPayload {
            properties: vec![LineItemProperty { name: "packaging".into(), value: "false".into() }],
            ..Default::default()
        };
        assert!(!line.wants_packaging());
        assert!(!LineItemPayload::default().wants_packaging());
    }

    #[test]
    fn customer_name_handles_missing_parts() {
        let customer =
            CustomerPayload { first_name: Some("Ada".into()), last_name: None, ..Default::default() };
        assert_eq!(customer.full_name(), "Ada");
        let customer = CustomerPayload {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            ..Default::default()
        };
        assert_eq!(customer.full_name(), "Ada Lovelace");
    }

    #[test]
    fn fixed_discount_uses_major_units() {
        let d = AppliedDiscount::fixed(Money::from_cents(1550));
        assert!((d.value - 15.5).abs() < f64::EPSILON);
        assert_eq!(d.value_type, "FIXED_AMOUNT");
    }

    #[test]
    fn draft_order_input_serializes_camel_case() {
        let input = DraftOrderInput {
            line_items: vec![DraftOrderLineItem {
                variant_id: "gid://shopify/ProductVariant/1".into(),
                quantity: 2,
                applied_discount: None,
            }],
            email: Some("buyer@example.com".into()),
            shipping_address: None,
            tags: "mirrored_from_marketplace".into(),
        };
        let v = serde_json::to_value(&input).unwrap();
        assert!(v["lineItems"][0]["variantId"].is_string());
        assert!(v["lineItems"][0].get("appliedDiscount").is_none());
        assert_eq!(v["tags"], "mirrored_from_marketplace");
    }
}
