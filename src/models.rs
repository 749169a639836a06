use serde::{Deserialize, Deserializer, Serialize};

/// A single purchase record as returned by `get_past_purchases`.
///
/// The shape differs between StoreKit and Play Billing, so it is kept as the
/// raw JSON object the store handed back.
pub type RawPurchase = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    Consumable,
    NonConsumable,
    Subscription,
}

impl ProductType {
    /// Parses the store's type string. Unknown values fall back to
    /// [`ProductType::Consumable`] instead of failing.
    pub fn parse(value: &str) -> Self {
        match value {
            "non_consumable" => ProductType::NonConsumable,
            "subscription" => ProductType::Subscription,
            _ => ProductType::Consumable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Consumable => "consumable",
            ProductType::NonConsumable => "non_consumable",
            ProductType::Subscription => "subscription",
        }
    }
}

impl<'de> Deserialize<'de> for ProductType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(ProductType::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Purchased,
    #[default]
    Error,
    Restored,
    Canceled,
}

impl PurchaseStatus {
    /// Parses the store's status string. Missing or unknown values map to
    /// [`PurchaseStatus::Error`]; this is a fallback, not a failure.
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => PurchaseStatus::Pending,
            "purchased" => PurchaseStatus::Purchased,
            "restored" => PurchaseStatus::Restored,
            "canceled" => PurchaseStatus::Canceled,
            _ => PurchaseStatus::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Purchased => "purchased",
            PurchaseStatus::Error => "error",
            PurchaseStatus::Restored => "restored",
            PurchaseStatus::Canceled => "canceled",
        }
    }
}

impl<'de> Deserialize<'de> for PurchaseStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(PurchaseStatus::parse).unwrap_or_default())
    }
}

/// Product metadata delivered with `products_ready`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDetails {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    /// Localized display price, e.g. `"$0.99"`.
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub raw_price: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub currency_code: String,
    #[serde(deserialize_with = "lenient_string")]
    pub currency_symbol: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
}

/// One `purchase_updated` notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PurchaseEvent {
    #[serde(deserialize_with = "lenient_string")]
    pub product_id: String,
    pub status: PurchaseStatus,
    /// Needed by `finish_transaction` on iOS.
    #[serde(deserialize_with = "lenient_string")]
    pub transaction_id: String,
    /// Store-provided text; non-string values arrive as their JSON text.
    #[serde(
        deserialize_with = "message_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
}

/// One `purchase_error` notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseError {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProductsRequest {
    pub product_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyProductRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishTransactionRequest {
    pub transaction_id: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPastPurchasesRequest {
    /// Seconds to wait for the store before giving up with an empty list.
    pub wait_timeout: Option<f64>,
}

/// Product ids as sent by the webview; `None` means "use the configured ones".
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductIdsRequest {
    pub product_ids: Option<Vec<String>>,
}

// Field-level fallbacks: a wrongly typed value decodes as the default instead of
// rejecting the whole record.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

fn message_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

// non-finite prices (`"NaN"`, `"inf"`) count as missing
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let price = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(price.filter(|p| p.is_finite()).unwrap_or_default())
}
