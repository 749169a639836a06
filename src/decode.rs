//! Turns raw bridge payloads into typed events.
//!
//! Every decoder here is total over structurally valid JSON: missing or
//! malformed fields get defaults. Only text that is not JSON at all (or not the
//! expected object/array shape) comes back as [`Error::Decode`].

use serde::de::Error as _;
use serde_json::Value;

use crate::models::*;
use crate::{Error, Result};

/// Decodes a `purchase_updated` payload.
pub fn decode_purchase_event(payload: &str) -> Result<PurchaseEvent> {
    let value = parse_object(payload)?;
    Ok(serde_json::from_value(value)?)
}

/// Decodes a `products_ready` payload.
///
/// Entries are decoded one by one; an entry that is not an object still
/// becomes a default [`ProductDetails`] rather than failing the batch. The
/// payload may be the bare list or an object wrapping it under `products`.
pub fn decode_products(payload: &str) -> Result<Vec<ProductDetails>> {
    let entries = match serde_json::from_str::<Value>(payload)? {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("products") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(shape_error("a list of products")),
        },
        _ => return Err(shape_error("a list of products")),
    };
    Ok(entries.into_iter().map(decode_product).collect())
}

/// Unwraps the value a native plugin resolves `getPastPurchases` with.
///
/// Native plugins resolve with an object, so the list usually travels under
/// `purchases`; a bare list is accepted as is. Anything else carries nothing.
pub fn past_purchases_payload(value: Value) -> Option<String> {
    match value {
        Value::Object(mut map) => match map.remove("purchases") {
            Some(Value::Null) | None => None,
            Some(list) => Some(list.to_string()),
        },
        Value::Array(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Decodes the result of `get_past_purchases`. An absent or empty result is an
/// empty list; non-object entries are skipped.
pub fn decode_past_purchases(payload: Option<&str>) -> Result<Vec<RawPurchase>> {
    let payload = match payload.map(str::trim) {
        None | Some("") => return Ok(Vec::new()),
        Some(payload) => payload,
    };
    match serde_json::from_str::<Value>(payload)? {
        Value::Array(entries) => Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(shape_error("a list of purchases")),
    }
}

/// Decodes a `purchase_error` payload. Never fails: anything that does not
/// carry a message field is passed through as the message text.
pub fn decode_purchase_error(payload: &str) -> PurchaseError {
    let message = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => ["message", "errorMessage", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Ok(Value::String(s)) => Some(s),
        _ => None,
    };
    PurchaseError {
        message: message.unwrap_or_else(|| payload.to_string()),
    }
}

fn decode_product(entry: Value) -> ProductDetails {
    match entry {
        Value::Object(_) => serde_json::from_value(entry).unwrap_or_default(),
        _ => ProductDetails::default(),
    }
}

fn parse_object(payload: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(payload)? {
        value @ Value::Object(_) => Ok(value),
        _ => Err(shape_error("an object")),
    }
}

fn shape_error(expected: &str) -> Error {
    Error::Decode(serde_json::Error::custom(format!(
        "expected payload to be {expected}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn purchased_record_decodes() {
        let payload = serde_json::json!({
            "status": "purchased",
            "productId": "coins",
            "transactionId": "t1",
        })
        .to_string();

        let event = decode_purchase_event(&payload).unwrap();
        assert_eq!(event.status, PurchaseStatus::Purchased);
        assert_eq!(event.product_id, "coins");
        assert_eq!(event.transaction_id, "t1");
        assert_eq!(event.error_message, None);
    }

    #[test]
    fn error_message_passes_through() {
        let event = decode_purchase_event(
            r#"{"productId":"gold","status":"canceled","errorMessage":"user canceled"}"#,
        )
        .unwrap();
        assert_eq!(event.status, PurchaseStatus::Canceled);
        assert_eq!(event.error_message.as_deref(), Some("user canceled"));
        assert_eq!(event.transaction_id, "");
    }

    #[test]
    fn empty_object_yields_defaults() {
        let event = decode_purchase_event("{}").unwrap();
        assert_eq!(event.product_id, "");
        assert_eq!(event.status, PurchaseStatus::Error);
        assert_eq!(event.transaction_id, "");
        assert_eq!(event.error_message, None);
    }

    #[test]
    fn unparseable_payload_is_an_error() {
        assert!(matches!(
            decode_purchase_event("{productId:"),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            decode_purchase_event(r#"["coins","purchased"]"#),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn products_ready_with_partial_record() {
        let payload = serde_json::json!([
            {
                "id": "premium",
                "title": "Premium",
                "description": "Unlock everything",
                "price": "$4.99",
                "rawPrice": 4.99,
                "currencyCode": "USD",
                "currencySymbol": "$",
                "type": "non_consumable"
            },
            {
                "id": "coins",
                "title": "Coins",
                "description": "100 coins",
                "currencyCode": "USD"
            }
        ])
        .to_string();

        let products = decode_products(&payload).unwrap();
        assert_eq!(products.len(), 2);

        assert_eq!(products[0].id, "premium");
        assert_eq!(products[0].price, "$4.99");
        assert_eq!(products[0].raw_price, 4.99);
        assert_eq!(products[0].currency_symbol, "$");
        assert_eq!(products[0].product_type, ProductType::NonConsumable);

        assert_eq!(products[1].id, "coins");
        assert_eq!(products[1].price, "");
        assert_eq!(products[1].raw_price, 0.0);
        assert_eq!(products[1].product_type, ProductType::Consumable);
    }

    #[test]
    fn bad_product_entry_does_not_abort_batch() {
        let products =
            decode_products(r#"[{"id":"a","type":"lifetime"}, 17, {"id":"b"}]"#).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].id, "a");
        assert_eq!(products[0].product_type, ProductType::Consumable);
        assert_eq!(products[1], ProductDetails::default());
        assert_eq!(products[2].id, "b");
    }

    #[test]
    fn products_may_be_wrapped() {
        let products = decode_products(r#"{"products":[{"id":"a"}]}"#).unwrap();
        assert_eq!(products.len(), 1);
        assert!(decode_products(r#"{"items":[]}"#).is_err());
        assert!(decode_products("not json").is_err());
    }

    #[test]
    fn past_purchases_empty_results() {
        assert!(decode_past_purchases(None).unwrap().is_empty());
        assert!(decode_past_purchases(Some("")).unwrap().is_empty());
        assert!(decode_past_purchases(Some("null")).unwrap().is_empty());
        assert!(decode_past_purchases(Some("[]")).unwrap().is_empty());
    }

    #[test]
    fn past_purchases_keep_raw_records() {
        let purchases =
            decode_past_purchases(Some(r#"[{"productId":"a","extra":1}, "junk"]"#)).unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0]["productId"], "a");
        assert_eq!(purchases[0]["extra"], 1);
        assert!(decode_past_purchases(Some("{}")).is_err());
    }

    #[test]
    fn native_past_purchases_answer_shapes() {
        let wrapped = serde_json::json!({ "purchases": [{ "productId": "a" }] });
        let payload = past_purchases_payload(wrapped).unwrap();
        assert_eq!(decode_past_purchases(Some(&payload)).unwrap().len(), 1);

        let bare = serde_json::json!([{ "productId": "a" }, { "productId": "b" }]);
        let payload = past_purchases_payload(bare).unwrap();
        assert_eq!(decode_past_purchases(Some(&payload)).unwrap().len(), 2);

        assert_eq!(past_purchases_payload(serde_json::json!({})), None);
        assert_eq!(
            past_purchases_payload(serde_json::json!({ "purchases": null })),
            None
        );
        assert_eq!(past_purchases_payload(Value::Null), None);
        assert_eq!(past_purchases_payload(serde_json::json!("[]")), None);
    }

    #[test]
    fn purchase_error_message_sources() {
        assert_eq!(
            decode_purchase_error(r#"{"message":"billing unavailable"}"#).message,
            "billing unavailable"
        );
        assert_eq!(
            decode_purchase_error(r#"{"errorMessage":"no network"}"#).message,
            "no network"
        );
        assert_eq!(decode_purchase_error(r#""quoted""#).message, "quoted");
        assert_eq!(
            decode_purchase_error("store exploded").message,
            "store exploded"
        );
    }

    fn optional_field(key: &'static str) -> impl Strategy<Value = Option<(String, Value)>> {
        proptest::option::of(
            prop_oneof![
                "[a-z_]{0,12}".prop_map(Value::String),
                any::<i64>().prop_map(Value::from),
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
            ]
            .prop_map(move |v| (key.to_string(), v)),
        )
    }

    proptest! {
        #[test]
        fn any_object_payload_decodes(
            product_id in optional_field("productId"),
            status in optional_field("status"),
            transaction_id in optional_field("transactionId"),
            error_message in optional_field("errorMessage"),
        ) {
            let map: serde_json::Map<String, Value> = [product_id.clone(), status.clone(), transaction_id, error_message]
                .into_iter()
                .flatten()
                .collect();
            let payload = Value::Object(map).to_string();

            let event = decode_purchase_event(&payload).unwrap();

            match product_id {
                Some((_, Value::String(s))) => prop_assert_eq!(event.product_id, s),
                _ => prop_assert_eq!(event.product_id, ""),
            }
            match status {
                Some((_, Value::String(s))) => prop_assert_eq!(event.status, PurchaseStatus::parse(&s)),
                _ => prop_assert_eq!(event.status, PurchaseStatus::Error),
            }
        }

        #[test]
        fn unknown_status_decodes_as_error(status in "[A-Za-z]{1,16}") {
            prop_assume!(!["pending", "purchased", "error", "restored", "canceled"].contains(&status.as_str()));
            let payload = serde_json::json!({ "productId": "p", "status": status }).to_string();
            prop_assert_eq!(decode_purchase_event(&payload).unwrap().status, PurchaseStatus::Error);
        }
    }
}
