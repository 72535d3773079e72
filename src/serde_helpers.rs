//! Typed deserialization of materialized bodies.
//!
//! With the `tracing` feature enabled, fields that the target type ignores are
//! reported as warnings and a failing field is reported with its JSON path, so
//! drift between the models a caller declares and what the API sends is visible.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserializes `value` into `T`, logging unknown fields under the `tracing` feature.
#[cfg(feature = "tracing")]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    use std::any::type_name;

    tracing::trace!(type_name = %type_name::<T>(), json = %value, "deserializing JSON");

    let original = value.clone();
    let mut unknown_paths: Vec<String> = Vec::new();

    let result: T = serde_ignored::deserialize(value, |path| {
        unknown_paths.push(path.to_string());
    })
    .inspect_err(|_| {
        let path_result: Result<T, _> = serde_path_to_error::deserialize(original.clone());
        if let Err(path_err) = path_result {
            let path = path_err.path().to_string();
            tracing::error!(
                type_name = %type_name::<T>(),
                path = %path,
                value = %format_value(lookup_value(&original, &path)),
                error = %path_err.inner(),
                "deserialization failed"
            );
        }
    })?;

    for path in unknown_paths {
        tracing::warn!(
            type_name = %type_name::<T>(),
            field = %path,
            value = %format_value(lookup_value(&original, &path)),
            "unknown field in API response"
        );
    }

    Ok(result)
}

/// Pass-through deserialization when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Resolves a `serde_ignored` / `serde_path_to_error` path such as
/// `trades[0].clientExtensions.?.id` against the original document.
#[cfg(feature = "tracing")]
fn lookup_value<'value>(value: &'value Value, path: &str) -> Option<&'value Value> {
    path.replace('[', ".")
        .replace(']', "")
        .split('.')
        .filter(|segment| !segment.is_empty() && *segment != "?")
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
            _ => None,
        })
}

#[cfg(feature = "tracing")]
fn format_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "<unable to retrieve>".to_owned(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::deserialize_with_warnings;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Price {
        instrument: String,
        #[serde(default)]
        tradeable: Option<bool>,
    }

    #[test]
    fn deserialize_known_fields_only() {
        let price: Price =
            deserialize_with_warnings(json!({"instrument": "EUR_USD", "tradeable": true}))
                .expect("deserialization failed");

        assert_eq!(price.instrument, "EUR_USD");
        assert_eq!(price.tradeable, Some(true));
    }

    #[test]
    fn deserialize_with_unknown_fields() {
        let price: Price = deserialize_with_warnings(json!({
            "instrument": "USD_JPY",
            "closeoutBid": "151.020",
            "status": "tradeable"
        }))
        .expect("deserialization failed");

        assert_eq!(price.instrument, "USD_JPY");
        assert_eq!(price.tradeable, None);
    }

    #[test]
    fn deserialize_missing_required_field_fails() {
        let result: crate::Result<Price> = deserialize_with_warnings(json!({"tradeable": false}));

        assert_eq!(
            result.unwrap_err().kind(),
            crate::error::Kind::Decode,
            "missing field is a decode failure"
        );
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn lookup_value_should_follow_bracket_and_dot_paths() {
        let document = json!({"trades": [{"clientExtensions": {"id": "my-trade"}}]});

        assert_eq!(
            super::lookup_value(&document, "trades[0].clientExtensions.?.id"),
            Some(&json!("my-trade"))
        );
        assert_eq!(super::lookup_value(&document, "trades.3"), None);
        assert_eq!(super::format_value(None), "<unable to retrieve>");
    }
}
