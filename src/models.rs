use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::errors::ApiError;
use crate::filtering::{Arity, Operator};

/// A filter request as sent in a JSON body.
///
/// ```json
/// {
///   "filters": {"category:eq": "Electronics", "price:gte": 500},
///   "relationFilters": {"provider.name:like": "mo"},
///   "customFilters": {"stock": "low"},
///   "orderBy": "-price",
///   "page": 2,
///   "perPage": 25
/// }
/// ```
///
/// Filter values may be strings, numbers, booleans, or arrays of those. They
/// are kept as strings: numbers and booleans are written out, arrays are
/// joined with `,` (so `{"id:in": [1, 2]}` equals `{"id:in": "1,2"}`).
/// `null` is only accepted for the `null` and `nNull` operators, whose value
/// is ignored; `{"price:eq": null}` fails to deserialize rather than comparing
/// with an empty string. Custom filter values are kept as JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterRequest {
    #[serde(deserialize_with = "scalar_map")]
    #[schema(value_type = Object)]
    pub filters: BTreeMap<String, String>,

    #[serde(deserialize_with = "scalar_map")]
    #[schema(value_type = Object)]
    pub relation_filters: BTreeMap<String, String>,

    #[schema(value_type = Object)]
    pub custom_filters: BTreeMap<String, Value>,

    pub order_by: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl FilterRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn relation_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.relation_filters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn custom_filter(mut self, method: impl Into<String>, value: Value) -> Self {
        self.custom_filters.insert(method.into(), value);
        self
    }

    #[must_use]
    pub fn order_by(mut self, spec: impl Into<String>) -> Self {
        self.order_by = Some(spec.into());
        self
    }

    #[must_use]
    pub fn page(mut self, page: u64, per_page: u64) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Whether a key's value is ignored: its operator is unary or unknown.
fn ignores_value(key: &str) -> bool {
    key.split_once(':')
        .and_then(|(_, token)| Operator::from_token(token))
        .is_none_or(|operator| operator.arity() == Arity::Unary)
}

fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(key, value)| {
            let text = match &value {
                Value::Null if ignores_value(&key) => Some(String::new()),
                Value::Null => {
                    return Err(serde::de::Error::custom(format!(
                        "filter '{key}' is null; use the null or nNull operator to match missing values"
                    )));
                }
                Value::Array(items) => items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Option<Vec<_>>>()
                    .map(|parts| parts.join(",")),
                other => scalar_to_string(other),
            };
            text.map(|text| (key.clone(), text)).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "filter '{key}' must be a scalar or a list of scalars"
                ))
            })
        })
        .collect()
}

/// Query-string form of [`FilterRequest`] for GET endpoints.
///
/// The three maps travel as JSON-encoded strings, for example
/// `?filters={"category:eq":"Electronics"}&orderBy=-price&page=2`.
/// Convert with `FilterRequest::try_from(query)`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// JSON object of `field:operator` keys to values.
    #[param(example = r#"{"category:eq":"Electronics","price:gte":"500"}"#)]
    pub filters: Option<String>,
    /// JSON object of `relation.field:operator` keys to values.
    #[param(example = r#"{"provider.name:like":"mo"}"#)]
    pub relation_filters: Option<String>,
    /// JSON object of custom filter names to values.
    #[param(example = r#"{"stock":"low"}"#)]
    pub custom_filters: Option<String>,
    /// Field to order by, `-` prefix for descending.
    #[param(example = "-price")]
    pub order_by: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn parse_param(name: &str, raw: Option<String>) -> Result<Option<Value>, ApiError> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|err| ApiError::bad_request(format!("Invalid JSON in '{name}' parameter: {err}")))
}

impl TryFrom<FilterQuery> for FilterRequest {
    type Error = ApiError;

    fn try_from(query: FilterQuery) -> Result<Self, Self::Error> {
        let mut body = Map::new();
        for (name, raw) in [
            ("filters", query.filters),
            ("relationFilters", query.relation_filters),
            ("customFilters", query.custom_filters),
        ] {
            if let Some(value) = parse_param(name, raw)? {
                body.insert(name.to_string(), value);
            }
        }
        if let Some(order_by) = query.order_by {
            body.insert("orderBy".to_string(), Value::String(order_by));
        }
        if let Some(page) = query.page {
            body.insert("page".to_string(), Value::from(page));
        }
        if let Some(per_page) = query.per_page {
            body.insert("perPage".to_string(), Value::from(per_page));
        }

        serde_json::from_value(Value::Object(body))
            .map_err(|err| ApiError::bad_request(format!("Invalid filter request: {err}")))
    }
}
