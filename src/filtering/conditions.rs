use std::collections::BTreeMap;

use super::allow_list::AllowList;
use super::context::QueryContext;
use super::key::parse_filter_key;
use super::operators::{Arity, Operator};
use super::predicate::Predicate;
use crate::config::FilterConfig;
use crate::errors::FilterError;

fn malformed(key: &str, reason: impl Into<String>) -> FilterError {
    FilterError::MalformedValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Split a comma-separated value, trimming each item.
fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|item| item.trim().to_string()).collect()
}

/// Build the predicate for an already validated field and resolved operator.
///
/// `key` is only used to name the value in errors.
///
/// # Errors
///
/// Returns `FilterError::MalformedValue` when the value exceeds
/// `max_value_length`, or when a range operator does not receive exactly two
/// non-empty bounds.
pub fn compile_condition(
    key: &str,
    field: &str,
    operator: Operator,
    value: &str,
    max_value_length: usize,
) -> Result<Predicate, FilterError> {
    let negated = operator.is_negated();
    let field = field.to_string();

    if operator.arity() != Arity::Unary && value.len() > max_value_length {
        return Err(malformed(
            key,
            format!("value exceeds {max_value_length} characters"),
        ));
    }

    Ok(match operator.arity() {
        Arity::Unary => Predicate::Null { field, negated },
        Arity::ListValued => Predicate::Set {
            field,
            values: split_list(value),
            negated,
        },
        Arity::RangeValued => {
            let bounds = split_list(value);
            match bounds.as_slice() {
                [low, high] if !low.is_empty() && !high.is_empty() => Predicate::Range {
                    field,
                    low: low.clone(),
                    high: high.clone(),
                    negated,
                },
                _ => {
                    return Err(malformed(
                        key,
                        format!(
                            "{operator} expects two comma-separated bounds, got {}",
                            bounds.len()
                        ),
                    ));
                }
            }
        }
        Arity::Binary => match operator.comparison() {
            Some(comparison) => Predicate::Comparison {
                field,
                comparison,
                value: value.to_string(),
            },
            None => Predicate::Pattern {
                field,
                pattern: format!("%{value}%"),
                negated,
            },
        },
    })
}

/// Compile the standard `field:operator` filters of a request.
///
/// Keys without a `:` and unknown operators are skipped. Fields outside the
/// allow-list and malformed values go through the configured policy.
///
/// # Errors
///
/// Under `FilterPolicy::Reject`, the first disallowed field or malformed value.
pub fn compile_filters(
    ctx: &mut dyn QueryContext,
    allow_list: &AllowList,
    config: &FilterConfig,
    filters: &BTreeMap<String, String>,
) -> Result<(), FilterError> {
    for (key, value) in filters {
        let Some((field, token)) = parse_filter_key(key).parts() else {
            tracing::debug!(key = %key, "Ignoring filter key without operator");
            continue;
        };

        if !allow_list.is_allowed_field(field) {
            config.policy.enforce(FilterError::DisallowedField {
                field: field.to_string(),
            })?;
            continue;
        }

        let Some(operator) = Operator::from_token(token) else {
            tracing::debug!(key = %key, operator = %token, "Ignoring unknown filter operator");
            continue;
        };

        match compile_condition(key, field, operator, value, config.max_value_length) {
            Ok(predicate) => predicate.apply(ctx),
            Err(err) => config.policy.enforce(err)?,
        }
    }
    Ok(())
}
