use std::collections::BTreeMap;

use super::allow_list::AllowList;
use super::conditions::compile_condition;
use super::context::QueryContext;
use super::key::parse_relation_key;
use super::operators::Operator;
use crate::config::FilterConfig;
use crate::errors::FilterError;

/// Compile one relation predicate: `field <operator> value` on at least one
/// related row, wrapped in an existential subquery on `relation`.
///
/// The field is checked against the relation's own field surface (the related
/// entity's allow-list), not against the parent's filters.
///
/// # Errors
///
/// Under `FilterPolicy::Reject`: a relation or relation field outside the
/// allow-list, or a malformed value.
pub fn compile_relation(
    ctx: &mut dyn QueryContext,
    allow_list: &AllowList,
    config: &FilterConfig,
    relation: &str,
    field: &str,
    token: &str,
    value: &str,
) -> Result<(), FilterError> {
    if !allow_list.is_allowed_relation(relation) {
        return config.policy.enforce(FilterError::DisallowedRelation {
            relation: relation.to_string(),
        });
    }
    if !allow_list.is_allowed_relation_field(relation, field) {
        return config.policy.enforce(FilterError::DisallowedRelationField {
            relation: relation.to_string(),
            field: field.to_string(),
        });
    }
    let Some(operator) = Operator::from_token(token) else {
        tracing::debug!(relation, field, operator = %token, "Ignoring unknown relation filter operator");
        return Ok(());
    };

    let key = format!("{relation}.{field}:{token}");
    let predicate = match compile_condition(&key, field, operator, value, config.max_value_length) {
        Ok(predicate) => predicate,
        Err(err) => return config.policy.enforce(err),
    };
    ctx.add_exists_subquery(relation, &mut |inner| predicate.apply(inner));
    Ok(())
}

/// Compile the `relation.field:operator` filters of a request. Keys without a
/// `.` or a `:` are skipped.
///
/// # Errors
///
/// See [`compile_relation`].
pub fn compile_relation_filters(
    ctx: &mut dyn QueryContext,
    allow_list: &AllowList,
    config: &FilterConfig,
    filters: &BTreeMap<String, String>,
) -> Result<(), FilterError> {
    for (key, value) in filters {
        let parsed = parse_relation_key(key);
        let (Some(relation), Some((field, token))) = (parsed.relation, parsed.parts()) else {
            tracing::debug!(key = %key, "Ignoring malformed relation filter key");
            continue;
        };
        compile_relation(ctx, allow_list, config, relation, field, token, value)?;
    }
    Ok(())
}
