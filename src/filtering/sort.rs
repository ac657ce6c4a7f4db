use super::allow_list::AllowList;
use super::context::{QueryContext, SortDirection};
use crate::config::FilterConfig;
use crate::errors::FilterError;

/// Split an `orderBy` value into field and direction: a leading `-` means
/// descending, anything else ascending.
#[must_use]
pub fn parse_order_spec(spec: &str) -> (&str, SortDirection) {
    match spec.strip_prefix('-') {
        Some(field) => (field, SortDirection::Desc),
        None => (spec, SortDirection::Asc),
    }
}

/// Add the request's single sort key. An absent or blank `orderBy` adds
/// nothing; no default order is imposed.
///
/// # Errors
///
/// Under `FilterPolicy::Reject`, `FilterError::DisallowedOrderField` when the
/// field is not orderable.
pub fn compile_order(
    ctx: &mut dyn QueryContext,
    allow_list: &AllowList,
    config: &FilterConfig,
    order_by: Option<&str>,
) -> Result<(), FilterError> {
    let Some(spec) = order_by.map(str::trim).filter(|spec| !spec.is_empty()) else {
        return Ok(());
    };

    let (field, direction) = parse_order_spec(spec);
    if !allow_list.is_allowed_order(field) {
        return config.policy.enforce(FilterError::DisallowedOrderField {
            field: field.to_string(),
        });
    }
    ctx.add_order(field, direction);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterPolicy;
    use crate::filtering::PredicateTree;

    fn allow_list() -> AllowList {
        AllowList::new().with_ordering(["price", "name"])
    }

    fn order(spec: Option<&str>, config: &FilterConfig) -> Result<PredicateTree, FilterError> {
        let mut tree = PredicateTree::new();
        compile_order(&mut tree, &allow_list(), config, spec)?;
        Ok(tree)
    }

    #[test]
    fn test_parse_order_spec() {
        assert_eq!(parse_order_spec("-price"), ("price", SortDirection::Desc));
        assert_eq!(parse_order_spec("price"), ("price", SortDirection::Asc));
        assert_eq!(parse_order_spec("--price"), ("-price", SortDirection::Desc));
    }

    #[test]
    fn test_descending_and_ascending() {
        let config = FilterConfig::default();
        assert_eq!(
            order(Some("-price"), &config).unwrap().orders(),
            &[("price".to_string(), SortDirection::Desc)]
        );
        assert_eq!(
            order(Some("price"), &config).unwrap().orders(),
            &[("price".to_string(), SortDirection::Asc)]
        );
    }

    #[test]
    fn test_absent_or_blank_imposes_no_order() {
        let config = FilterConfig::default();
        assert!(order(None, &config).unwrap().is_empty());
        assert!(order(Some("  "), &config).unwrap().is_empty());
    }

    #[test]
    fn test_disallowed_order_field() {
        let err = order(Some("-stock"), &FilterConfig::default()).unwrap_err();
        assert_eq!(
            err,
            FilterError::DisallowedOrderField {
                field: "stock".into()
            }
        );

        let silent = FilterConfig::default().with_policy(FilterPolicy::Silent);
        assert!(order(Some("-stock"), &silent).unwrap().is_empty());
    }

    #[test]
    fn test_multiple_keys_are_not_split() {
        let err = order(Some("price,name"), &FilterConfig::default()).unwrap_err();
        assert_eq!(err.key(), "price,name");
    }
}
