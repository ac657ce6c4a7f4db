use std::fmt;

use super::operators::Comparison;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

impl From<SortDirection> for sea_orm::Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

/// The query-building target the compiler writes into.
///
/// Every call adds one conjunct (AND) to the query. Values arrive as the raw
/// request strings; typing and binding them is up to the implementation.
/// Field and relation names have already passed the allow-list when the
/// compiler calls these methods, but custom filter handlers call them directly.
///
/// Implemented by [`PredicateTree`](super::PredicateTree) (in memory) and
/// [`SeaOrmContext`](super::SeaOrmContext) (Sea-ORM conditions).
pub trait QueryContext {
    /// `field <op> value` for `=`, `!=`, `>`, `<`, `>=`, `<=`, `REGEXP`, `NOT REGEXP`.
    fn add_comparison(&mut self, field: &str, comparison: Comparison, value: &str);

    /// `field IS NULL`, or `IS NOT NULL` when negated.
    fn add_null_check(&mut self, field: &str, negated: bool);

    /// `field IN (values)`, or `NOT IN` when negated.
    fn add_set(&mut self, field: &str, values: &[String], negated: bool);

    /// `field BETWEEN low AND high`, or `NOT BETWEEN` when negated.
    fn add_range(&mut self, field: &str, low: &str, high: &str, negated: bool);

    /// `field LIKE pattern`, or `NOT LIKE` when negated. The pattern already
    /// carries its wildcards.
    fn add_pattern(&mut self, field: &str, pattern: &str, negated: bool);

    /// "At least one related row satisfies the predicates `build` adds to the
    /// inner context."
    fn add_exists_subquery(&mut self, relation: &str, build: &mut dyn FnMut(&mut dyn QueryContext));

    fn add_order(&mut self, field: &str, direction: SortDirection);
}

impl<T: QueryContext + ?Sized> QueryContext for &mut T {
    fn add_comparison(&mut self, field: &str, comparison: Comparison, value: &str) {
        (**self).add_comparison(field, comparison, value);
    }

    fn add_null_check(&mut self, field: &str, negated: bool) {
        (**self).add_null_check(field, negated);
    }

    fn add_set(&mut self, field: &str, values: &[String], negated: bool) {
        (**self).add_set(field, values, negated);
    }

    fn add_range(&mut self, field: &str, low: &str, high: &str, negated: bool) {
        (**self).add_range(field, low, high, negated);
    }

    fn add_pattern(&mut self, field: &str, pattern: &str, negated: bool) {
        (**self).add_pattern(field, pattern, negated);
    }

    fn add_exists_subquery(&mut self, relation: &str, build: &mut dyn FnMut(&mut dyn QueryContext)) {
        (**self).add_exists_subquery(relation, build);
    }

    fn add_order(&mut self, field: &str, direction: SortDirection) {
        (**self).add_order(field, direction);
    }
}
