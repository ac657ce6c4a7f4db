//! Filter-key grammar.
//!
//! Standard keys are `field:operator`, relation keys are
//! `relation.field:operator`. Parsing never fails: a key without the expected
//! separators yields an incomplete [`FilterKey`] that the compiler ignores.

/// A parsed filter key, borrowing from the raw request key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterKey<'a> {
    pub relation: Option<&'a str>,
    pub field: Option<&'a str>,
    pub operator: Option<&'a str>,
}

impl<'a> FilterKey<'a> {
    /// Field and operator, if both were present.
    #[must_use]
    pub fn parts(&self) -> Option<(&'a str, &'a str)> {
        self.field.zip(self.operator)
    }
}

/// Split a standard key on its first `:`.
///
/// - `"price:gte"` -> field `price`, operator `gte`
/// - `"price:gte:x"` -> field `price`, operator `gte:x` (unknown, ignored later)
/// - `"price"` -> neither field nor operator
#[must_use]
pub fn parse_filter_key(raw: &str) -> FilterKey<'_> {
    match raw.split_once(':') {
        Some((field, operator)) => FilterKey {
            relation: None,
            field: Some(field),
            operator: Some(operator),
        },
        None => FilterKey::default(),
    }
}

/// Split a relation key on its first `.`, then parse the remainder as a
/// standard key. A key without `.` is not a relation key and comes back empty.
///
/// - `"provider.name:like"` -> relation `provider`, field `name`, operator `like`
/// - `"provider.name"` -> relation `provider`, no field or operator
#[must_use]
pub fn parse_relation_key(raw: &str) -> FilterKey<'_> {
    let Some((relation, remainder)) = raw.split_once('.') else {
        return FilterKey::default();
    };
    FilterKey {
        relation: Some(relation),
        ..parse_filter_key(remainder)
    }
}
