//! Per-entity allow-lists.
//!
//! Nothing is filterable, orderable, or traversable unless the entity lists
//! it. Sensitive columns are stripped on construction and re-checked on every
//! lookup, so configuration cannot opt them back in.

use std::collections::{BTreeMap, BTreeSet};

/// Columns that never appear in a filter, relation field surface, or ordering,
/// whatever the entity configures.
pub const SENSITIVE_FIELDS: [&str; 2] = ["password", "api_token"];

#[must_use]
pub fn is_sensitive(field: &str) -> bool {
    SENSITIVE_FIELDS.contains(&field)
}

fn collect_fields<I, S>(fields: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields
        .into_iter()
        .map(Into::into)
        .filter(|field| !is_sensitive(field))
}

/// The filter, relation, and ordering surface of one entity.
///
/// Built once (typically in a `LazyLock`) and shared read-only across requests.
///
/// ```rust
/// use dynfilter::AllowList;
///
/// let provider = AllowList::new().with_filters(["name", "country"]);
/// let product = AllowList::new()
///     .with_filters(["category", "price", "password"])
///     .with_ordering(["price", "name"])
///     .with_relation("provider", &provider);
///
/// assert!(product.is_allowed_field("price"));
/// assert!(!product.is_allowed_field("password"));
/// assert!(product.is_allowed_relation_field("provider", "name"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    filters: BTreeSet<String>,
    relations: BTreeMap<String, BTreeSet<String>>,
    ordering: BTreeSet<String>,
}

impl AllowList {
    /// An empty allow-list rejects every key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filters<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.extend(collect_fields(fields));
        self
    }

    #[must_use]
    pub fn with_ordering<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordering.extend(collect_fields(fields));
        self
    }

    /// Allow a relation whose filterable fields are the related entity's own
    /// allowed filters.
    #[must_use]
    pub fn with_relation(self, name: impl Into<String>, related: &AllowList) -> Self {
        self.with_relation_fields(name, related.filters.iter().cloned())
    }

    /// Allow a relation with an explicit field surface.
    #[must_use]
    pub fn with_relation_fields<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations
            .entry(name.into())
            .or_default()
            .extend(collect_fields(fields));
        self
    }

    #[must_use]
    pub fn is_allowed_field(&self, field: &str) -> bool {
        !is_sensitive(field) && self.filters.contains(field)
    }

    #[must_use]
    pub fn is_allowed_relation(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    #[must_use]
    pub fn is_allowed_relation_field(&self, relation: &str, field: &str) -> bool {
        !is_sensitive(field)
            && self
                .relations
                .get(relation)
                .is_some_and(|fields| fields.contains(field))
    }

    #[must_use]
    pub fn is_allowed_order(&self, field: &str) -> bool {
        !is_sensitive(field) && self.ordering.contains(field)
    }

    pub fn allowed_filters(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(String::as_str)
    }

    pub fn allowed_relations(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub fn allowed_ordering(&self) -> impl Iterator<Item = &str> {
        self.ordering.iter().map(String::as_str)
    }
}

/// Static filter configuration of an entity type.
///
/// `ENTITY_NAME` keys the custom filter registry; `allow_list` is resolved once
/// per process.
///
/// ```rust
/// use std::sync::LazyLock;
/// use dynfilter::{AllowList, Filterable};
///
/// struct Product;
///
/// static PRODUCT_FILTERS: LazyLock<AllowList> =
///     LazyLock::new(|| AllowList::new().with_filters(["category", "price"]));
///
/// impl Filterable for Product {
///     const ENTITY_NAME: &'static str = "Product";
///
///     fn allow_list() -> &'static AllowList {
///         &PRODUCT_FILTERS
///     }
/// }
///
/// assert!(Product::allow_list().is_allowed_field("category"));
/// ```
pub trait Filterable {
    const ENTITY_NAME: &'static str;

    fn allow_list() -> &'static AllowList;
}
