//! Allow-listed query filtering for Axum and Sea-ORM APIs.
//!
//! Clients send `field:operator` filters, relation filters, named custom
//! filters and a sort key. Each entity declares what may be filtered and
//! sorted in an [`AllowList`]; the [`FilterCompiler`] turns the request into
//! predicates on a [`QueryContext`], rejecting (or, if configured, dropping)
//! everything else.

pub mod attributes;
pub mod config;
pub mod connection;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod records;
pub mod response;

pub use attributes::{AttributeCodec, AttributeKind, AttributeTable, FieldDescriptor};
pub use config::{FilterConfig, FilterPolicy, MAX_FIELD_VALUE_LENGTH};
pub use connection::{connect, connect_options};
pub use errors::{ApiError, FilterError};
pub use filtering::{
    AllowList, Comparison, CustomFilterRegistry, FilterCompiler, FilterMethods, Filterable,
    Operator, Predicate, PredicateTree, QueryContext, RelationLink, SeaOrmContext, SortDirection,
    ValueKind, scope_filter,
};
pub use models::{FilterQuery, FilterRequest};
pub use records::{PivotLink, RecordOperations, save_many_to_many};
pub use response::{ApiResponse, PageRequest, Pagination};

/// Implement [`Filterable`] with an allow-list built once on first use.
///
/// Usage: `impl_filterable!(Product, "Product", AllowList::new().with_filters(["price"]))`;
#[macro_export]
macro_rules! impl_filterable {
    ($ty:ty, $name:expr, $allow_list:expr) => {
        impl $crate::Filterable for $ty {
            const ENTITY_NAME: &'static str = $name;

            fn allow_list() -> &'static $crate::AllowList {
                static ALLOW_LIST: ::std::sync::LazyLock<$crate::AllowList> =
                    ::std::sync::LazyLock::new(|| $allow_list);
                &ALLOW_LIST
            }
        }
    };
}
