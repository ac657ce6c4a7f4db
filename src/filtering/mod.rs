//! # Filtering
//!
//! Turns a [`FilterRequest`](crate::FilterRequest) into query predicates,
//! letting through only what the entity's [`AllowList`] permits.
//!
//! ## Request shape
//!
//! ```json
//! {
//!   "filters": { "category:eq": "Electronics", "price:between": "100,500" },
//!   "relationFilters": { "provider.name:like": "mo" },
//!   "customFilters": { "stock": "low" },
//!   "orderBy": "-price"
//! }
//! ```
//!
//! - `filters`: `field:operator` keys, see [`Operator`] for the tokens.
//! - `relationFilters`: `relation.field:operator` keys, each compiled to an
//!   existential subquery on the related rows.
//! - `customFilters`: named handlers registered per entity in a
//!   [`CustomFilterRegistry`].
//! - `orderBy`: one field, `-` prefix for descending.
//!
//! ## Targets
//!
//! The compiler writes into anything implementing [`QueryContext`]:
//!
//! - [`SeaOrmContext`] builds a `sea_orm::Condition` with bound values.
//! - [`PredicateTree`] keeps the predicates in memory, renders them as text
//!   and can evaluate them against JSON rows.

pub mod allow_list;
pub mod compiler;
pub mod conditions;
pub mod context;
pub mod custom;
pub mod database;
pub mod key;
pub mod memory;
pub mod operators;
pub mod predicate;
pub mod relations;
pub mod sort;

pub use allow_list::{AllowList, Filterable, SENSITIVE_FIELDS, is_sensitive};
pub use compiler::{FilterCompiler, scope_filter};
pub use conditions::{compile_condition, compile_filters};
pub use context::{QueryContext, SortDirection};
pub use custom::{CustomFilterRegistry, CustomFilters, FilterMethods, MethodCall, dispatch_custom};
pub use database::{RelationLink, SeaOrmContext, ValueKind};
pub use key::{FilterKey, parse_filter_key, parse_relation_key};
pub use operators::{Arity, Comparison, Operator, OperatorSpec};
pub use predicate::{Predicate, PredicateTree};
pub use relations::{compile_relation, compile_relation_filters};
pub use sort::{compile_order, parse_order_spec};
