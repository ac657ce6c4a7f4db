//! Sea-ORM query context.
//!
//! [`SeaOrmContext`] turns compiled predicates into a `sea_orm::Condition`
//! over one table. Column names go through `Alias` and every value is bound
//! as a parameter, so nothing from the request is spliced into SQL text.
//! Values are typed by their column: contexts built with
//! [`SeaOrmContext::for_entity`] read the entity's column definitions, and
//! columns with no known type are bound as text.

use std::collections::BTreeMap;

use sea_orm::{
    ColumnTrait, ColumnType, Condition, DatabaseBackend, EntityName, EntityTrait, IdenStatic,
    Iterable, QueryFilter, QueryOrder, Select,
    sea_query::{Alias, Expr, Query, SimpleExpr},
};
use uuid::Uuid;

use super::context::{QueryContext, SortDirection};
use super::operators::Comparison;

/// How a relation's table correlates with its parent.
///
/// The existential subquery is
/// `EXISTS (SELECT 1 FROM table WHERE table.related_key = parent.parent_key AND ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLink {
    pub table: String,
    pub related_key: String,
    pub parent_key: String,
    pub columns: BTreeMap<String, ValueKind>,
}

impl RelationLink {
    pub fn new(
        table: impl Into<String>,
        related_key: impl Into<String>,
        parent_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            related_key: related_key.into(),
            parent_key: parent_key.into(),
            columns: BTreeMap::new(),
        }
    }

    /// The parent row holds the foreign key (`related.id = parent.foreign_key`).
    pub fn belongs_to(table: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(table, "id", foreign_key)
    }

    /// The related rows hold the foreign key (`related.foreign_key = parent.id`).
    pub fn has_many(table: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(table, foreign_key, "id")
    }

    /// Bind values in the related table by `E`'s column types.
    #[must_use]
    pub fn with_columns_of<E: EntityTrait>(mut self) -> Self {
        self.columns = column_kinds::<E>();
        self
    }

    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.columns.insert(name.into(), kind);
        self
    }
}

/// The SQL type a request value is bound as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueKind {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Uuid,
}

impl ValueKind {
    #[must_use]
    pub fn of(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned => Self::Integer,
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => {
                Self::Float
            }
            ColumnType::Boolean => Self::Boolean,
            ColumnType::Uuid => Self::Uuid,
            _ => Self::Text,
        }
    }

    /// Bind `raw` as this kind. A value that does not parse is bound as text.
    #[must_use]
    pub fn bind(self, raw: &str) -> sea_orm::Value {
        let trimmed = raw.trim();
        let typed: Option<sea_orm::Value> = match self {
            Self::Text => None,
            Self::Integer => trimmed.parse::<i64>().ok().map(Into::into),
            Self::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|float| float.is_finite())
                .map(Into::into),
            Self::Boolean => match trimmed {
                "true" | "1" => Some(true.into()),
                "false" | "0" => Some(false.into()),
                _ => None,
            },
            Self::Uuid => Uuid::parse_str(trimmed).ok().map(Into::into),
        };
        typed.unwrap_or_else(|| raw.to_string().into())
    }
}

fn column_kinds<E: EntityTrait>() -> BTreeMap<String, ValueKind> {
    E::Column::iter()
        .map(|column| {
            (
                column.as_str().to_string(),
                ValueKind::of(column.def().get_column_type()),
            )
        })
        .collect()
}

/// Condition and ordering for one table, ready to attach to a Sea-ORM query.
///
/// ```rust
/// use dynfilter::{Comparison, QueryContext, RelationLink, SeaOrmContext};
///
/// let mut ctx = SeaOrmContext::new("products")
///     .with_relation("provider", RelationLink::belongs_to("providers", "provider_id"));
/// ctx.add_comparison("price", Comparison::Gte, "500");
/// assert!(!ctx.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SeaOrmContext {
    table: String,
    backend: DatabaseBackend,
    condition: Condition,
    predicates: usize,
    orders: Vec<(String, SortDirection)>,
    relations: BTreeMap<String, RelationLink>,
    columns: BTreeMap<String, ValueKind>,
}

impl SeaOrmContext {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            backend: DatabaseBackend::Sqlite,
            condition: Condition::all(),
            predicates: 0,
            orders: Vec::new(),
            relations: BTreeMap::new(),
            columns: BTreeMap::new(),
        }
    }

    /// A context over `E`'s table, binding values by `E`'s column types.
    #[must_use]
    pub fn for_entity<E: EntityTrait>() -> Self {
        let mut ctx = Self::new(E::default().table_name());
        ctx.columns = column_kinds::<E>();
        ctx
    }

    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.columns.insert(name.into(), kind);
        self
    }

    /// Backend used to pick the regular-expression operator
    /// (`~` on Postgres, `REGEXP` elsewhere). Defaults to SQLite.
    #[must_use]
    pub fn with_backend(mut self, backend: DatabaseBackend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_relation(mut self, name: impl Into<String>, link: RelationLink) -> Self {
        self.relations.insert(name.into(), link);
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// True when no predicate has been added. Ordering does not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates == 0
    }

    #[must_use]
    pub fn condition(&self) -> Condition {
        self.condition.clone()
    }

    #[must_use]
    pub fn orders(&self) -> &[(String, SortDirection)] {
        &self.orders
    }

    /// Attach the condition and ordering to a select.
    #[must_use]
    pub fn apply_to<E: EntityTrait>(self, select: Select<E>) -> Select<E> {
        let table = Alias::new(&self.table);
        let mut select = select.filter(self.condition);
        for (field, direction) in self.orders {
            let column = SimpleExpr::from(Expr::col((table.clone(), Alias::new(field))));
            select = select.order_by(column, direction.into());
        }
        select
    }

    fn bind(&self, field: &str, raw: &str) -> sea_orm::Value {
        self.columns.get(field).copied().unwrap_or_default().bind(raw)
    }

    fn column(&self, field: &str) -> Expr {
        Expr::col((Alias::new(&self.table), Alias::new(field)))
    }

    fn push(&mut self, expr: SimpleExpr) {
        let condition = std::mem::replace(&mut self.condition, Condition::all());
        self.condition = condition.add(expr);
        self.predicates += 1;
    }

    fn regexp(&self, field: &str, pattern: &str, negated: bool) -> SimpleExpr {
        let template = match (self.backend, negated) {
            (DatabaseBackend::Postgres, false) => "$1 ~ $2",
            (DatabaseBackend::Postgres, true) => "$1 !~ $2",
            (_, false) => "$1 REGEXP $2",
            (_, true) => "$1 NOT REGEXP $2",
        };
        Expr::cust_with_exprs(template, [self.column(field).into(), Expr::val(pattern).into()])
    }
}

impl QueryContext for SeaOrmContext {
    fn add_comparison(&mut self, field: &str, comparison: Comparison, value: &str) {
        let column = self.column(field);
        let bound = self.bind(field, value);
        let expr = match comparison {
            Comparison::Eq => column.eq(bound),
            Comparison::Neq => column.ne(bound),
            Comparison::Gt => column.gt(bound),
            Comparison::Lt => column.lt(bound),
            Comparison::Gte => column.gte(bound),
            Comparison::Lte => column.lte(bound),
            Comparison::Regexp => self.regexp(field, value, false),
            Comparison::NotRegexp => self.regexp(field, value, true),
        };
        self.push(expr);
    }

    fn add_null_check(&mut self, field: &str, negated: bool) {
        let column = self.column(field);
        self.push(if negated {
            column.is_not_null()
        } else {
            column.is_null()
        });
    }

    fn add_set(&mut self, field: &str, values: &[String], negated: bool) {
        let column = self.column(field);
        let bound: Vec<sea_orm::Value> = values.iter().map(|value| self.bind(field, value)).collect();
        self.push(if negated {
            column.is_not_in(bound)
        } else {
            column.is_in(bound)
        });
    }

    fn add_range(&mut self, field: &str, low: &str, high: &str, negated: bool) {
        let column = self.column(field);
        let (low, high) = (self.bind(field, low), self.bind(field, high));
        self.push(if negated {
            column.not_between(low, high)
        } else {
            column.between(low, high)
        });
    }

    fn add_pattern(&mut self, field: &str, pattern: &str, negated: bool) {
        let column = self.column(field);
        self.push(if negated {
            column.not_like(pattern)
        } else {
            column.like(pattern)
        });
    }

    fn add_exists_subquery(&mut self, relation: &str, build: &mut dyn FnMut(&mut dyn QueryContext)) {
        let Some(link) = self.relations.get(relation).cloned() else {
            // Fail closed: an allowed relation this query cannot express matches nothing.
            tracing::warn!(relation, table = %self.table, "No link registered for relation");
            self.push(Expr::val(false).into());
            return;
        };

        let mut inner = Self::new(link.table.clone()).with_backend(self.backend);
        inner.columns = link.columns;
        build(&mut inner);

        let related = Alias::new(&link.table);
        let subquery = Query::select()
            .expr(Expr::val(1))
            .from(related.clone())
            .and_where(
                Expr::col((related, Alias::new(&link.related_key)))
                    .equals((Alias::new(&self.table), Alias::new(&link.parent_key))),
            )
            .cond_where(inner.condition)
            .to_owned();
        self.push(Expr::exists(subquery));
    }

    fn add_order(&mut self, field: &str, direction: SortDirection) {
        self.orders.push((field.to_string(), direction));
    }
}
