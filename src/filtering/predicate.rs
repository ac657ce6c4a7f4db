//! Structured predicates and the recording [`PredicateTree`] context.

use std::fmt;

use super::context::{QueryContext, SortDirection};
use super::operators::Comparison;

/// One compiled conjunct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Comparison {
        field: String,
        comparison: Comparison,
        value: String,
    },
    Null {
        field: String,
        negated: bool,
    },
    Set {
        field: String,
        values: Vec<String>,
        negated: bool,
    },
    Range {
        field: String,
        low: String,
        high: String,
        negated: bool,
    },
    Pattern {
        field: String,
        pattern: String,
        negated: bool,
    },
    Exists {
        relation: String,
        predicates: Vec<Predicate>,
    },
}

impl Predicate {
    /// Replay this predicate into a query context.
    pub fn apply(&self, ctx: &mut dyn QueryContext) {
        match self {
            Self::Comparison {
                field,
                comparison,
                value,
            } => ctx.add_comparison(field, *comparison, value),
            Self::Null { field, negated } => ctx.add_null_check(field, *negated),
            Self::Set {
                field,
                values,
                negated,
            } => ctx.add_set(field, values, *negated),
            Self::Range {
                field,
                low,
                high,
                negated,
            } => ctx.add_range(field, low, high, *negated),
            Self::Pattern {
                field,
                pattern,
                negated,
            } => ctx.add_pattern(field, pattern, *negated),
            Self::Exists {
                relation,
                predicates,
            } => ctx.add_exists_subquery(relation, &mut |inner| {
                for predicate in predicates {
                    predicate.apply(inner);
                }
            }),
        }
    }
}

/// Numeric-looking literals render bare, everything else single-quoted.
fn literal(value: &str) -> String {
    if value.parse::<f64>().is_ok_and(f64::is_finite) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

fn not(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

fn write_conjunction(f: &mut fmt::Formatter<'_>, predicates: &[Predicate]) -> fmt::Result {
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            f.write_str(" AND ")?;
        }
        write!(f, "{predicate}")?;
    }
    Ok(())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison {
                field,
                comparison,
                value,
            } => write!(f, "{field} {} {}", comparison.sql_form(), literal(value)),
            Self::Null { field, negated } => write!(f, "{field} IS {}NULL", not(*negated)),
            Self::Set {
                field,
                values,
                negated,
            } => {
                let items: Vec<String> = values.iter().map(|v| literal(v)).collect();
                write!(f, "{field} {}IN ({})", not(*negated), items.join(", "))
            }
            Self::Range {
                field,
                low,
                high,
                negated,
            } => write!(
                f,
                "{field} {}BETWEEN {} AND {}",
                not(*negated),
                literal(low),
                literal(high)
            ),
            Self::Pattern {
                field,
                pattern,
                negated,
            } => write!(f, "{field} {}LIKE {}", not(*negated), literal(pattern)),
            Self::Exists {
                relation,
                predicates,
            } => {
                write!(f, "EXISTS({relation} WHERE ")?;
                write_conjunction(f, predicates)?;
                f.write_str(")")
            }
        }
    }
}

/// A [`QueryContext`] that records what the compiler emits.
///
/// Useful on its own for tests and caching keys, and as an in-memory query
/// engine via [`PredicateTree::matches`] and [`PredicateTree::apply_to`].
///
/// ```rust
/// use dynfilter::{AllowList, FilterCompiler, FilterRequest, PredicateTree};
///
/// let allow_list = AllowList::new().with_filters(["category", "price"]);
/// let request: FilterRequest = serde_json::from_value(serde_json::json!({
///     "filters": { "category:eq": "Electronics", "price:gte": "500" }
/// })).unwrap();
///
/// let tree = FilterCompiler::new("Product", &allow_list)
///     .apply(PredicateTree::new(), &request)
///     .unwrap();
/// assert_eq!(tree.to_string(), "category = 'Electronics' AND price >= 500");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateTree {
    predicates: Vec<Predicate>,
    orders: Vec<(String, SortDirection)>,
}

impl PredicateTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn orders(&self) -> &[(String, SortDirection)] {
        &self.orders
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.orders.is_empty()
    }
}

impl QueryContext for PredicateTree {
    fn add_comparison(&mut self, field: &str, comparison: Comparison, value: &str) {
        self.predicates.push(Predicate::Comparison {
            field: field.to_string(),
            comparison,
            value: value.to_string(),
        });
    }

    fn add_null_check(&mut self, field: &str, negated: bool) {
        self.predicates.push(Predicate::Null {
            field: field.to_string(),
            negated,
        });
    }

    fn add_set(&mut self, field: &str, values: &[String], negated: bool) {
        self.predicates.push(Predicate::Set {
            field: field.to_string(),
            values: values.to_vec(),
            negated,
        });
    }

    fn add_range(&mut self, field: &str, low: &str, high: &str, negated: bool) {
        self.predicates.push(Predicate::Range {
            field: field.to_string(),
            low: low.to_string(),
            high: high.to_string(),
            negated,
        });
    }

    fn add_pattern(&mut self, field: &str, pattern: &str, negated: bool) {
        self.predicates.push(Predicate::Pattern {
            field: field.to_string(),
            pattern: pattern.to_string(),
            negated,
        });
    }

    fn add_exists_subquery(&mut self, relation: &str, build: &mut dyn FnMut(&mut dyn QueryContext)) {
        let mut inner = Self::new();
        build(&mut inner);
        self.predicates.push(Predicate::Exists {
            relation: relation.to_string(),
            predicates: inner.predicates,
        });
    }

    fn add_order(&mut self, field: &str, direction: SortDirection) {
        self.orders.push((field.to_string(), direction));
    }
}

impl fmt::Display for PredicateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_conjunction(f, &self.predicates)?;
        for (i, (field, direction)) in self.orders.iter().enumerate() {
            let lead = match (i, self.predicates.is_empty()) {
                (0, true) => "ORDER BY ",
                (0, false) => " ORDER BY ",
                _ => ", ",
            };
            write!(f, "{lead}{field} {direction}")?;
        }
        Ok(())
    }
}
