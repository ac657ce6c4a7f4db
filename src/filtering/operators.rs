//! The operator table of the filter mini-language.
//!
//! Every `field:operator` key resolves its operator token here. The table is a
//! fixed set of sixteen entries; tokens are case-sensitive (`nLike`, not
//! `nlike`). Tokens outside the table are not errors, they simply add no
//! predicate (see [`Operator::from_token`]).

use std::fmt;

/// How an operator consumes the raw request value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// The value is ignored (`null`, `nNull`)
    Unary,
    /// The value is used as a single operand
    Binary,
    /// The value is a comma-separated list (`in`, `nIn`)
    ListValued,
    /// The value is a comma-separated pair of bounds (`between`, `nBetween`)
    RangeValued,
}

/// Static description of one operator table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    pub token: &'static str,
    pub arity: Arity,
    pub sql_form: &'static str,
}

/// Filter operators, one per token of the mini-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `eq` (=)
    Eq,
    /// `neq` (!=)
    Neq,
    /// `gt` (>)
    Gt,
    /// `lt` (<)
    Lt,
    /// `gte` (>=)
    Gte,
    /// `lte` (<=)
    Lte,
    /// `like`, value wrapped as `%value%`
    Like,
    /// `nLike`
    NotLike,
    /// `null` (IS NULL)
    Null,
    /// `nNull` (IS NOT NULL)
    NotNull,
    /// `in`
    In,
    /// `nIn`
    NotIn,
    /// `between`
    Between,
    /// `nBetween`
    NotBetween,
    /// `regexp`
    Regexp,
    /// `nRegexp`
    NotRegexp,
}

impl Operator {
    /// Every operator in table order.
    pub const ALL: [Self; 16] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::Like,
        Self::NotLike,
        Self::Null,
        Self::NotNull,
        Self::In,
        Self::NotIn,
        Self::Between,
        Self::NotBetween,
        Self::Regexp,
        Self::NotRegexp,
    ];

    /// Resolve a token from a filter key. Returns `None` for anything outside
    /// the table.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }

    #[must_use]
    pub const fn spec(self) -> OperatorSpec {
        let (token, arity, sql_form) = match self {
            Self::Eq => ("eq", Arity::Binary, "="),
            Self::Neq => ("neq", Arity::Binary, "!="),
            Self::Gt => ("gt", Arity::Binary, ">"),
            Self::Lt => ("lt", Arity::Binary, "<"),
            Self::Gte => ("gte", Arity::Binary, ">="),
            Self::Lte => ("lte", Arity::Binary, "<="),
            Self::Like => ("like", Arity::Binary, "LIKE"),
            Self::NotLike => ("nLike", Arity::Binary, "NOT LIKE"),
            Self::Null => ("null", Arity::Unary, "IS NULL"),
            Self::NotNull => ("nNull", Arity::Unary, "IS NOT NULL"),
            Self::In => ("in", Arity::ListValued, "IN"),
            Self::NotIn => ("nIn", Arity::ListValued, "NOT IN"),
            Self::Between => ("between", Arity::RangeValued, "BETWEEN"),
            Self::NotBetween => ("nBetween", Arity::RangeValued, "NOT BETWEEN"),
            Self::Regexp => ("regexp", Arity::Binary, "REGEXP"),
            Self::NotRegexp => ("nRegexp", Arity::Binary, "NOT REGEXP"),
        };
        OperatorSpec {
            token,
            arity,
            sql_form,
        }
    }

    #[must_use]
    pub const fn token(self) -> &'static str {
        self.spec().token
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        self.spec().arity
    }

    #[must_use]
    pub const fn sql_form(self) -> &'static str {
        self.spec().sql_form
    }

    /// True for the `n`-prefixed variants.
    #[must_use]
    pub const fn is_negated(self) -> bool {
        matches!(
            self,
            Self::Neq
                | Self::NotLike
                | Self::NotNull
                | Self::NotIn
                | Self::NotBetween
                | Self::NotRegexp
        )
    }

    /// The direct comparison this operator maps to, for operators whose value
    /// is passed through unchanged.
    #[must_use]
    pub const fn comparison(self) -> Option<Comparison> {
        match self {
            Self::Eq => Some(Comparison::Eq),
            Self::Neq => Some(Comparison::Neq),
            Self::Gt => Some(Comparison::Gt),
            Self::Lt => Some(Comparison::Lt),
            Self::Gte => Some(Comparison::Gte),
            Self::Lte => Some(Comparison::Lte),
            Self::Regexp => Some(Comparison::Regexp),
            Self::NotRegexp => Some(Comparison::NotRegexp),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Direct comparisons handed to [`QueryContext::add_comparison`](super::QueryContext::add_comparison).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Regexp,
    NotRegexp,
}

impl Comparison {
    #[must_use]
    pub const fn sql_form(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Regexp => "REGEXP",
            Self::NotRegexp => "NOT REGEXP",
        }
    }
}
