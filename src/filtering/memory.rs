//! In-memory evaluation of compiled predicates against JSON rows.
//!
//! Follows SQL semantics where they matter: comparisons against NULL are
//! unknown (never match, negated or not), LIKE is ASCII case-insensitive with
//! `%` and `_` wildcards, and NULLs sort first in ascending order. Relations
//! are nested values on the row: an array of related rows or a single object.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use super::context::SortDirection;
use super::operators::Comparison;
use super::predicate::{Predicate, PredicateTree};

fn truthy(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Compare a row value with a raw request value. `None` is SQL's "unknown".
fn compare_scalar(value: &Value, raw: &str) -> Option<Ordering> {
    match value {
        Value::Number(number) => match (number.as_f64(), raw.trim().parse::<f64>()) {
            (Some(left), Ok(right)) => left.partial_cmp(&right),
            _ => Some(number.to_string().as_str().cmp(raw)),
        },
        Value::String(text) => Some(text.as_str().cmp(raw)),
        Value::Bool(flag) => truthy(raw).map(|other| flag.cmp(&other)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// ASCII case-insensitive LIKE with `%` (any run) and `_` (one char).
fn like_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

fn negate(result: Option<bool>, negated: bool) -> Option<bool> {
    result.map(|matched| matched != negated)
}

fn field<'a>(row: &'a Value, name: &str) -> &'a Value {
    row.get(name).unwrap_or(&Value::Null)
}

/// A predicate prepared for repeated evaluation: its regular expression, if
/// any, is compiled once rather than per row.
struct Matcher<'a> {
    predicate: &'a Predicate,
    regex: Option<Regex>,
    nested: Vec<Matcher<'a>>,
}

impl<'a> Matcher<'a> {
    fn new(predicate: &'a Predicate) -> Self {
        let (regex, nested) = match predicate {
            Predicate::Comparison {
                comparison: Comparison::Regexp | Comparison::NotRegexp,
                value,
                ..
            } => (Regex::new(value).ok(), Vec::new()),
            Predicate::Exists { predicates, .. } => (None, predicates.iter().map(Matcher::new).collect()),
            _ => (None, Vec::new()),
        };
        Self {
            predicate,
            regex,
            nested,
        }
    }

    fn matches(&self, row: &Value) -> bool {
        self.evaluate(row).unwrap_or(false)
    }

    /// An invalid pattern matches nothing, negated or not.
    fn regex_matches(&self, value: &Value) -> Option<bool> {
        let text = scalar_text(value)?;
        Some(self.regex.as_ref()?.is_match(&text))
    }

    fn evaluate(&self, row: &Value) -> Option<bool> {
        match self.predicate {
            Predicate::Comparison {
                field: name,
                comparison,
                value,
            } => {
                let current = field(row, name);
                Some(match comparison {
                    Comparison::Eq => compare_scalar(current, value)?.is_eq(),
                    Comparison::Neq => compare_scalar(current, value)?.is_ne(),
                    Comparison::Gt => compare_scalar(current, value)?.is_gt(),
                    Comparison::Lt => compare_scalar(current, value)?.is_lt(),
                    Comparison::Gte => compare_scalar(current, value)?.is_ge(),
                    Comparison::Lte => compare_scalar(current, value)?.is_le(),
                    Comparison::Regexp => self.regex_matches(current)?,
                    Comparison::NotRegexp => !self.regex_matches(current)?,
                })
            }
            Predicate::Null {
                field: name,
                negated,
            } => Some(field(row, name).is_null() != *negated),
            Predicate::Set {
                field: name,
                values,
                negated,
            } => {
                let current = field(row, name);
                if current.is_null() {
                    return None;
                }
                let found = values
                    .iter()
                    .any(|value| compare_scalar(current, value).is_some_and(Ordering::is_eq));
                negate(Some(found), *negated)
            }
            Predicate::Range {
                field: name,
                low,
                high,
                negated,
            } => {
                let current = field(row, name);
                let inside = compare_scalar(current, low)?.is_ge() && compare_scalar(current, high)?.is_le();
                negate(Some(inside), *negated)
            }
            Predicate::Pattern {
                field: name,
                pattern,
                negated,
            } => {
                let text = scalar_text(field(row, name))?;
                negate(Some(like_matches(&text, pattern)), *negated)
            }
            Predicate::Exists { relation, .. } => {
                let all = |related: &Value| self.nested.iter().all(|m| m.matches(related));
                Some(match field(row, relation) {
                    Value::Array(rows) => rows.iter().any(all),
                    related @ Value::Object(_) => all(related),
                    _ => false,
                })
            }
        }
    }
}

impl Predicate {
    /// Whether `row` satisfies this predicate. Unknown results count as no match.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        Matcher::new(self).matches(row)
    }
}

fn compare_rows(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

impl PredicateTree {
    fn matchers(&self) -> Vec<Matcher<'_>> {
        self.predicates().iter().map(Matcher::new).collect()
    }

    /// Whether `row` satisfies every recorded predicate.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.matchers().iter().all(|m| m.matches(row))
    }

    /// Keep the matching rows and sort them by the recorded order directives.
    #[must_use]
    pub fn apply_to(&self, rows: Vec<Value>) -> Vec<Value> {
        let matchers = self.matchers();
        let mut kept: Vec<Value> = rows
            .into_iter()
            .filter(|row| matchers.iter().all(|m| m.matches(row)))
            .collect();
        kept.sort_by(|a, b| {
            self.orders()
                .iter()
                .map(|(name, direction)| {
                    let ordering = compare_rows(field(a, name), field(b, name));
                    match direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        kept
    }
}
