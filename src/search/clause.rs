//! Clause Compiler
//!
//! Turns the logical filter tree into the backend's boolean query DSL.
//!
//! Compilation is a pure bottom-up fold: every clause maps to an immutable
//! [`QueryExpr`], and parents only wrap the expressions of their children.
//!
//! ```text
//! Singular(=, null)      -> bool.must_not[exists]
//! Singular(!=, v)        -> bool.must_not[term]
//! Singular(>=, v)        -> range.gte
//! Singular(contains, v)  -> regexp ".*v.*"
//! And(..)                -> bool.must[..]
//! Or(..)                 -> bool.should[..]
//! ```

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::query::{FilterValue, Operator, QueryError, QueryResult, WhereClause};

/// Second-precision ISO-8601 format used for every date sent to the backend
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Characters with special meaning in the backend's regexp syntax
const REGEXP_RESERVED: &[char] = &[
    '.', '?', '+', '*', '|', '{', '}', '[', ']', '(', ')', '"', '\\', '#', '@', '&', '<', '>',
    '~',
];

/// Compiled boolean query expression
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// Matches every document
    MatchAll,
    /// Matches no document
    MatchNone,
    /// Field equals value
    Term { field: String, value: Value },
    /// Field is present
    Exists { field: String },
    /// Field compared against a bound
    Range {
        field: String,
        bound: RangeBound,
        value: Value,
    },
    /// Field text matches a pattern
    Regexp { field: String, pattern: String },
    /// Boolean combination
    Bool(BoolExpr),
}

/// Children of a boolean expression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolExpr {
    /// All must match
    pub must: Vec<QueryExpr>,
    /// At least one must match
    pub should: Vec<QueryExpr>,
    /// None may match
    pub must_not: Vec<QueryExpr>,
}

/// Range comparison kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeBound {
    fn from_operator(op: Operator) -> Option<Self> {
        match op {
            Operator::Gt => Some(Self::Gt),
            Operator::Gte => Some(Self::Gte),
            Operator::Lt => Some(Self::Lt),
            Operator::Lte => Some(Self::Lte),
            _ => None,
        }
    }

    /// Backend key for this bound
    pub fn key(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }
}

impl QueryExpr {
    /// Conjunction of expressions
    pub fn all(must: Vec<QueryExpr>) -> Self {
        Self::Bool(BoolExpr {
            must,
            ..Default::default()
        })
    }

    /// Disjunction of expressions
    pub fn any(should: Vec<QueryExpr>) -> Self {
        Self::Bool(BoolExpr {
            should,
            ..Default::default()
        })
    }

    /// Negation of an expression
    pub fn not(expr: QueryExpr) -> Self {
        Self::Bool(BoolExpr {
            must_not: vec![expr],
            ..Default::default()
        })
    }

    /// Presence test
    pub fn exists(field: &str) -> Self {
        Self::Exists {
            field: field.to_string(),
        }
    }

    /// Render in the backend's query DSL
    pub fn to_json(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::MatchNone => json!({ "match_none": {} }),
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::Range {
                field,
                bound,
                value,
            } => json!({ "range": { field.as_str(): { bound.key(): value } } }),
            Self::Regexp { field, pattern } => json!({ "regexp": { field.as_str(): pattern } }),
            Self::Bool(b) => {
                let mut body = Map::new();
                let groups = [
                    ("must", &b.must),
                    ("should", &b.should),
                    ("must_not", &b.must_not),
                ];
                for (key, exprs) in groups {
                    if !exprs.is_empty() {
                        body.insert(
                            key.to_string(),
                            Value::Array(exprs.iter().map(QueryExpr::to_json).collect()),
                        );
                    }
                }
                if !b.should.is_empty() {
                    body.insert("minimum_should_match".to_string(), json!(1));
                }
                json!({ "bool": body })
            }
        }
    }
}

impl Serialize for QueryExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Compile the optional where clause together with planner-injected filters
///
/// The compiled clause becomes the first `must` entry of an outer boolean
/// expression; `extra_filters` follow it as further `must` entries.
pub fn compile_where(
    clause: Option<&WhereClause>,
    extra_filters: Vec<QueryExpr>,
) -> QueryResult<QueryExpr> {
    let mut must = Vec::with_capacity(extra_filters.len() + 1);

    if let Some(clause) = clause {
        must.push(compile_clause(clause)?);
    }
    must.extend(extra_filters);

    if must.is_empty() {
        Ok(QueryExpr::MatchAll)
    } else {
        Ok(QueryExpr::all(must))
    }
}

/// Compile a single clause tree
pub fn compile_clause(clause: &WhereClause) -> QueryResult<QueryExpr> {
    match clause {
        WhereClause::Singular {
            field,
            operator,
            value,
        } => compile_singular(field, *operator, value),
        WhereClause::And { clauses } => {
            if clauses.is_empty() {
                return Ok(QueryExpr::MatchAll);
            }
            let children = clauses.iter().map(compile_clause).collect::<QueryResult<Vec<_>>>()?;
            Ok(QueryExpr::all(children))
        }
        WhereClause::Or { clauses } => {
            if clauses.is_empty() {
                return Ok(QueryExpr::MatchNone);
            }
            let children = clauses.iter().map(compile_clause).collect::<QueryResult<Vec<_>>>()?;
            Ok(QueryExpr::any(children))
        }
    }
}

fn compile_singular(field: &str, op: Operator, value: &FilterValue) -> QueryResult<QueryExpr> {
    if field.is_empty() {
        return Err(QueryError::invalid("filter field cannot be empty"));
    }

    match op {
        Operator::Eq if value.is_null() => Ok(QueryExpr::not(QueryExpr::exists(field))),
        Operator::Eq => Ok(term(field, value)?),
        Operator::Ne if value.is_null() => Ok(QueryExpr::exists(field)),
        Operator::Ne => Ok(QueryExpr::not(term(field, value)?)),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let bound = RangeBound::from_operator(op)
                .ok_or_else(|| QueryError::invalid(format!("'{}' is not a range operator", op)))?;
            Ok(QueryExpr::Range {
                field: field.to_string(),
                bound,
                value: range_value(field, op, value)?,
            })
        }
        Operator::Contains => Ok(regexp(field, op, value)?),
        Operator::NotContains => Ok(QueryExpr::not(regexp(field, op, value)?)),
    }
}

fn term(field: &str, value: &FilterValue) -> QueryResult<QueryExpr> {
    Ok(QueryExpr::Term {
        field: field.to_string(),
        value: compiled_value(value)?,
    })
}

fn regexp(field: &str, op: Operator, value: &FilterValue) -> QueryResult<QueryExpr> {
    let text = match value {
        FilterValue::String(s) => s.clone(),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Boolean(b) => b.to_string(),
        FilterValue::Date { date } => format_date(date),
        FilterValue::Null => {
            return Err(QueryError::invalid(format!(
                "'{}' on field '{}' needs a non-null value",
                op, field
            )))
        }
    };

    Ok(QueryExpr::Regexp {
        field: field.to_string(),
        pattern: format!(".*{}.*", escape_regexp(&text)),
    })
}

/// Range bounds compare numerically, so numbers are sent as floating point
fn range_value(field: &str, op: Operator, value: &FilterValue) -> QueryResult<Value> {
    match value {
        FilterValue::Number(n) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| QueryError::invalid(format!("{} is not a finite number", n))),
        FilterValue::Date { .. } | FilterValue::String(_) => compiled_value(value),
        FilterValue::Boolean(_) | FilterValue::Null => Err(QueryError::invalid(format!(
            "'{}' on field '{}' cannot compare a {} value",
            op,
            field,
            value.kind()
        ))),
    }
}

/// Backend representation of a filter value in a term test
fn compiled_value(value: &FilterValue) -> QueryResult<Value> {
    match value {
        FilterValue::String(s) => Ok(Value::String(s.clone())),
        FilterValue::Number(n) => Ok(Value::Number(n.clone())),
        FilterValue::Boolean(b) => Ok(Value::Bool(*b)),
        FilterValue::Date { date } => Ok(Value::String(format_date(date))),
        FilterValue::Null => Err(QueryError::invalid("null cannot be used as a comparison value")),
    }
}

/// Normalize a date to second precision
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Backslash-escape regexp metacharacters so the value matches literally
pub fn escape_regexp(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if REGEXP_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
