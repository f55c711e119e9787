//! Logical Query Model
//!
//! Backend-agnostic query description consumed by the search adapter. The
//! same model is shared by every datastore adapter of the middleware, so it
//! carries no search-engine specific concepts.
//!
//! # Example
//!
//! ```text
//! {
//!   "database": "telemetry", "table": "events",
//!   "where": { "type": "singular", "field": "status", "operator": "=", "value": "ok" },
//!   "group_by": [ { "type": "field", "field": "host", "label": "host" } ],
//!   "aggregates": [ { "label": "total", "function": "count", "field": "*" } ],
//!   "sort": [ { "key": "total", "direction": "desc" } ],
//!   "limit": 10
//! }
//! ```

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel field name meaning "every document" for count aggregates
pub const ALL_DOCUMENTS: &str = "*";

/// A logical query ready for compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Target database
    pub database: String,
    /// Target table within the database
    pub table: String,
    /// Field projection (empty = all fields)
    #[serde(default)]
    pub fields: Vec<String>,
    /// Return only the distinct values of the first projected field
    #[serde(default)]
    pub distinct: bool,
    /// Optional filter tree
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,
    /// Aggregates in output order
    #[serde(default)]
    pub aggregates: Vec<AggregateClause>,
    /// Group-by clauses, outermost first
    #[serde(default)]
    pub group_by: Vec<GroupByClause>,
    /// Sort clauses, most significant first
    #[serde(default)]
    pub sort: Vec<SortClause>,
    /// Optional limit on returned rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Optional number of rows to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl Query {
    /// Start building a query against a database table
    pub fn from_table(database: &str, table: &str) -> QueryBuilder {
        QueryBuilder::new(database, table)
    }

    /// Whether the query produces aggregated rows rather than documents
    pub fn is_aggregate(&self) -> bool {
        !self.aggregates.is_empty() || !self.group_by.is_empty()
    }

    /// Neither aggregated nor distinct: one row per document
    pub fn is_plain(&self) -> bool {
        !self.is_aggregate() && !self.distinct
    }

    /// The limit with `0` treated as unset
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit.filter(|&n| n > 0)
    }

    /// The offset with `0` treated as unset
    pub fn effective_offset(&self) -> Option<u64> {
        self.offset.filter(|&n| n > 0)
    }

    /// Output label for the group-by clause on `field`, innermost first
    pub fn group_label_for_field(&self, field: &str) -> Option<&str> {
        self.group_by
            .iter()
            .rev()
            .find(|g| g.field() == field)
            .map(|g| g.label())
    }
}

/// Boolean filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WhereClause {
    /// A single comparison
    Singular {
        field: String,
        operator: Operator,
        value: FilterValue,
    },
    /// Every child must match
    And { clauses: Vec<WhereClause> },
    /// At least one child must match
    Or { clauses: Vec<WhereClause> },
}

impl WhereClause {
    /// Create a single comparison
    pub fn singular(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self::Singular {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Equality comparison
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::singular(field, Operator::Eq, value)
    }

    /// Conjunction of clauses
    pub fn and(clauses: Vec<WhereClause>) -> Self {
        Self::And { clauses }
    }

    /// Disjunction of clauses
    pub fn or(clauses: Vec<WhereClause>) -> Self {
        Self::Or { clauses }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Equal to
    #[serde(rename = "=")]
    Eq,
    /// Not equal to
    #[serde(rename = "!=")]
    Ne,
    /// Greater than
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal to
    #[serde(rename = ">=")]
    Gte,
    /// Less than
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal to
    #[serde(rename = "<=")]
    Lte,
    /// Field text contains the value
    #[serde(rename = "contains")]
    Contains,
    /// Field text does not contain the value
    #[serde(rename = "not contains")]
    NotContains,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Contains => write!(f, "contains"),
            Self::NotContains => write!(f, "not contains"),
        }
    }
}

/// Values used in filter comparisons
///
/// Deserialized from plain JSON scalars; dates are written as
/// `{"date": "<rfc3339>"}` to keep them apart from strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Explicit null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Numeric value, integer or floating point as written
    Number(serde_json::Number),
    /// String value
    String(String),
    /// Point in time
    Date { date: DateTime<Utc> },
}

impl FilterValue {
    /// Whether this is an explicit null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Type name for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Date { .. } => "date",
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// NaN and infinities have no JSON form and become [`FilterValue::Null`]
impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for FilterValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date { date }
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Aggregation functions available in queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFunc {
    /// Number of documents
    Count,
    /// Average of values
    Avg,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Sum of values
    Sum,
}

impl AggregationFunc {
    /// Key of this function's value inside a statistics aggregation result
    pub fn stats_key(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
        }
    }
}

impl std::fmt::Display for AggregationFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "COUNT"),
            Self::Avg => write!(f, "AVG"),
            Self::Min => write!(f, "MIN"),
            Self::Max => write!(f, "MAX"),
            Self::Sum => write!(f, "SUM"),
        }
    }
}

/// What an aggregate is computed over
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregateTarget {
    /// Every matching document
    AllDocuments,
    /// A named field
    Field(String),
}

impl AggregateTarget {
    /// The field name, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::AllDocuments => None,
            Self::Field(name) => Some(name),
        }
    }
}

impl From<String> for AggregateTarget {
    fn from(s: String) -> Self {
        if s == ALL_DOCUMENTS {
            Self::AllDocuments
        } else {
            Self::Field(s)
        }
    }
}

impl From<&str> for AggregateTarget {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<AggregateTarget> for String {
    fn from(target: AggregateTarget) -> Self {
        match target {
            AggregateTarget::AllDocuments => ALL_DOCUMENTS.to_string(),
            AggregateTarget::Field(name) => name,
        }
    }
}

/// An aggregate in the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateClause {
    /// Output column name
    pub label: String,
    /// Aggregation function
    pub function: AggregationFunc,
    /// Source field or all documents
    #[serde(rename = "field")]
    pub target: AggregateTarget,
}

impl AggregateClause {
    /// Create a new aggregate clause
    pub fn new(
        label: impl Into<String>,
        function: AggregationFunc,
        target: impl Into<AggregateTarget>,
    ) -> Self {
        Self {
            label: label.into(),
            function,
            target: target.into(),
        }
    }
}


/// One GROUP BY level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupByClause {
    /// Group by the distinct values of a field
    Field { field: String, label: String },
    /// Group by a calendar component of a date field
    TimeFunction {
        field: String,
        label: String,
        granularity: TimeGranularity,
    },
}

impl GroupByClause {
    /// Create a field grouping
    pub fn by_field(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            label: label.into(),
        }
    }

    /// Create a time grouping
    pub fn by_time(
        field: impl Into<String>,
        label: impl Into<String>,
        granularity: TimeGranularity,
    ) -> Self {
        Self::TimeFunction {
            field: field.into(),
            label: label.into(),
            granularity,
        }
    }

    /// Source field name
    pub fn field(&self) -> &str {
        match self {
            Self::Field { field, .. } | Self::TimeFunction { field, .. } => field,
        }
    }

    /// Output label
    pub fn label(&self) -> &str {
        match self {
            Self::Field { label, .. } | Self::TimeFunction { label, .. } => label,
        }
    }
}

/// Calendar granularities for time grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl TimeGranularity {
    /// Date format token whose rendering is just this granularity's number
    pub fn format_token(&self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "m",
            Self::Hour => "H",
            Self::Day => "d",
            Self::Month => "M",
            Self::Year => "yyyy",
        }
    }

    /// Extract this granularity's component from a timestamp in milliseconds
    ///
    /// # Returns
    /// The year, month (1-12), day of month, hour, minute or second
    pub fn component(&self, timestamp_ms: i64) -> Option<i64> {
        let dt = match Utc.timestamp_millis_opt(timestamp_ms) {
            chrono::LocalResult::Single(dt) => dt,
            _ => return None,
        };

        Some(match self {
            Self::Second => dt.second() as i64,
            Self::Minute => dt.minute() as i64,
            Self::Hour => dt.hour() as i64,
            Self::Day => dt.day() as i64,
            Self::Month => dt.month() as i64,
            Self::Year => dt.year() as i64,
        })
    }
}

impl std::fmt::Display for TimeGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Second => write!(f, "second"),
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Backend spelling of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortClause {
    /// Field name, group label or aggregate label
    pub key: String,
    /// Direction
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortClause {
    /// Create a new sort clause
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }
}

/// Caller flags forwarded with every query
///
/// Session filter handling lives in the middleware; the adapter only carries
/// these through to its logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub ignore_filters: bool,
    #[serde(default)]
    pub selection_only: bool,
    #[serde(default)]
    pub ignored_filter_ids: Vec<String>,
}

/// Builder for constructing queries programmatically
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Create a new query builder for a database table
    pub fn new(database: &str, table: &str) -> Self {
        Self {
            query: Query {
                database: database.to_string(),
                table: table.to_string(),
                fields: Vec::new(),
                distinct: false,
                where_clause: None,
                aggregates: Vec::new(),
                group_by: Vec::new(),
                sort: Vec::new(),
                limit: None,
                offset: None,
            },
        }
    }

    /// Project the given fields
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.query.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Return distinct values of the first projected field
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    /// Set the filter tree
    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.query.where_clause = Some(clause);
        self
    }

    /// Add an aggregate
    pub fn aggregate(
        mut self,
        label: &str,
        function: AggregationFunc,
        target: impl Into<AggregateTarget>,
    ) -> Self {
        self.query
            .aggregates
            .push(AggregateClause::new(label, function, target));
        self
    }

    /// Add a count over all documents
    pub fn count_all(self, label: &str) -> Self {
        self.aggregate(label, AggregationFunc::Count, AggregateTarget::AllDocuments)
    }

    /// Add a field grouping
    pub fn group_by(mut self, field: &str, label: &str) -> Self {
        self.query.group_by.push(GroupByClause::by_field(field, label));
        self
    }

    /// Add a time grouping
    pub fn group_by_time(mut self, field: &str, label: &str, granularity: TimeGranularity) -> Self {
        self.query
            .group_by
            .push(GroupByClause::by_time(field, label, granularity));
        self
    }

    /// Add a sort clause
    pub fn sort(mut self, key: &str, direction: SortDirection) -> Self {
        self.query.sort.push(SortClause::new(key, direction));
        self
    }

    /// Set a limit on results
    pub fn limit(mut self, n: u64) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Skip the first n results
    pub fn offset(mut self, n: u64) -> Self {
        self.query.offset = Some(n);
        self
    }

    /// Build the query
    pub fn build(self) -> Query {
        self.query
    }
}
