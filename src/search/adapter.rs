//! Search adapter
//!
//! Entry point tying the pipeline together: validate, compile, send once,
//! flatten, finish.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;

use crate::query::{
    AggregateTarget, AggregationFunc, Query, QueryError, QueryOptions, QueryResult, WhereClause,
};
use crate::search::finish::finish_rows;
use crate::search::flatten::flatten_response;
use crate::search::request::{build_request, SearchRequest};
use crate::search::row::Row;
use crate::search::transport::{SearchTransport, TransportError};

/// Rows plus response metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Finished rows
    pub rows: Vec<Row>,
    /// Total hit count reported by the backend
    pub total_hits: u64,
    /// Cursor for the next page, when scrolling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    /// Backend processing time
    pub took_ms: u64,
    /// Wall-clock time spent in [`SearchAdapter::execute`]
    pub execution_time_ms: u64,
}

/// Compiles queries and runs them against a transport
#[derive(Clone)]
pub struct SearchAdapter {
    transport: Arc<dyn SearchTransport>,
}

impl SearchAdapter {
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self { transport }
    }

    /// Backend location, for logs and health output
    pub fn endpoint(&self) -> String {
        self.transport.endpoint()
    }

    /// Check that the backend is reachable
    pub async fn ping(&self) -> Result<(), TransportError> {
        self.transport.ping().await
    }

    /// Validate and compile a query without sending it
    pub fn translate(&self, query: &Query) -> QueryResult<SearchRequest> {
        validate(query)?;
        build_request(query)
    }

    /// Run a query and return finished rows
    pub async fn execute(&self, query: &Query, options: &QueryOptions) -> QueryResult<ResultSet> {
        let span = tracing::info_span!(
            "search",
            database = %query.database,
            table = %query.table,
        );

        async move {
            let started = Instant::now();
            let request = self.translate(query)?;

            tracing::debug!(
                body = %request.body(),
                scroll = ?request.scroll(),
                ignore_filters = options.ignore_filters,
                selection_only = options.selection_only,
                ignored_filters = options.ignored_filter_ids.len(),
                "compiled search request"
            );

            let response = self.transport.search(&request).await?;
            if response.timed_out {
                tracing::warn!("backend reported a timed out search; results may be partial");
            }

            let rows = flatten_response(query, &response);
            let rows = finish_rows(rows, query, &request.finish);
            let execution_time_ms = started.elapsed().as_millis() as u64;

            tracing::info!(
                rows = rows.len(),
                total_hits = response.hits.total.value(),
                took_ms = response.took,
                execution_time_ms,
                "query complete"
            );

            Ok::<_, QueryError>(ResultSet {
                rows,
                total_hits: response.hits.total.value(),
                scroll_id: response.scroll_id,
                took_ms: response.took,
                execution_time_ms,
            })
        }
        .instrument(span)
        .await
    }
}

/// Reject malformed queries before anything is compiled or sent
pub fn validate(query: &Query) -> QueryResult<()> {
    require_name("database", &query.database)?;
    require_name("table", &query.table)?;

    for field in &query.fields {
        require_name("projected field", field)?;
    }

    if query.distinct {
        if query.fields.is_empty() {
            return Err(QueryError::invalid("distinct needs at least one field"));
        }
        if query.is_aggregate() {
            return Err(QueryError::invalid(
                "distinct cannot be combined with aggregates or group-by",
            ));
        }
    }

    if let Some(clause) = &query.where_clause {
        validate_clause(clause)?;
    }

    let mut labels = HashSet::new();

    for group in &query.group_by {
        require_name("group-by field", group.field())?;
        require_name("group-by label", group.label())?;
        if !labels.insert(group.label()) {
            return Err(duplicate_label(group.label()));
        }
    }

    for aggregate in &query.aggregates {
        require_name("aggregate label", &aggregate.label)?;
        match (&aggregate.target, aggregate.function) {
            (AggregateTarget::Field(field), _) => require_name("aggregate field", field)?,
            (AggregateTarget::AllDocuments, AggregationFunc::Count) => {}
            (AggregateTarget::AllDocuments, function) => {
                return Err(QueryError::invalid(format!(
                    "{} of '{}' needs a field",
                    function, aggregate.label
                )));
            }
        }
        if !labels.insert(aggregate.label.as_str()) {
            return Err(duplicate_label(&aggregate.label));
        }
    }

    for sort in &query.sort {
        require_name("sort key", &sort.key)?;
    }

    Ok(())
}

fn validate_clause(clause: &WhereClause) -> QueryResult<()> {
    match clause {
        WhereClause::Singular { field, .. } => require_name("filter field", field),
        WhereClause::And { clauses } | WhereClause::Or { clauses } => {
            clauses.iter().try_for_each(validate_clause)
        }
    }
}

fn require_name(what: &str, value: &str) -> QueryResult<()> {
    if value.trim().is_empty() {
        Err(QueryError::invalid(format!("{} must not be empty", what)))
    } else {
        Ok(())
    }
}

fn duplicate_label(label: &str) -> QueryError {
    QueryError::invalid(format!("output label '{}' is used more than once", label))
}
