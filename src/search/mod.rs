//! Search backend adapter
//!
//! Compiles [`Query`](crate::query::Query) values into bucketed `_search`
//! requests and turns the responses back into ordered rows.
//!
//! ```text
//! Query -> clause + aggregation -> request -> transport -> flatten -> finish -> ResultSet
//! ```

pub mod adapter;
pub mod aggregation;
pub mod clause;
pub mod export;
pub mod finish;
pub mod flatten;
pub mod request;
pub mod response;
pub mod row;
pub mod transport;

pub use adapter::{validate, ResultSet, SearchAdapter};
pub use aggregation::{
    plan_aggregations, AggregationKind, AggregationNode, AggregationPlan, BucketOrder,
    OrderingDecision, SortTarget, MAX_BUCKETS,
};
pub use clause::{compile_clause, compile_where, QueryExpr, RangeBound};
pub use export::{ExportError, OutputFormat};
pub use finish::{finish_rows, FinishPlan};
pub use flatten::flatten_response;
pub use request::{build_request, SearchRequest, SearchTarget, Window};
pub use response::SearchResponse;
pub use row::{Row, ID_FIELD};
pub use transport::{HttpTransport, SearchTransport, StaticTransport, TransportError};
