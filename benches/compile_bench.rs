//! Benchmarks for query compilation and row flattening
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use searchbridge::query::{
    AggregationFunc, Operator, Query, SortDirection, TimeGranularity, WhereClause,
};
use searchbridge::search::{build_request, finish_rows, flatten_response, SearchResponse};
use serde_json::{json, Value};

fn filter_tree(width: usize) -> WhereClause {
    WhereClause::and(
        (0..width)
            .map(|i| {
                WhereClause::or(vec![
                    WhereClause::eq(format!("host_{}", i), "web"),
                    WhereClause::singular(format!("latency_{}", i), Operator::Gte, i as f64),
                    WhereClause::singular(format!("path_{}", i), Operator::Contains, "api/v1"),
                ])
            })
            .collect(),
    )
}

fn grouped_query() -> Query {
    Query::from_table("logs", "requests")
        .group_by("host", "host")
        .group_by_time("ts", "hour", TimeGranularity::Hour)
        .count_all("n")
        .aggregate("mean", AggregationFunc::Avg, "latency")
        .sort("n", SortDirection::Desc)
        .limit(100)
        .build()
}

fn bucket_response(hosts: usize, hours: usize) -> SearchResponse {
    let host_buckets: Vec<Value> = (0..hosts)
        .map(|h| {
            let hour_buckets: Vec<Value> = (0..hours)
                .map(|hour| {
                    json!({
                        "key": hour as i64 * 3_600_000,
                        "key_as_string": hour.to_string(),
                        "doc_count": (h * 31 + hour * 7) % 97,
                        "_stats_latency": { "count": 1, "avg": (h + hour) as f64 / 3.0 }
                    })
                })
                .collect();
            json!({
                "key": format!("web-{}", h),
                "doc_count": 1000,
                "hour": { "buckets": hour_buckets }
            })
        })
        .collect();

    serde_json::from_value(json!({
        "hits": { "total": hosts * 1000, "hits": [] },
        "aggregations": { "host": { "buckets": host_buckets } }
    }))
    .unwrap()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for width in [4, 32, 256] {
        let query = Query::from_table("logs", "requests")
            .filter(filter_tree(width))
            .build();

        group.throughput(Throughput::Elements(width as u64));
        group.bench_function(format!("filter_{}", width), |b| {
            b.iter(|| build_request(black_box(&query)).unwrap().body())
        });
    }

    let query = grouped_query();
    group.bench_function("grouped", |b| {
        b.iter(|| build_request(black_box(&query)).unwrap().body())
    });

    group.finish();
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    let query = grouped_query();
    let request = build_request(&query).unwrap();

    for (hosts, hours) in [(10, 24), (100, 24), (500, 24)] {
        let response = bucket_response(hosts, hours);

        group.throughput(Throughput::Elements((hosts * hours) as u64));
        group.bench_function(format!("rows_{}", hosts * hours), |b| {
            b.iter(|| {
                let rows = flatten_response(black_box(&query), black_box(&response));
                finish_rows(rows, &query, &request.finish)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_flatten);
criterion_main!(benches);
