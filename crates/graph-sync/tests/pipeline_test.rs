use graphsync_core::catalog::{ColumnMeta, MemorySource, TableMetadata, TableSource};
use graphsync_core::coerce::Coercion;
use graphsync_core::error::SyncError;
use graphsync_core::graph::{GraphClient, MemoryGraph, UpsertReport};
use graphsync_core::transform::{Attributes, Edge, GraphPayload};
use graphsync_core::{
    BatchPipeline, EdgeMapping, MappingEngine, PipelineConfig, Record, Value, VertexMapping,
};
use std::collections::{BTreeMap, HashMap};

fn row(fields: &[(&str, Value)]) -> Record {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn metadata(name: &str, columns: &[&str]) -> TableMetadata {
    TableMetadata {
        name: name.into(),
        storage_location: None,
        columns: columns
            .iter()
            .map(|name| ColumnMeta {
                name: (*name).into(),
                type_name: "string".into(),
                nullable: true,
                comment: None,
            })
            .collect(),
    }
}

fn user_mapper() -> MappingEngine {
    let mut mapper = MappingEngine::new();
    mapper.add_vertex_mapping(VertexMapping {
        table: "users".into(),
        vertex_type: "User".into(),
        primary_id: "user_id".into(),
        attributes: vec!["name".into()],
        type_conversions: HashMap::from([("user_id".into(), Coercion::String)]),
    });
    mapper
}

fn users_source(count: i64) -> MemorySource {
    let mut source = MemorySource::new();
    let records = (1..=count)
        .map(|i| {
            row(&[
                ("user_id", Value::Int(i)),
                ("name", Value::String(format!("user-{}", i))),
            ])
        })
        .collect();
    source.add_table(metadata("users", &["user_id", "name"]), records);
    source
}

fn config(tables: &[&str], micro_batch_size: usize, parallelism: usize) -> PipelineConfig {
    PipelineConfig {
        tables: tables.iter().map(|t| t.to_string()).collect(),
        micro_batch_size,
        parallelism,
        ..PipelineConfig::default()
    }
}

#[test]
fn five_records_batch_two_parallelism_two_is_three_batches() {
    // Partition sizes ceil(5/2) = 3 and 2; chunk counts 2 and 1.
    let pipeline = BatchPipeline::new(
        users_source(5),
        MemoryGraph::new(),
        user_mapper(),
        config(&["users"], 2, 2),
    );

    let stats = pipeline.run();
    assert!(stats.is_clean(), "unexpected errors: {:?}", stats.errors);
    assert_eq!(stats.batches_processed, 3);
    assert_eq!(stats.vertices_pushed, 5);
    assert_eq!(stats.tables_processed, 1);
    assert_eq!(pipeline.graph().vertex_count("User"), 5);
}

#[test]
fn empty_table_is_skipped_without_error() {
    let mut source = MemorySource::new();
    source.add_table(metadata("users", &["user_id", "name"]), Vec::new());
    let pipeline = BatchPipeline::new(
        source,
        MemoryGraph::new(),
        user_mapper(),
        config(&["users"], 2, 2),
    );

    let stats = pipeline.run();
    assert!(stats.is_clean());
    assert_eq!(stats.batches_processed, 0);
    assert_eq!(stats.tables_processed, 0);
}

#[test]
fn unfetchable_table_is_isolated() {
    let pipeline = BatchPipeline::new(
        users_source(2),
        MemoryGraph::new(),
        user_mapper(),
        config(&["ghost", "users"], 10, 1),
    );

    let stats = pipeline.run();
    assert_eq!(stats.errors.len(), 1);
    assert!(stats.errors[0].starts_with("ghost:"), "{}", stats.errors[0]);
    // The bad table never stops the run.
    assert_eq!(stats.tables_processed, 1);
    assert_eq!(stats.vertices_pushed, 2);
}

#[test]
fn unmapped_table_errors_per_chunk_and_run_continues() {
    let mut source = users_source(3);
    source.add_table(
        metadata("orders", &["order_id"]),
        vec![row(&[("order_id", Value::Int(1))])],
    );

    let pipeline = BatchPipeline::new(
        source,
        MemoryGraph::new(),
        user_mapper(),
        config(&["orders", "users"], 10, 1),
    );

    let stats = pipeline.run();
    assert_eq!(stats.errors.len(), 1);
    assert!(stats.errors[0].contains("no mapping registered for table 'orders'"));
    assert!(stats.errors[0].starts_with("partition 0, batch 0:"));
    assert_eq!(stats.vertices_pushed, 3);
    assert_eq!(stats.tables_processed, 2);
}

#[test]
fn malformed_record_leaves_one_error_and_counters_advance() {
    let mut mapper = user_mapper();
    mapper.add_edge_mapping(EdgeMapping {
        table: "purchases".into(),
        edge_type: "PURCHASED".into(),
        from_vertex_type: "User".into(),
        to_vertex_type: "Product".into(),
        from_id: "user_id".into(),
        to_id: "product_id".into(),
        attributes: vec!["amount".into()],
        type_conversions: HashMap::from([("amount".into(), Coercion::Double)]),
    });

    let mut source = MemorySource::new();
    source.add_table(
        metadata("purchases", &["user_id", "product_id", "amount"]),
        vec![
            row(&[
                ("user_id", Value::Int(1)),
                ("product_id", Value::Int(5001)),
                ("amount", Value::String("1299.99".into())),
            ]),
            row(&[
                ("user_id", Value::Int(2)),
                ("product_id", Value::Int(5002)),
                ("amount", Value::String("free??".into())),
            ]),
            row(&[
                ("user_id", Value::Int(3)),
                ("product_id", Value::Int(5003)),
                ("amount", Value::Float(15.99)),
            ]),
        ],
    );

    let pipeline = BatchPipeline::new(
        source,
        MemoryGraph::new(),
        mapper,
        config(&["purchases"], 10, 1),
    );

    let stats = pipeline.run();
    assert_eq!(stats.edges_pushed, 2);
    assert_eq!(stats.errors.len(), 1);
    assert!(stats.errors[0].contains("free??"));
    // The chunk still counts: partial failure is not batch failure.
    assert_eq!(stats.batches_processed, 1);
    assert_eq!(stats.tables_processed, 1);
    assert_eq!(pipeline.graph().edge_count("PURCHASED"), 2);
}

struct FailingGraph;

impl GraphClient for FailingGraph {
    fn upsert_vertices(
        &self,
        _vertex_type: &str,
        _vertices: &BTreeMap<String, Attributes>,
        _batch_size: usize,
    ) -> Result<UpsertReport, SyncError> {
        Err(SyncError::StoreUpsert("connection reset".into()))
    }

    fn upsert_edges(
        &self,
        _edge_type: &str,
        _edges: &[Edge],
        _batch_size: usize,
    ) -> Result<UpsertReport, SyncError> {
        Err(SyncError::StoreUpsert("connection reset".into()))
    }
}

#[test]
fn store_failure_is_recorded_with_chunk_context() {
    let pipeline = BatchPipeline::new(
        users_source(3),
        FailingGraph,
        user_mapper(),
        config(&["users"], 2, 1),
    );

    let stats = pipeline.run();
    // Two chunks, both fail, both land in the error list; nothing counted.
    assert_eq!(stats.errors.len(), 2);
    assert!(stats.errors[0].starts_with("partition 0, batch 0:"));
    assert!(stats.errors[1].starts_with("partition 0, batch 1:"));
    assert_eq!(stats.vertices_pushed, 0);
    assert_eq!(stats.batches_processed, 0);
    assert_eq!(stats.tables_processed, 1);
}

#[test]
fn user_vertex_attributes_survive_end_to_end() {
    let mut mapper = MappingEngine::new();
    mapper.add_vertex_mapping(VertexMapping {
        table: "users".into(),
        vertex_type: "User".into(),
        primary_id: "user_id".into(),
        attributes: vec!["name".into(), "email".into(), "created_at".into()],
        type_conversions: HashMap::from([
            ("user_id".into(), Coercion::String),
            ("created_at".into(), Coercion::Datetime),
        ]),
    });

    let mut source = MemorySource::new();
    source.add_table(
        metadata("users", &["user_id", "name", "email", "created_at"]),
        vec![row(&[
            ("user_id", Value::Int(1)),
            ("name", Value::String("Alice".into())),
            ("email", Value::String("a@x.com".into())),
            ("created_at", Value::infer("2024-01-15T10:30:00Z")),
        ])],
    );

    let pipeline = BatchPipeline::new(
        source,
        MemoryGraph::new(),
        mapper,
        config(&["users"], 10, 1),
    );
    let stats = pipeline.run();
    assert!(stats.is_clean());

    let attrs = pipeline.graph().vertex("User", "1").unwrap();
    assert_eq!(attrs["name"], Value::String("Alice".into()));
    assert_eq!(attrs["email"], Value::String("a@x.com".into()));
    assert_eq!(attrs["created_at"], Value::String("2024-01-15T10:30:00Z".into()));
}

#[test]
fn chunked_transform_matches_whole_partition_transform() {
    let mapper = user_mapper();
    let records: Vec<Record> = (1..=6)
        .map(|i| {
            row(&[
                ("user_id", Value::Int(i)),
                ("name", Value::String(format!("user-{}", i))),
            ])
        })
        .collect();

    let whole = mapper.transform_records("users", &records).unwrap();

    let mut merged: BTreeMap<String, BTreeMap<String, Attributes>> = BTreeMap::new();
    for chunk in records.chunks(2) {
        let outcome = mapper.transform_records("users", chunk).unwrap();
        let GraphPayload::Vertices(by_type) = outcome.payload else {
            panic!("expected vertices");
        };
        for (vertex_type, vertices) in by_type {
            merged.entry(vertex_type).or_default().extend(vertices);
        }
    }

    assert_eq!(whole.payload, GraphPayload::Vertices(merged));
}

#[test]
fn run_over_mixed_tables_keeps_kinds_apart() {
    let mut mapper = user_mapper();
    mapper.add_edge_mapping(EdgeMapping {
        table: "purchases".into(),
        edge_type: "PURCHASED".into(),
        from_vertex_type: "User".into(),
        to_vertex_type: "Product".into(),
        from_id: "user_id".into(),
        to_id: "product_id".into(),
        attributes: vec![],
        type_conversions: HashMap::new(),
    });

    let mut source = users_source(4);
    source.add_table(
        metadata("purchases", &["user_id", "product_id"]),
        vec![
            row(&[("user_id", Value::Int(1)), ("product_id", Value::Int(9))]),
            row(&[("user_id", Value::Int(2)), ("product_id", Value::Int(9))]),
        ],
    );

    let pipeline = BatchPipeline::new(
        source,
        MemoryGraph::new(),
        mapper,
        config(&["users", "purchases"], 3, 2),
    );

    let stats = pipeline.run();
    assert!(stats.is_clean(), "{:?}", stats.errors);
    assert_eq!(stats.vertices_pushed, 4);
    assert_eq!(stats.edges_pushed, 2);
    assert_eq!(stats.tables_processed, 2);
    assert_eq!(pipeline.graph().vertex_count("User"), 4);
    assert_eq!(pipeline.graph().edge_count("PURCHASED"), 2);
}

#[test]
fn csv_source_drives_the_pipeline() {
    let dir = std::env::temp_dir().join("graphsync_pipeline_csv_test");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("users.csv"),
        "user_id,name\n1,alice\n2,bob\n3,\n",
    )
    .unwrap();

    let source = graphsync_core::catalog::CsvSource::new(&dir);
    let meta = source.table_metadata("main.sales.users").unwrap();
    assert_eq!(source.read_records(&meta, None).unwrap().len(), 3);

    let mut mapper = MappingEngine::new();
    mapper.add_vertex_mapping(VertexMapping {
        table: "main.sales.users".into(),
        vertex_type: "User".into(),
        primary_id: "user_id".into(),
        attributes: vec!["name".into()],
        type_conversions: HashMap::from([("user_id".into(), Coercion::String)]),
    });

    let pipeline = BatchPipeline::new(
        source,
        MemoryGraph::new(),
        mapper,
        config(&["main.sales.users"], 2, 2),
    );
    let stats = pipeline.run();
    assert!(stats.is_clean(), "{:?}", stats.errors);
    assert_eq!(stats.vertices_pushed, 3);
    // Row 3 had an empty name cell: sparse attributes, id still present.
    let attrs = pipeline.graph().vertex("User", "3").unwrap();
    assert!(attrs.is_empty());
}
