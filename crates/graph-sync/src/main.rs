use anyhow::Result;
use graphsync_core::catalog::{ColumnMeta, MemorySource, TableMetadata};
use graphsync_core::graph::MemoryGraph;
use graphsync_core::coerce::Coercion;
use graphsync_core::{
    BatchPipeline, EdgeMapping, MappingEngine, PipelineConfig, Record, Value, VertexMapping,
};
use std::collections::HashMap;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let pipeline = BatchPipeline::new(
        demo_source(),
        MemoryGraph::new(),
        demo_mappings(),
        PipelineConfig {
            tables: vec![
                "main.ecommerce.users".into(),
                "main.ecommerce.products".into(),
                "main.ecommerce.transactions".into(),
            ],
            // Tiny batches so the partition/micro-batch walk is visible in
            // the logs; production sizes are in the thousands.
            micro_batch_size: 2,
            parallelism: 2,
            ..PipelineConfig::default()
        },
    );

    let stats = pipeline.run();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn demo_mappings() -> MappingEngine {
    let mut mapper = MappingEngine::new();

    mapper.add_vertex_mapping(VertexMapping {
        table: "main.ecommerce.users".into(),
        vertex_type: "User".into(),
        primary_id: "user_id".into(),
        attributes: vec![
            "username".into(),
            "email".into(),
            "created_at".into(),
            "country".into(),
        ],
        type_conversions: HashMap::from([
            ("user_id".into(), Coercion::String),
            ("created_at".into(), Coercion::Datetime),
        ]),
    });

    mapper.add_vertex_mapping(VertexMapping {
        table: "main.ecommerce.products".into(),
        vertex_type: "Product".into(),
        primary_id: "product_id".into(),
        attributes: vec!["name".into(), "category".into(), "price".into()],
        type_conversions: HashMap::from([
            ("product_id".into(), Coercion::String),
            ("price".into(), Coercion::Double),
        ]),
    });

    mapper.add_edge_mapping(EdgeMapping {
        table: "main.ecommerce.transactions".into(),
        edge_type: "PURCHASED".into(),
        from_vertex_type: "User".into(),
        to_vertex_type: "Product".into(),
        from_id: "user_id".into(),
        to_id: "product_id".into(),
        attributes: vec!["transaction_id".into(), "amount".into(), "timestamp".into()],
        type_conversions: HashMap::from([
            ("user_id".into(), Coercion::String),
            ("product_id".into(), Coercion::String),
            ("transaction_id".into(), Coercion::String),
            ("amount".into(), Coercion::Double),
            ("timestamp".into(), Coercion::Datetime),
        ]),
    });

    mapper
}

fn demo_source() -> MemorySource {
    let mut source = MemorySource::new();

    source.add_table(
        metadata(
            "main.ecommerce.users",
            "s3://my-data-lake/iceberg/users",
            &[
                ("user_id", "bigint", false),
                ("username", "string", false),
                ("email", "string", true),
                ("created_at", "timestamp", false),
                ("country", "string", true),
            ],
        ),
        vec![
            row(&[
                ("user_id", Value::Int(1)),
                ("username", Value::String("alice_smith".into())),
                ("email", Value::String("alice@example.com".into())),
                ("created_at", Value::infer("2024-01-15T10:30:00Z")),
                ("country", Value::String("US".into())),
            ]),
            row(&[
                ("user_id", Value::Int(2)),
                ("username", Value::String("bob_jones".into())),
                ("email", Value::String("bob@example.com".into())),
                ("created_at", Value::infer("2024-01-20T14:22:00Z")),
                ("country", Value::String("UK".into())),
            ]),
            row(&[
                ("user_id", Value::Int(3)),
                ("username", Value::String("carol_williams".into())),
                ("email", Value::String("carol@example.com".into())),
                ("created_at", Value::infer("2024-02-01T09:15:00Z")),
                ("country", Value::String("CA".into())),
            ]),
        ],
    );

    source.add_table(
        metadata(
            "main.ecommerce.products",
            "s3://my-data-lake/iceberg/products",
            &[
                ("product_id", "bigint", false),
                ("name", "string", false),
                ("category", "string", false),
                ("price", "decimal(10,2)", false),
            ],
        ),
        vec![
            row(&[
                ("product_id", Value::Int(5001)),
                ("name", Value::String("Laptop Pro 15".into())),
                ("category", Value::String("Electronics".into())),
                ("price", Value::Float(1299.99)),
            ]),
            row(&[
                ("product_id", Value::Int(5002)),
                ("name", Value::String("Wireless Mouse".into())),
                ("category", Value::String("Electronics".into())),
                ("price", Value::Float(29.99)),
            ]),
            row(&[
                ("product_id", Value::Int(5003)),
                ("name", Value::String("USB-C Cable".into())),
                ("category", Value::String("Accessories".into())),
                ("price", Value::Float(15.99)),
            ]),
        ],
    );

    source.add_table(
        metadata(
            "main.ecommerce.transactions",
            "s3://my-data-lake/iceberg/transactions",
            &[
                ("transaction_id", "bigint", false),
                ("user_id", "bigint", false),
                ("product_id", "bigint", false),
                ("amount", "decimal(10,2)", false),
                ("timestamp", "timestamp", false),
            ],
        ),
        vec![
            row(&[
                ("transaction_id", Value::Int(101)),
                ("user_id", Value::Int(1)),
                ("product_id", Value::Int(5001)),
                ("amount", Value::Float(1299.99)),
                ("timestamp", Value::infer("2024-03-01T10:30:00Z")),
            ]),
            row(&[
                ("transaction_id", Value::Int(102)),
                ("user_id", Value::Int(2)),
                ("product_id", Value::Int(5002)),
                ("amount", Value::Float(29.99)),
                ("timestamp", Value::infer("2024-03-01T14:45:00Z")),
            ]),
            row(&[
                ("transaction_id", Value::Int(103)),
                ("user_id", Value::Int(1)),
                ("product_id", Value::Int(5003)),
                ("amount", Value::Float(15.99)),
                ("timestamp", Value::infer("2024-03-02T09:20:00Z")),
            ]),
            row(&[
                ("transaction_id", Value::Int(104)),
                ("user_id", Value::Int(3)),
                ("product_id", Value::Int(5001)),
                ("amount", Value::Float(1299.99)),
                ("timestamp", Value::infer("2024-03-03T16:00:00Z")),
            ]),
        ],
    );

    source
}

fn metadata(name: &str, location: &str, columns: &[(&str, &str, bool)]) -> TableMetadata {
    TableMetadata {
        name: name.into(),
        storage_location: Some(location.into()),
        columns: columns
            .iter()
            .map(|(name, type_name, nullable)| ColumnMeta {
                name: (*name).into(),
                type_name: (*type_name).into(),
                nullable: *nullable,
                comment: None,
            })
            .collect(),
    }
}

fn row(fields: &[(&str, Value)]) -> Record {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
