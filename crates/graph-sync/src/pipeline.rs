use crate::catalog::TableSource;
use crate::error::SyncError;
use crate::graph::GraphClient;
use crate::mapping::MappingEngine;
use crate::partition::partition;
use crate::stats::RunStats;
use crate::transform::GraphPayload;
use crate::value::Record;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

/// Knobs for one pipeline run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tables to sync, processed in the given order.
    pub tables: Vec<String>,
    /// Records per micro-batch pushed downstream as one call.
    pub micro_batch_size: usize,
    /// Partition count, one worker per partition.
    pub parallelism: usize,
    /// Store-side sub-batching hint forwarded on every upsert.
    pub store_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            micro_batch_size: 10_000,
            parallelism: 4,
            store_batch_size: 1000,
        }
    }
}

/// Replays source tables into the graph store in partitioned micro-batches.
///
/// Partitions run concurrently, one worker each; chunks within a partition
/// stay strictly sequential, which keeps intra-partition error order and
/// bounds in-flight memory. The stats accumulator behind a mutex is the
/// only state shared across workers. A run always completes: record, chunk
/// and table failures become statistics entries, never a propagated error.
pub struct BatchPipeline<S, G> {
    source: S,
    graph: G,
    mapper: MappingEngine,
    config: PipelineConfig,
    stats: Mutex<RunStats>,
}

impl<S: TableSource, G: GraphClient> BatchPipeline<S, G> {
    pub fn new(source: S, graph: G, mapper: MappingEngine, config: PipelineConfig) -> Self {
        Self {
            source,
            graph,
            mapper,
            config,
            stats: Mutex::new(RunStats::default()),
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> RunStats {
        self.lock_stats().clone()
    }

    /// Runs the configured tables in order and reports the final statistics.
    pub fn run(&self) -> RunStats {
        debug!("mappings in effect:\n{}", self.mapper.summary());
        for table in &self.config.tables {
            self.process_table(table);
        }
        let stats = self.stats();
        info!(
            vertices = stats.vertices_pushed,
            edges = stats.edges_pushed,
            tables = stats.tables_processed,
            batches = stats.batches_processed,
            errors = stats.errors.len(),
            "run complete"
        );
        stats
    }

    fn process_table(&self, table: &str) {
        info!(table, "processing table");

        let records = match self.fetch(table) {
            Ok(records) => records,
            Err(e) => {
                warn!(table, error = %e, "table fetch failed, skipping table");
                self.lock_stats().errors.push(format!("{}: {}", table, e));
                return;
            }
        };

        if records.is_empty() {
            info!(table, "no records, skipping");
            return;
        }

        let total = records.len();
        let partitions = partition(records, self.config.parallelism);
        debug!(table, total, partitions = partitions.len(), "repartitioned");

        thread::scope(|scope| {
            for (partition_id, data) in partitions.iter().enumerate() {
                scope.spawn(move || self.process_partition(table, partition_id, data));
            }
        });

        self.lock_stats().tables_processed += 1;
    }

    fn fetch(&self, table: &str) -> Result<Vec<Record>, SyncError> {
        let metadata = self.source.table_metadata(table)?;
        self.source.read_records(&metadata, None)
    }

    fn process_partition(&self, table: &str, partition_id: usize, data: &[Record]) {
        let chunks = data.chunks(self.config.micro_batch_size.max(1));
        for (batch_id, chunk) in chunks.enumerate() {
            if let Err(e) = self.process_chunk(table, partition_id, batch_id, chunk) {
                warn!(table, partition_id, batch_id, error = %e, "batch failed");
                self.lock_stats()
                    .errors
                    .push(format!("partition {}, batch {}: {}", partition_id, batch_id, e));
            }
        }
    }

    fn process_chunk(
        &self,
        table: &str,
        partition_id: usize,
        batch_id: usize,
        chunk: &[Record],
    ) -> Result<(), SyncError> {
        let outcome = self.mapper.transform_records(table, chunk)?;

        if !outcome.errors.is_empty() {
            let mut stats = self.lock_stats();
            for error in &outcome.errors {
                warn!(table, partition_id, batch_id, %error, "record dropped");
                stats
                    .errors
                    .push(format!("partition {}, batch {}: {}", partition_id, batch_id, error));
            }
        }

        match &outcome.payload {
            GraphPayload::Vertices(by_type) => {
                let mut pushed = 0;
                for (vertex_type, vertices) in by_type {
                    if vertices.is_empty() {
                        continue;
                    }
                    let report = self.graph.upsert_vertices(
                        vertex_type,
                        vertices,
                        self.config.store_batch_size,
                    )?;
                    debug!(
                        vertex_type,
                        accepted = report.accepted,
                        skipped = report.skipped,
                        "vertices upserted"
                    );
                    pushed += vertices.len();
                }
                self.lock_stats().vertices_pushed += pushed;
            }
            GraphPayload::Edges(by_type) => {
                let mut pushed = 0;
                for (edge_type, edges) in by_type {
                    if edges.is_empty() {
                        continue;
                    }
                    let report =
                        self.graph
                            .upsert_edges(edge_type, edges, self.config.store_batch_size)?;
                    debug!(
                        edge_type,
                        accepted = report.accepted,
                        skipped = report.skipped,
                        "edges upserted"
                    );
                    pushed += edges.len();
                }
                self.lock_stats().edges_pushed += pushed;
            }
        }

        self.lock_stats().batches_processed += 1;
        Ok(())
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, RunStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
