use crate::error::SyncError;
use crate::value::{Record, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

/// What the pipeline needs to know about a source table before reading it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Fully qualified name, e.g. `main.ecommerce.users`.
    pub name: String,
    #[serde(default)]
    pub storage_location: Option<String>,
    pub columns: Vec<ColumnMeta>,
}

/// Reader side of the pipeline: resolves table metadata and hands back full
/// or limited snapshots of a table's rows. Incremental snapshot policies
/// live behind this seam too; the pipeline only ever asks for rows.
pub trait TableSource: Send + Sync {
    fn table_metadata(&self, table: &str) -> Result<TableMetadata, SyncError>;

    fn read_records(
        &self,
        metadata: &TableMetadata,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, SyncError>;
}

/// In-memory source over registered tables. Backs the demo binary and keeps
/// pipeline tests hermetic.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: HashMap<String, (TableMetadata, Vec<Record>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, metadata: TableMetadata, records: Vec<Record>) {
        self.tables
            .insert(metadata.name.clone(), (metadata, records));
    }
}

impl TableSource for MemorySource {
    fn table_metadata(&self, table: &str) -> Result<TableMetadata, SyncError> {
        self.tables
            .get(table)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| SyncError::TableFetch {
                table: table.to_string(),
                reason: "table not found".into(),
            })
    }

    fn read_records(
        &self,
        metadata: &TableMetadata,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, SyncError> {
        let (_, records) = self
            .tables
            .get(&metadata.name)
            .ok_or_else(|| SyncError::TableFetch {
                table: metadata.name.clone(),
                reason: "table not found".into(),
            })?;
        let take = limit.unwrap_or(records.len());
        Ok(records.iter().take(take).cloned().collect())
    }
}

/// File-backed source: each table lives at `<root>/<short name>.csv`, where
/// the short name is the last dot-separated segment of the table name.
/// Cell values are typed by inference; empty cells are treated as null and
/// left out of the record.
#[derive(Debug)]
pub struct CsvSource {
    root: PathBuf,
}

impl CsvSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        let short = table.rsplit('.').next().unwrap_or(table);
        self.root.join(format!("{}.csv", short))
    }

    fn fetch_err(table: &str, reason: impl ToString) -> SyncError {
        SyncError::TableFetch {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl TableSource for CsvSource {
    fn table_metadata(&self, table: &str) -> Result<TableMetadata, SyncError> {
        let path = self.table_path(table);
        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| Self::fetch_err(table, e))?;
        let headers = reader.headers().map_err(|e| Self::fetch_err(table, e))?;

        let columns = headers
            .iter()
            .map(|name| ColumnMeta {
                name: name.to_string(),
                type_name: "string".into(),
                nullable: true,
                comment: None,
            })
            .collect();

        Ok(TableMetadata {
            name: table.to_string(),
            storage_location: Some(path.display().to_string()),
            columns,
        })
    }

    fn read_records(
        &self,
        metadata: &TableMetadata,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, SyncError> {
        let path = self.table_path(&metadata.name);
        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| Self::fetch_err(&metadata.name, e))?;
        let headers = reader
            .headers()
            .map_err(|e| Self::fetch_err(&metadata.name, e))?
            .clone();

        let mut records = Vec::new();
        for row in reader.records() {
            if let Some(max) = limit {
                if records.len() >= max {
                    break;
                }
            }
            let row = row.map_err(|e| Self::fetch_err(&metadata.name, e))?;
            let mut record = Record::new();
            for (i, cell) in row.iter().enumerate() {
                let Some(field) = headers.get(i) else {
                    continue;
                };
                let value = Value::infer(cell);
                if !value.is_null() {
                    record.insert(field.to_string(), value);
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}
