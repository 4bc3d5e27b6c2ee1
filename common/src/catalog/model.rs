use crate::executor::Row;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default)]
    pub description: String,
}

/// table descriptor as it appears in a catalog file, keyed by table name
#[derive(Debug, Clone, Deserialize)]
pub struct TableDescriptor {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    /// label -> link description, in file order
    #[serde(default)]
    pub relationships: Map<String, Value>,
    #[serde(default)]
    pub examples: Vec<Row>,
    #[serde(default, alias = "usuage")]
    pub usage: Vec<String>,
}

/// flattened per-table metadata, the shape embedded in prompts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMetadata {
    pub table_name: String,
    pub table_description: String,
    pub columns: Vec<ColumnSpec>,
    pub relationships: Map<String, Value>,
    pub examples: Vec<Row>,
    pub usage: Vec<String>,
}

impl TableMetadata {
    pub fn from_descriptor(table_name: impl Into<String>, descriptor: TableDescriptor) -> Self {
        Self {
            table_name: table_name.into(),
            table_description: descriptor.description,
            columns: descriptor.columns,
            relationships: descriptor.relationships,
            examples: descriptor.examples,
            usage: descriptor.usage,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}
