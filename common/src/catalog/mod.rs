pub mod model;

pub use model::{ColumnSpec, TableDescriptor, TableMetadata};

use crate::error::{Result, Txt2SqlError};
use serde_json::{Map, Value};
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../../data/chemical_catalog.json");

/// read-only table metadata shared by every session
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    tables: Vec<TableMetadata>,
}

impl Catalog {
    /// the chemical-manufacturing catalog shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// parse a json object of table name -> descriptor, keeping table order
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Txt2SqlError::Catalog(format!("invalid catalog json: {}", e)))?;

        let object: Map<String, Value> = match value {
            Value::Object(object) => object,
            other => {
                return Err(Txt2SqlError::Catalog(format!(
                    "catalog must be a json object of tables, got {}",
                    json_kind(&other)
                )))
            }
        };

        if object.is_empty() {
            return Err(Txt2SqlError::Catalog("catalog contains no tables".to_string()));
        }

        let mut tables = Vec::with_capacity(object.len());
        for (name, raw) in object {
            if name.trim().is_empty() {
                return Err(Txt2SqlError::Catalog("table name must not be blank".to_string()));
            }

            let descriptor: TableDescriptor = serde_json::from_value(raw).map_err(|e| {
                Txt2SqlError::Catalog(format!("table '{}' is malformed: {}", name, e))
            })?;

            tables.push(TableMetadata::from_descriptor(name, descriptor));
        }

        tracing::debug!(table_count = tables.len(), "catalog loaded");
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[TableMetadata] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.iter().find(|t| t.table_name == name)
    }

    /// pretty json of the flattened tables, embedded verbatim in prompts
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.tables).unwrap_or_else(|_| "[]".to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
