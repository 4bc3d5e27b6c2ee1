use super::{rows_or_error, QueryExecutor, Row};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::JsonValue;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::time::Duration;

const DEFAULT_PORT: u16 = 3306;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            user: "root".to_string(),
            password: String::new(),
            database: String::new(),
        }
    }
}

impl DatabaseConfig {
    fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password);

        if self.database.is_empty() {
            options
        } else {
            options.database(&self.database)
        }
    }
}

/// mysql-backed executor; connections are opened on first use so an
/// unreachable server shows up as an error row, not a startup failure
#[derive(Debug, Clone)]
pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(config: &DatabaseConfig) -> Self {
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "configuring mysql executor"
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(config.connect_options());

        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    #[tracing::instrument(skip(self, sql), fields(sql_len = sql.len()))]
    async fn execute(&self, sql: &str) -> Vec<Row> {
        let outcome = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_json).collect::<Vec<_>>());

        let rows = rows_or_error(outcome);
        tracing::debug!(row_count = rows.len(), "query returned");
        rows
    }
}

fn row_to_json(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_column(row, column.ordinal())))
        .collect()
}

fn decode_column(row: &MySqlRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(e) => {
            tracing::debug!(index, error = %e, "column not readable");
            return Value::Null;
        }
    };

    let decoded = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(index).map(Value::from)
        }
        name if name.ends_with(" UNSIGNED") => row.try_get::<u64, _>(index).map(Value::from),
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(index).map(float_value),
        "DECIMAL" => row
            .try_get::<Decimal, _>(index)
            .map(|d| d.to_f64().map(float_value).unwrap_or_else(|| Value::String(d.to_string()))),
        "DATE" => row.try_get::<NaiveDate, _>(index).map(|d| Value::String(d.to_string())),
        "TIME" => row.try_get::<NaiveTime, _>(index).map(|t| Value::String(t.to_string())),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|t| Value::String(t.to_string())),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|t| Value::String(t.to_rfc3339())),
        "JSON" => row.try_get::<JsonValue, _>(index),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    decoded.unwrap_or_else(|e| {
        tracing::debug!(index, column_type = %type_name, error = %e, "column decode failed");
        Value::Null
    })
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::is_error_result;

    #[test]
    fn test_float_value_rejects_nan() {
        assert_eq!(float_value(f64::NAN), Value::Null);
        assert_eq!(float_value(12.5), serde_json::json!(12.5));
    }

    #[test]
    fn test_database_config_default_port() {
        let config = DatabaseConfig::default();
        assert_eq!(config.port, 3306);
    }

    #[tokio::test]
    async fn test_unreachable_server_becomes_error_row() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "nobody".to_string(),
            password: String::new(),
            database: "missing".to_string(),
        };

        let executor = MySqlExecutor::new(&config);
        let rows = executor.execute("SELECT 1").await;

        assert!(is_error_result(&rows));
    }
}
