//! In-process row store
//!
//! Holds JSON rows per table behind an async lock. Used by the CLI (loaded from
//! a dataset document) and as the store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Filter, Query, RecordSource, Repository, Table};
use crate::error::DashboardError;
use crate::normalizer::{parse_timestamp, value_to_f64};

#[derive(Debug, Default)]
pub struct MemorySource {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replace the rows of one table
    pub fn with_rows(mut self, table: Table, rows: Vec<Value>) -> Self {
        self.tables.get_mut().insert(table, rows);
        self
    }

    /// Load a dataset document: `{ "<table>": [ {row}, ... ], ... }`.
    ///
    /// Keys that do not name a known table are ignored.
    pub fn from_dataset(json: &str) -> Result<Self, DashboardError> {
        let document: Map<String, Value> = serde_json::from_str(json)?;
        let mut source = Self::new();

        for (name, rows) in document {
            let table = match name.parse::<Table>() {
                Ok(table) => table,
                Err(_) => {
                    tracing::warn!(table = %name, "ignoring unknown table in dataset");
                    continue;
                }
            };
            let Value::Array(rows) = rows else {
                return Err(DashboardError::ParseError(format!(
                    "table {name} must be an array of rows"
                )));
            };
            source = source.with_rows(table, rows);
        }

        Ok(source)
    }

    /// Row count per loaded table
    pub async fn table_sizes(&self) -> BTreeMap<Table, usize> {
        let tables = self.tables.read().await;
        tables.iter().map(|(t, rows)| (*t, rows.len())).collect()
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, DashboardError> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Value> = rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .cloned()
            .collect();

        if let Some(order) = &query.order_by {
            matched.sort_by(|a, b| {
                let (a, b) = (field(a, &order.column), field(b, &order.column));
                match (a, b) {
                    (Some(a), Some(b)) => {
                        let ord = SortKey::of(a).cmp(&SortKey::of(b));
                        if order.descending {
                            ord.reverse()
                        } else {
                            ord
                        }
                    }
                    // nulls last in either direction
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }
}

#[async_trait]
impl Repository for MemorySource {
    async fn insert(&self, table: Table, row: Value) -> Result<Value, DashboardError> {
        let Value::Object(mut object) = row else {
            return Err(DashboardError::InvalidRow {
                table: table.to_string(),
                message: "row must be a JSON object".to_string(),
            });
        };

        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        object
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let stored = Value::Object(object);
        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .push(stored.clone());

        tracing::debug!(table = %table, "row inserted");
        Ok(stored)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<usize, DashboardError> {
        let Value::Object(patch) = patch else {
            return Err(DashboardError::InvalidRow {
                table: table.to_string(),
                message: "patch must be a JSON object".to_string(),
            });
        };

        let mut tables = self.tables.write().await;
        let mut touched = 0;
        for row in tables.entry(table).or_default().iter_mut() {
            if row_id(row) != Some(id) {
                continue;
            }
            if let Value::Object(object) = row {
                for (key, value) in &patch {
                    object.insert(key.clone(), value.clone());
                }
                touched += 1;
            }
        }

        Ok(touched)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<usize, DashboardError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        Ok(before - rows.len())
    }
}

fn field<'a>(row: &'a Value, column: &str) -> Option<&'a Value> {
    row.get(column).filter(|v| !v.is_null())
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, expected) => field(row, column)
            .and_then(|v| compare_values(v, expected))
            .map(|ord| ord == Ordering::Equal)
            .unwrap_or(false),
        Filter::Gte(column, bound) => field(row, column)
            .and_then(|v| compare_values(v, bound))
            .map(|ord| ord != Ordering::Less)
            .unwrap_or(false),
    }
}

/// Ordering key for a JSON value.
///
/// Kinds rank bool < number < timestamp < text < other. Numeric strings sort
/// with numbers and timestamp strings (any format `parse_timestamp` accepts)
/// sort by instant, so mixed columns still have a total order.
#[derive(Debug)]
enum SortKey<'a> {
    Bool(bool),
    Number(f64),
    Time(DateTime<Utc>),
    Text(&'a str),
    Other(String),
}

impl<'a> SortKey<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Bool(b) => SortKey::Bool(*b),
            Value::Number(_) => match value_to_f64(value) {
                Some(n) => SortKey::Number(n),
                None => SortKey::Other(value.to_string()),
            },
            Value::String(s) => {
                if let Some(n) = value_to_f64(value) {
                    SortKey::Number(n)
                } else if let Some(at) = parse_timestamp(s) {
                    SortKey::Time(at)
                } else {
                    SortKey::Text(s)
                }
            }
            _ => SortKey::Other(value.to_string()),
        }
    }

    fn kind(&self) -> u8 {
        match self {
            SortKey::Bool(_) => 0,
            SortKey::Number(_) => 1,
            SortKey::Time(_) => 2,
            SortKey::Text(_) => 3,
            SortKey::Other(_) => 4,
        }
    }

    fn cmp(&self, other: &SortKey<'_>) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Other(a), SortKey::Other(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

/// Compare two values of the same kind; values of different kinds never
/// satisfy a filter.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    let (a, b) = (SortKey::of(a), SortKey::of(b));
    (a.kind() == b.kind()).then(|| a.cmp(&b))
}
