use crate::clock::timestamp_format;
use crate::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observed database query
///
/// Immutable once recorded. `formatted_sql` is derived from `sql` and `bindings`
/// at construction and persisted alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    sql: String,
    #[serde(default)]
    bindings: Vec<Value>,
    #[serde(default)]
    formatted_sql: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    module: Option<String>,
    #[serde(with = "timestamp_format")]
    timestamp: DateTime<Local>,
}

impl QueryEntry {
    pub fn new(
        sql: impl Into<String>,
        bindings: Vec<Value>,
        duration: f64,
        module: Option<String>,
        timestamp: DateTime<Local>,
    ) -> Self {
        let sql = sql.into();
        let formatted_sql = interpolate_bindings(&sql, &bindings);

        Self {
            sql,
            bindings,
            formatted_sql,
            duration,
            module,
            timestamp,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// Duration in milliseconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// SQL with each binding substituted into its positional `?`
    pub fn formatted_sql(&self) -> &str {
        &self.formatted_sql
    }

    pub fn is_slower_than(&self, threshold_ms: f64) -> bool {
        self.duration > threshold_ms
    }

    /// Persisted fields as a map, the shape attached to a request's query list
    pub fn to_context(&self) -> Context {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Context::new(),
        }
    }

    /// Re-derive `formatted_sql` for records read from disk without it
    pub(crate) fn normalized(mut self) -> Self {
        if self.formatted_sql.is_empty() {
            self.formatted_sql = interpolate_bindings(&self.sql, &self.bindings);
        }
        self
    }
}

/// Replace `?` placeholders of the original SQL with rendered bindings
///
/// Placeholders are matched against the SQL text only, so a `?` inside a
/// substituted string value is never consumed by a later binding. Surplus
/// bindings are ignored and unmatched placeholders stay as `?`.
pub fn interpolate_bindings(sql: &str, bindings: &[Value]) -> String {
    let mut formatted = String::with_capacity(sql.len());
    let mut remaining = bindings.iter();

    for ch in sql.chars() {
        if ch == '?' {
            if let Some(binding) = remaining.next() {
                formatted.push_str(&render_binding(binding));
                continue;
            }
        }
        formatted.push(ch);
    }

    formatted
}

fn render_binding(binding: &Value) -> String {
    match binding {
        Value::String(s) => format!("'{}'", s),
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
