//! Core types for sqlbatch

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A database value that can be bound to a statement parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time (hour, minute, second, nanosecond)
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

/// Direction of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// A named statement parameter with its value and type metadata.
///
/// `name` is stored without the placeholder marker: the text `:p0` binds the
/// parameter named `p0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    /// Database type name (driver specific, e.g. "int4", "text")
    #[serde(default)]
    pub data_type: Option<String>,
    /// Maximum size in bytes or characters
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub direction: ParameterDirection,
    /// Column the value was read from, if any
    #[serde(default)]
    pub source_column: Option<String>,
}

impl Parameter {
    /// Create an input parameter with no type metadata
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            nullable: value.is_null(),
            value,
            data_type: None,
            size: None,
            precision: None,
            scale: None,
            direction: ParameterDirection::Input,
            source_column: None,
        }
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision_scale(mut self, precision: i32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_source_column(mut self, column: impl Into<String>) -> Self {
        self.source_column = Some(column.into());
        self
    }

    /// Copy of this parameter under a different name. Value and every piece
    /// of type metadata are carried over.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Kind of a data-modifying statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Insert,
    Update,
    /// Anything else (DELETE, DDL, ...). Always executed immediately.
    Other,
}

impl StatementKind {
    /// Detect the kind from the leading keyword of the statement text
    pub fn detect(sql: &str) -> Self {
        let head = sql.trim_start();
        let keyword: String = head
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if keyword.eq_ignore_ascii_case("INSERT") {
            StatementKind::Insert
        } else if keyword.eq_ignore_ascii_case("UPDATE") {
            StatementKind::Update
        } else {
            StatementKind::Other
        }
    }
}

/// A logical command submitted by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct PendingStatement {
    pub kind: StatementKind,
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

impl PendingStatement {
    /// Create a statement, detecting its kind from the text
    pub fn new(sql: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        let sql = sql.into();
        Self {
            kind: StatementKind::detect(&sql),
            sql,
            parameters,
        }
    }
}

/// Result of executing a statement
#[derive(Debug, Clone)]
pub struct StatementResult {
    /// Rows affected by all statements in the command text
    pub affected_rows: u64,
    /// Number of `;`-separated statements the service ran
    pub statement_count: usize,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl StatementResult {
    pub fn new(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            statement_count: 1,
            execution_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_kind_detection_is_case_insensitive() {
        assert_eq!(StatementKind::detect("insert into t values (1)"), StatementKind::Insert);
        assert_eq!(StatementKind::detect("  Update t SET a = 1"), StatementKind::Update);
        assert_eq!(StatementKind::detect("DELETE FROM t"), StatementKind::Other);
        assert_eq!(StatementKind::detect("UPDATED"), StatementKind::Other);
    }

    #[test]
    fn test_parameter_renamed_keeps_metadata() {
        let param = Parameter::new("p0", 42i64)
            .with_data_type("int8")
            .with_size(8)
            .with_precision_scale(19, 0)
            .with_direction(ParameterDirection::InputOutput)
            .with_source_column("id");

        let renamed = param.renamed("p7");

        assert_eq!(renamed.name, "p7");
        assert_eq!(renamed.value, Value::Int64(42));
        assert_eq!(renamed.data_type.as_deref(), Some("int8"));
        assert_eq!(renamed.size, Some(8));
        assert_eq!(renamed.precision, Some(19));
        assert_eq!(renamed.scale, Some(0));
        assert_eq!(renamed.direction, ParameterDirection::InputOutput);
        assert_eq!(renamed.source_column.as_deref(), Some("id"));
    }

    #[test]
    fn test_null_parameter_is_nullable() {
        assert!(Parameter::new("p0", Value::Null).nullable);
        assert!(Parameter::new("p0", Option::<i64>::None).nullable);
        assert!(!Parameter::new("p0", 1i64).nullable);
    }
}
