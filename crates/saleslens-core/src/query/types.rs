//! Result values and result sets returned by a [`QueryExecutor`].
//!
//! [`QueryExecutor`]: super::QueryExecutor

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{LensError, Result};

/// Query result value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// SQL NULL value.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// UTF-8 string value.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Timestamp without timezone.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns `true` if this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as an `f64`, coercing from int.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Returns the value as an `i64`. Floats are only accepted when integral.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a date, truncating timestamps.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    /// Total order used for sorting and range checks.
    ///
    /// Numbers compare numerically across `Int`/`Float`. `Null` sorts after
    /// every non-null value, so it comes first in descending order.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Date(a), Value::Timestamp(b)) => a.cmp(&b.date()),
            (Value::Timestamp(a), Value::Date(b)) => a.date().cmp(b),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Int(_) | Value::Float(_) => 0,
            Value::String(_) => 1,
            Value::Date(_) | Value::Timestamp(_) => 2,
            Value::Null => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(ts) => write!(f, "{}", ts),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Query result row
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Column values
    pub values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given column values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns a reference to the value at the given column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Query result set
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    /// Output column names, in projection order
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a new result set with the given columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows through name-based accessors
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |row| Record {
            columns: &self.columns,
            row,
        })
    }

    /// The first row, if any
    pub fn first(&self) -> Option<Record<'_>> {
        self.records().next()
    }
}

/// A row viewed together with its column names.
///
/// Accessors coalesce SQL NULL to zero for numeric aggregates and report a
/// storage error when the executor returned a row without the requested
/// column or with an incompatible type.
#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl<'a> Record<'a> {
    /// Raw value of a named column
    pub fn value(&self, column: &str) -> Result<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.row.get(idx))
            .ok_or_else(|| LensError::storage(format!("result is missing column '{column}'")))
    }

    /// Numeric column, NULL coalesced to zero
    pub fn float_or_zero(&self, column: &str) -> Result<f64> {
        let value = self.value(column)?;
        if value.is_null() {
            return Ok(0.0);
        }
        value.as_float().ok_or_else(|| type_error(column, "numeric", value))
    }

    /// Integer column, NULL coalesced to zero
    pub fn int_or_zero(&self, column: &str) -> Result<i64> {
        let value = self.value(column)?;
        if value.is_null() {
            return Ok(0);
        }
        value.as_int().ok_or_else(|| type_error(column, "integer", value))
    }

    /// Non-null integer column
    pub fn int(&self, column: &str) -> Result<i64> {
        let value = self.value(column)?;
        value.as_int().ok_or_else(|| type_error(column, "integer", value))
    }

    /// Text column; NULL is replaced by `default`
    pub fn text_or(&self, column: &str, default: &str) -> Result<String> {
        match self.value(column)? {
            Value::Null => Ok(default.to_string()),
            Value::String(s) => Ok(s.clone()),
            other => Err(type_error(column, "text", other)),
        }
    }

    /// Non-null date column
    pub fn date(&self, column: &str) -> Result<NaiveDate> {
        let value = self.value(column)?;
        value.as_date().ok_or_else(|| type_error(column, "date", value))
    }
}

fn type_error(column: &str, expected: &str, found: &Value) -> LensError {
    LensError::storage(format!(
        "column '{column}' expected {expected} value, found {found}"
    ))
}
