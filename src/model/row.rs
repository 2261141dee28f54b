use chrono::{NaiveDate, NaiveDateTime};

/// A single bound parameter in a generated INSERT.
///
/// Nullable variants carry their column type so Postgres receives a typed
/// NULL instead of an untyped text parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i32>),
    Float(Option<f64>),
    Text(Option<String>),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    pub fn int(value: i32) -> Self {
        Self::Int(Some(value))
    }

    pub fn float(value: f64) -> Self {
        Self::Float(Some(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(Some(value.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Int(None) | Self::Float(None) | Self::Text(None)
        )
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => *v,
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

/// A row type that maps onto one table and returns a generated `id`.
pub trait InsertRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Values in `COLUMNS` order.
    fn values(&self) -> Vec<SqlValue>;
}

/// Table, column list and flattened rows for one multi-row INSERT.
#[derive(Debug, Clone)]
pub struct RowInsert {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowInsert {
    pub fn of<R: InsertRow>(rows: &[R]) -> Self {
        Self {
            table: R::TABLE,
            columns: R::COLUMNS,
            rows: rows.iter().map(InsertRow::values).collect(),
        }
    }

    pub fn fields_per_row(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parameters in placeholder order (row-major).
    pub fn params(&self) -> impl Iterator<Item = &SqlValue> {
        self.rows.iter().flatten()
    }
}
