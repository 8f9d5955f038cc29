use rusqlite::types::{FromSql, FromSqlError, Value, ValueRef};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::sync::Arc;

/// A fully materialized result row. Owns its values; independent of the
/// statement that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn read(row: &rusqlite::Row<'_>, columns: &Arc<[String]>) -> rusqlite::Result<Self> {
        let values = (0..columns.len())
            .map(|index| row.get::<_, Value>(index))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Row {
            columns: Arc::clone(columns),
            values,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Raw value of `column`, if the row has such a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.index_of(column).map(|index| &self.values[index])
    }

    /// Typed value of `column`, converted the same way rusqlite converts a
    /// live row.
    pub fn get_as<T: FromSql>(&self, column: &str) -> rusqlite::Result<T> {
        let index = self
            .index_of(column)
            .ok_or_else(|| rusqlite::Error::InvalidColumnName(column.to_string()))?;
        let value = &self.values[index];
        T::column_result(ValueRef::from(value)).map_err(|err| match err {
            FromSqlError::InvalidType => rusqlite::Error::InvalidColumnType(
                index,
                column.to_string(),
                value.data_type(),
            ),
            other => rusqlite::Error::FromSqlConversionFailure(
                index,
                value.data_type(),
                Box::new(other),
            ),
        })
    }
}

struct SerializableValue<'a>(&'a Value);

impl Serialize for SerializableValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_bytes(b),
        }
    }
}

/// Serializes as an object keyed by column name, in column order.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.columns.iter().zip(self.values.iter()) {
            map.serialize_entry(column, &SerializableValue(value))?;
        }
        map.end()
    }
}
