use rusqlite::Connection;

use super::introspection::column_names;

pub const DEFAULT_TIMESTAMP: &str = "CURRENT_TIMESTAMP";

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when optional
            // field assignments are passed to the macro (e.g., `is_primary_key = true`)
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                autoincrement: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

/// Rendered as a bare `REFERENCES` clause, no ON DELETE action.
pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub autoincrement: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<&'static ForeignKey>,
}

impl Column {
    /// Column definition as it appears inside CREATE TABLE.
    pub fn definition(&self) -> String {
        self.render(true)
    }

    /// Whether ALTER TABLE ADD COLUMN can add this column to a table that
    /// already holds rows.
    pub fn is_addable(&self) -> bool {
        !self.is_primary_key && !self.is_unique && !(self.non_null && self.default_value.is_none())
    }

    /// SQLite refuses non-constant defaults in ADD COLUMN.
    pub fn has_constant_default(&self) -> bool {
        matches!(self.default_value, Some(d) if d != DEFAULT_TIMESTAMP)
    }

    /// Definition for ALTER TABLE ADD COLUMN. A non-constant default is left
    /// out and has to be backfilled by the caller.
    pub fn alter_definition(&self) -> String {
        self.render(self.has_constant_default())
    }

    fn render(&self, with_default: bool) -> String {
        let mut sql = format!("\"{}\" {}", self.name, self.sql_type.as_sql());
        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.non_null {
            sql.push_str(" NOT NULL");
        }
        if self.is_unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default_value) = self.default_value.filter(|_| with_default) {
            sql.push_str(&format!(" DEFAULT {}", default_value));
        }
        if let Some(foreign_key) = self.foreign_key {
            sql.push_str(&format!(
                " REFERENCES {}({})",
                foreign_key.foreign_table, foreign_key.foreign_column
            ));
        }
        sql
    }
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut create_sql = format!("CREATE TABLE IF NOT EXISTS {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&column.definition());
        }
        create_sql.push_str(");");
        create_sql
    }

    /// Creates the table unless it already exists. An existing table is
    /// left untouched whatever its shape. Indices are left to the migration
    /// steps since they may cover columns an old table lacks.
    pub fn create_if_absent(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(&self.create_sql(), [])?;
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Declared columns that the live table does not have.
    pub fn missing_columns(&self, conn: &Connection) -> rusqlite::Result<Vec<&'static str>> {
        let actual = column_names(conn, self.name)?;
        Ok(self
            .columns
            .iter()
            .map(|c| c.name)
            .filter(|name| !actual.iter().any(|a| a == name))
            .collect())
    }
}
