mod introspection;
mod table;

pub use introspection::{column_names, has_column, index_exists, user_tables};
pub use table::{Column, ForeignKey, SqlType, Table, DEFAULT_TIMESTAMP};
