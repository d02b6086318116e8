pub(crate) mod db;
mod tables;

pub use db::Database;
pub use tables::{schema_sql, CatalogTable, TableDef, TABLES};
