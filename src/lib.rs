extern crate self as swift_catalog;

pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod infrastructure;
pub mod mapping;
pub mod model;
pub mod naming;
pub mod query;
pub mod repository;
pub mod statement;

pub use config::{Config, DatabaseConfig};
pub use db::{connect, connect_mssql, connect_postgres, DatabaseRef, DbKind};
pub use error::{CatalogError, Result};
pub use executor::SqlExecutor;
pub use infrastructure::bank_repository::{
    country_name_for_iso2, BranchRepository, HeadquartersRepository,
};
pub use infrastructure::generic_repository::GenericRepository;
pub use mapping::{ColumnMeta, Entity, FieldDef, FromParam, FromRowNamed, Record, TableMeta};
pub use model::{Branch, Headquarters};
pub use naming::{pluralize, table_name_for, to_storage_name, TableRegistry};
pub use query::{Expr, PlaceholderStyle, Query, SqlParam, ToParam, ValueClass};
pub use repository::{Crud, QueryExecutor, Repository};
pub use statement::{SqlBuilder, SqlStatement, StatementKind};

pub use swift_catalog_macros::Entity; // derive macro

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use tiberius;
    pub use tokio_postgres;
}
