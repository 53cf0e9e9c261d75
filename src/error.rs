use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No row with key '{key}' in table {table}")]
    NotFound { table: String, key: String },

    #[error("{operation} on table {table} affected no rows")]
    WriteFailure {
        operation: &'static str,
        table: String,
    },

    #[error("{operation} on table {table}: requested {requested} keys but found {found}")]
    Consistency {
        operation: &'static str,
        table: String,
        requested: usize,
        found: usize,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Database error: {0:#}")]
    Database(anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CatalogError {
    pub fn not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        CatalogError::NotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn write_failure(operation: &'static str, table: impl Into<String>) -> Self {
        CatalogError::WriteFailure {
            operation,
            table: table.into(),
        }
    }

    pub fn consistency(
        operation: &'static str,
        table: impl Into<String>,
        requested: usize,
        found: usize,
    ) -> Self {
        CatalogError::Consistency {
            operation,
            table: table.into(),
            requested,
            found,
        }
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        CatalogError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
