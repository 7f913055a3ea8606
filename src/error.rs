use polars::prelude::PolarsError;

pub type Result<T, E = TableError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// A referenced column is absent, duplicated, or the table shape is wrong.
    #[error("schema error: {0}")]
    Schema(String),

    /// A reduction or expression was applied to values of the wrong kind.
    #[error("type error: {func} cannot be applied to {kind} column `{column}`")]
    Type {
        column: String,
        func: String,
        kind: String,
    },

    /// A derived column refers to a column that is not defined before it.
    #[error("dependency error: derived column `{column}` references undefined column `{reference}`")]
    Dependency { column: String, reference: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TableError {
    pub(crate) fn missing_column(name: &str) -> Self {
        Self::Schema(format!("column `{name}` does not exist"))
    }
}
