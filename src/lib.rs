#![warn(clippy::all, rust_2018_idioms)]

mod aggregate;
mod config;
mod container;
mod counts;
mod error;
mod expr;
mod filter;
mod summary;
mod table;
mod utils;
mod value;

pub use aggregate::{
    aggregate, AggFunc, Aggregation, DerivedColumn, MissingKeys, Reduction, SortBy,
};
pub use config::{AnalysisConfig, NamedAggregation};
pub use container::DataFrameContainer;
pub use counts::{nlargest, nunique, split_value_counts, value_counts};
pub use error::{Result, TableError};
pub use expr::Expr;
pub use filter::{DataFrameFilter, FilterOps};
pub use summary::{
    correlation, describe, duplicate_rows, null_counts, reduce_column, DESCRIBE_STATISTICS,
};
pub use table::Table;
pub use utils::{table_from_dataframe, table_to_dataframe};
pub use value::{ColumnKind, Value};
