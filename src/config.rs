use crate::aggregate::Aggregation;
use crate::container::DataFrameContainer;
use crate::error::Result;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A dataset plus the named aggregations to run over it, read from JSON.
///
/// ```json
/// {
///   "dataset": "anime.csv",
///   "normalize_columns": true,
///   "aggregations": [
///     {
///       "name": "rating_by_type",
///       "group_by": ["type"],
///       "reductions": [{"output": "mean", "source": "rating", "func": "mean"}]
///     }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub dataset: PathBuf,
    pub normalize_columns: bool,
    pub aggregations: Vec<NamedAggregation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedAggregation {
    pub name: String,
    #[serde(flatten)]
    pub aggregation: Aggregation,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a config file. A relative `dataset` path is resolved against
    /// the directory holding the config.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        if config.dataset.is_relative() {
            if let Some(dir) = path.parent() {
                config.dataset = dir.join(&config.dataset);
            }
        }
        Ok(config)
    }

    pub fn load_dataset(&self) -> Result<DataFrameContainer> {
        let mut container = DataFrameContainer::load_csv(&self.dataset)?;
        if self.normalize_columns {
            container.normalize_column_names()?;
        }
        Ok(container)
    }

    pub fn run(&self) -> Result<Vec<(String, Table)>> {
        let container = self.load_dataset()?;
        container.run_aggregations(
            self.aggregations
                .iter()
                .map(|a| (a.name.as_str(), &a.aggregation)),
        )
    }
}
