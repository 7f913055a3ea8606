use crate::aggregate::Aggregation;
use crate::error::Result;
use crate::filter::DataFrameFilter;
use crate::summary::describe;
use crate::table::Table;
use crate::utils::table_from_dataframe;
use crate::value::ColumnKind;
use polars::prelude::*;
use std::path::Path;

const INFER_SCHEMA_ROWS: usize = 10000;
const NULL_MARKERS: [&str; 5] = ["NaN", "nan", "NA", "N/A", "null"];

/// A loaded table together with the bookkeeping shown about it: a title,
/// its shape and column names, and a lazily computed `describe` summary.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrameContainer {
    pub title: String,
    pub shape: (usize, usize),
    pub columns: Vec<String>,
    pub data: Table,
    pub summary: Option<Table>,
}

impl DataFrameContainer {
    pub fn new(table: Table, title: &str) -> Self {
        Self {
            title: title.to_string(),
            shape: table.shape(),
            columns: table.columns().to_vec(),
            data: table,
            summary: None,
        }
    }

    pub fn from_dataframe(df: &DataFrame, title: &str) -> Result<Self> {
        Ok(Self::new(table_from_dataframe(df)?, title))
    }

    /// Reads a headed CSV file, letting polars infer column types. Empty
    /// fields and the usual NaN/NA spellings load as missing.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let null_values: Vec<String> = NULL_MARKERS.iter().map(|s| s.to_string()).collect();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .map_parse_options(|opts| {
                opts.with_null_values(Some(NullValues::AllColumns(null_values.clone())))
            })
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        let title = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("dataset");
        log::debug!("loaded {} with shape {:?}", path.display(), df.shape());
        Self::from_dataframe(&df, title)
    }

    pub fn normalize_column_names(&mut self) -> Result<()> {
        let renamed = self.data.rename_columns(|c| c.trim().to_lowercase())?;
        self.replace_data(renamed);
        Ok(())
    }

    pub fn dtypes(&self) -> Vec<(String, ColumnKind)> {
        self.data.dtypes()
    }

    pub fn describe(&mut self) -> Result<&Table> {
        let summary = match self.summary.take() {
            Some(summary) => summary,
            None => describe(&self.data)?,
        };
        Ok(self.summary.insert(summary))
    }

    pub fn aggregate_dataframe(&self, aggregation: &Aggregation) -> Result<Table> {
        aggregation.apply(&self.data)
    }

    /// Filters into a new container, or replaces this container's data when
    /// `inplace` is set. Returns the new container in the first case.
    pub fn filter_dataframe(
        &mut self,
        filter: &DataFrameFilter,
        inplace: bool,
    ) -> Result<Option<DataFrameContainer>> {
        let filtered = self.data.filter(filter)?;
        if inplace {
            self.replace_data(filtered);
            return Ok(None);
        }
        let title = format!("filtered_{}", self.title);
        Ok(Some(DataFrameContainer::new(filtered, &title)))
    }

    pub fn run_aggregations<'a, I>(&self, aggregations: I) -> Result<Vec<(String, Table)>>
    where
        I: IntoIterator<Item = (&'a str, &'a Aggregation)>,
    {
        aggregations
            .into_iter()
            .map(|(name, aggregation)| {
                log::debug!("running aggregation `{name}` on {}", self.title);
                Ok((name.to_string(), self.aggregate_dataframe(aggregation)?))
            })
            .collect()
    }

    fn replace_data(&mut self, table: Table) {
        self.shape = table.shape();
        self.columns = table.columns().to_vec();
        self.data = table;
        self.summary = None;
    }
}
