use crate::error::Result;
use crate::table::Table;
use crate::value::{ColumnKind, Value};
use polars::prelude::*;

/// Converts a polars frame into a [`Table`]. Numeric and boolean columns
/// become numbers with NaN read as missing; string columns become text and
/// anything else is cast to string.
pub fn table_from_dataframe(df: &DataFrame) -> Result<Table> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut values = df
        .get_columns()
        .iter()
        .map(|series| series_values(series).map(Vec::into_iter))
        .collect::<PolarsResult<Vec<_>>>()?;

    let rows = (0..df.height())
        .map(|_| {
            values
                .iter_mut()
                .map(|column| column.next().unwrap_or_default())
                .collect()
        })
        .collect();
    Table::from_rows(columns, rows)
}

pub(crate) fn series_values(series: &Series) -> PolarsResult<Vec<Value>> {
    let dtype = series.dtype();
    if dtype.is_numeric() || matches!(dtype, DataType::Boolean) {
        let numbers = series.cast(&DataType::Float64)?;
        return Ok(numbers
            .f64()?
            .into_iter()
            .map(|n| n.map_or(Value::Missing, Value::finite))
            .collect());
    }
    let text = match dtype {
        DataType::String => series.clone(),
        other => {
            log::warn!("casting column `{}` of type {other} to string", series.name());
            series.cast(&DataType::String)?
        }
    };
    Ok(text
        .str()?
        .into_iter()
        .map(|s| Value::from(s.map(str::to_string)))
        .collect())
}

/// Converts a [`Table`] into a polars frame for display or plotting.
/// Numeric and all-missing columns become `Float64`, everything else `String`.
pub fn table_to_dataframe(table: &Table) -> Result<DataFrame> {
    let series = table
        .dtypes()
        .into_iter()
        .enumerate()
        .map(|(idx, (name, kind))| {
            column_series(&name, kind, table.rows().iter().map(|row| &row[idx]))
        })
        .collect::<Vec<_>>();
    Ok(DataFrame::new(series)?)
}

pub(crate) fn column_series<'a>(
    name: &str,
    kind: ColumnKind,
    values: impl Iterator<Item = &'a Value>,
) -> Series {
    match kind {
        ColumnKind::Numeric | ColumnKind::Empty => {
            Series::new(name, values.map(Value::as_f64).collect::<Vec<_>>())
        }
        ColumnKind::Text | ColumnKind::Mixed => Series::new(
            name,
            values
                .map(|v| (!v.is_missing()).then(|| v.to_string()))
                .collect::<Vec<_>>(),
        ),
    }
}
