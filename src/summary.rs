use crate::aggregate::AggFunc;
use crate::error::{Result, TableError};
use crate::table::{row_key, Table};
use crate::utils::{table_from_dataframe, table_to_dataframe};
use crate::value::{ColumnKind, Value};
use polars::prelude as pl;
use polars::prelude::{IntoLazy, QuantileInterpolOptions};
use std::collections::HashSet;

pub const DESCRIBE_STATISTICS: [&str; 8] =
    ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Descriptive statistics for every numeric column.
///
/// The first output column is `statistic`, naming the row; every other
/// column corresponds to a numeric input column, in input order. Quantiles
/// interpolate linearly between the two closest ranks.
pub fn describe(table: &Table) -> Result<Table> {
    let numeric: Vec<String> = table
        .dtypes()
        .into_iter()
        .filter(|(_, kind)| *kind == ColumnKind::Numeric)
        .map(|(name, _)| name)
        .collect();

    let mut exprs = Vec::with_capacity(numeric.len() * DESCRIBE_STATISTICS.len());
    for (idx, name) in numeric.iter().enumerate() {
        let quantile = |q: f64| {
            pl::col(name).quantile(pl::lit(q), QuantileInterpolOptions::Linear)
        };
        let stats = [
            AggFunc::Count.expr(name),
            AggFunc::Mean.expr(name),
            AggFunc::Std.expr(name),
            AggFunc::Min.expr(name),
            quantile(0.25),
            quantile(0.5),
            quantile(0.75),
            AggFunc::Max.expr(name),
        ];
        exprs.extend(
            stats
                .into_iter()
                .zip(DESCRIBE_STATISTICS)
                .map(|(expr, stat)| expr.alias(&format!("{idx}:{stat}"))),
        );
    }
    let values = scalars(&table.select(&numeric)?, exprs)?;

    let mut columns = vec!["statistic".to_string()];
    columns.extend(numeric.iter().cloned());
    let rows = DESCRIBE_STATISTICS
        .iter()
        .enumerate()
        .map(|(stat, name)| {
            let mut row = vec![Value::from(*name)];
            row.extend(
                (0..numeric.len()).map(|column| {
                    let at = column * DESCRIBE_STATISTICS.len() + stat;
                    values.get(at).cloned().unwrap_or_default()
                }),
            );
            row
        })
        .collect();
    Table::from_rows(columns, rows)
}

fn scalars(table: &Table, exprs: Vec<pl::Expr>) -> Result<Vec<Value>> {
    if exprs.is_empty() {
        return Ok(Vec::new());
    }
    let df = table_to_dataframe(table)?.lazy().select(exprs).collect()?;
    Ok(table_from_dataframe(&df)?
        .rows()
        .first()
        .cloned()
        .unwrap_or_default())
}

/// Missing-value count per column, as `(column, missing)` rows.
pub fn null_counts(table: &Table) -> Result<Table> {
    let rows = table
        .columns()
        .iter()
        .map(|name| {
            let missing = table.column(name)?.filter(|v| v.is_missing()).count();
            Ok(vec![Value::from(name.as_str()), Value::Number(missing as f64)])
        })
        .collect::<Result<Vec<_>>>()?;
    Table::from_rows(["column", "missing"], rows)
}

/// Number of rows that repeat an earlier row exactly.
pub fn duplicate_rows(table: &Table) -> usize {
    let mut seen = HashSet::new();
    table
        .rows()
        .iter()
        .filter(|row| !seen.insert(row_key(row)))
        .count()
}

pub fn reduce_column(table: &Table, column: &str, func: AggFunc) -> Result<Value> {
    let kind = table.kind(column)?;
    check_kind(column, kind, func)?;
    let values = scalars(&table.select(&[column])?, vec![func.expr(column)])?;
    Ok(values.into_iter().next().unwrap_or_default())
}

/// Pearson correlation of two numeric columns over the rows where both are
/// present. Missing when fewer than two such rows exist or either side has
/// zero variance.
pub fn correlation(table: &Table, a: &str, b: &str) -> Result<Value> {
    for column in [a, b] {
        check_kind(column, table.kind(column)?, AggFunc::Mean)?;
    }
    let pairs: Vec<(f64, f64)> = table
        .column(a)?
        .zip(table.column(b)?)
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return Ok(Value::Missing);
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Ok(Value::Missing);
    }
    Ok(Value::finite(cov / (var_x.sqrt() * var_y.sqrt())))
}

fn check_kind(column: &str, kind: ColumnKind, func: AggFunc) -> Result<()> {
    if !func.accepts(kind) {
        return Err(TableError::Type {
            column: column.to_string(),
            func: func.name().to_string(),
            kind: kind.to_string(),
        });
    }
    Ok(())
}
