use crate::aggregate::sort_options;
use crate::error::{Result, TableError};
use crate::expr::Expr;
use crate::utils::{column_series, series_values, table_to_dataframe};
use crate::value::{ColumnKind, KeyValue, Value};
use polars::prelude as pl;
use polars::prelude::{DataFrame, IntoLazy, LazyFrame, NamedFrom, Series};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub(crate) const VALUE: &str = "value";
const POSITION: &str = "position";

/// An ordered collection of rows sharing one column list.
///
/// Rows are stored row-major; every row holds exactly one [`Value`] per
/// column, with absent data spelled [`Value::Missing`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(TableError::Schema(format!("duplicate column `{name}`")));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TableError::Schema(format!(
                "row has {} values but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::missing_column(name))
    }

    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn value(&self, row: usize, column: &str) -> Result<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx]).ok_or_else(|| {
            TableError::Schema(format!("row {row} out of bounds for {} rows", self.height()))
        })
    }

    pub fn kind(&self, name: &str) -> Result<ColumnKind> {
        Ok(ColumnKind::of(self.column(name)?))
    }

    pub fn dtypes(&self) -> Vec<(String, ColumnKind)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let kind = ColumnKind::of(self.rows.iter().map(|row| &row[idx]));
                (name.clone(), kind)
            })
            .collect()
    }

    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut out = Table::new(names.iter().map(|n| n.as_ref().to_string()))?;
        out.rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(out)
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Stable sort on one column. Missing values go last in both directions.
    pub fn sort_by(&self, column: &str, descending: bool) -> Result<Table> {
        let idx = self.column_index(column)?;
        let cells = self.rows.iter().map(|row| &row[idx]);
        let values = column_series(VALUE, self.kind(column)?, cells);
        self.take_rows_by(values, |lf| lf.sort([VALUE], sort_options(descending)))
    }

    pub fn with_column(&self, name: &str, expr: &Expr) -> Result<Table> {
        self.check_new_column(name)?;
        let mut references: Vec<&str> = Vec::new();
        for reference in expr.columns() {
            let kind = self.kind(reference)?;
            if !kind.is_numeric_compatible() {
                return Err(TableError::Type {
                    column: reference.to_string(),
                    func: "arithmetic".to_string(),
                    kind: kind.to_string(),
                });
            }
            if !references.contains(&reference) {
                references.push(reference);
            }
        }
        self.append_computed(name, &references, expr.to_polars())
    }

    /// Appends `target` holding the label of the right-closed interval
    /// `(bins[i], bins[i + 1]]` each value of `column` falls in. Values
    /// outside every interval, and missing values, map to missing.
    pub fn cut<S: AsRef<str>>(
        &self,
        column: &str,
        bins: &[f64],
        labels: &[S],
        target: &str,
    ) -> Result<Table> {
        self.check_new_column(target)?;
        let kind = self.kind(column)?;
        if !kind.is_numeric_compatible() {
            return Err(TableError::Type {
                column: column.to_string(),
                func: "cut".to_string(),
                kind: kind.to_string(),
            });
        }
        if bins.len() < 2 || labels.len() != bins.len() - 1 {
            return Err(TableError::Schema(format!(
                "{} bins need {} labels, got {}",
                bins.len(),
                bins.len().saturating_sub(1),
                labels.len()
            )));
        }
        if bins.windows(2).any(|w| w[0].partial_cmp(&w[1]) != Some(Ordering::Less)) {
            return Err(TableError::Schema("bins must increase monotonically".into()));
        }

        let value = pl::col(column);
        let unbinned = pl::lit(pl::NULL).cast(pl::DataType::String);
        let binned = bins
            .windows(2)
            .zip(labels)
            .rev()
            .fold(unbinned, |rest, (edges, label)| {
                let inside = value
                    .clone()
                    .gt(pl::lit(edges[0]))
                    .and(value.clone().lt_eq(pl::lit(edges[1])));
                pl::when(inside).then(pl::lit(label.as_ref())).otherwise(rest)
            });
        self.append_computed(target, &[column], binned)
    }

    /// Appends `target` by looking up the text of `source` in `mapping`.
    /// Values without an entry map to missing.
    pub fn map_column(
        &self,
        source: &str,
        target: &str,
        mapping: &HashMap<String, Value>,
    ) -> Result<Table> {
        let idx = self.column_index(source)?;
        self.check_new_column(target)?;
        let mut out = self.clone();
        out.columns.push(target.to_string());
        for row in &mut out.rows {
            let mapped = row[idx]
                .as_str()
                .and_then(|s| mapping.get(s))
                .cloned()
                .unwrap_or_default();
            row.push(mapped);
        }
        Ok(out)
    }

    pub fn rename_columns<F>(&self, rename: F) -> Result<Table>
    where
        F: Fn(&str) -> String,
    {
        let mut out = Table::new(self.columns.iter().map(|c| rename(c)))?;
        out.rows = self.rows.clone();
        Ok(out)
    }

    /// Keeps the first occurrence of every distinct row.
    pub fn drop_duplicates(&self) -> Table {
        let mut seen = HashSet::new();
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| seen.insert(row_key(row)))
                .cloned()
                .collect(),
        }
    }

    fn check_new_column(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            return Err(TableError::Schema(format!("duplicate column `{name}`")));
        }
        Ok(())
    }

    fn append_computed(&self, name: &str, references: &[&str], expr: pl::Expr) -> Result<Table> {
        let df = if references.is_empty() {
            let rows = Series::full_null(POSITION, self.height(), &pl::DataType::Float64);
            DataFrame::new(vec![rows])?
        } else {
            table_to_dataframe(&self.select(references)?)?
        };
        let computed = df
            .lazy()
            .with_column(expr.alias(name))
            .select([pl::col(name)])
            .collect()?;
        let values = match computed.get_columns().first() {
            Some(series) => series_values(series)?,
            None => Vec::new(),
        };

        let mut out = self.clone();
        out.columns.push(name.to_string());
        for (row, value) in out.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(out)
    }

    /// Rows whose positions survive `plan` over the `value` column, in output order.
    pub(crate) fn take_rows_by<F>(&self, values: Series, plan: F) -> Result<Table>
    where
        F: FnOnce(LazyFrame) -> LazyFrame,
    {
        let positions: Vec<pl::IdxSize> = (0..self.height()).map(|i| i as pl::IdxSize).collect();
        let positions = Series::new(POSITION, positions);
        let kept = plan(DataFrame::new(vec![values, positions])?.lazy())
            .select([pl::col(POSITION)])
            .collect()?;
        let rows = kept
            .column(POSITION)?
            .idx()?
            .into_iter()
            .flatten()
            .filter_map(|i| self.rows.get(i as usize).cloned())
            .collect();
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }
}

pub(crate) fn row_key(row: &[Value]) -> Vec<KeyValue> {
    row.iter().map(Value::key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn anime() -> Table {
        Table::from_rows(
            ["name", "year", "rating"],
            vec![
                vec!["Cowboy Bebop".into(), 1998.into(), 8.8.into()],
                vec!["Akira".into(), 1988.into(), Value::Missing],
                vec!["Mushishi".into(), 2005.into(), 8.7.into()],
                vec!["Monster".into(), 2004.into(), 8.8.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_columns_and_ragged_rows() {
        assert_matches!(Table::new(["a", "a"]), Err(TableError::Schema(_)));
        let mut table = Table::new(["a", "b"]).unwrap();
        assert_matches!(table.push_row(vec![1.0.into()]), Err(TableError::Schema(_)));
    }

    #[test]
    fn sort_is_stable_with_missing_last() {
        let table = anime();
        for descending in [true, false] {
            let sorted = table.sort_by("rating", descending).unwrap();
            assert_eq!(sorted.value(3, "name").unwrap(), &Value::from("Akira"));
        }
        let sorted = table.sort_by("rating", true).unwrap();
        let names: Vec<_> = sorted.column("name").unwrap().cloned().collect();
        assert_eq!(
            names,
            vec![
                Value::from("Cowboy Bebop"),
                Value::from("Monster"),
                Value::from("Mushishi"),
                Value::from("Akira")
            ]
        );
    }

    #[test]
    fn with_column_computes_decade() {
        let table = anime()
            .with_column("decade", &(Expr::col("year").floor_div(Expr::lit(10.0)) * Expr::lit(10.0)))
            .unwrap();
        let decades: Vec<_> = table.column("decade").unwrap().cloned().collect();
        assert_eq!(
            decades,
            vec![
                Value::from(1990.0),
                Value::from(1980.0),
                Value::from(2000.0),
                Value::from(2000.0)
            ]
        );
    }

    #[test]
    fn with_column_rejects_text_operands() {
        assert_matches!(
            anime().with_column("x", &(Expr::col("name") + Expr::lit(1.0))),
            Err(TableError::Type { .. })
        );
        assert_matches!(
            anime().with_column("x", &Expr::col("nope")),
            Err(TableError::Schema(_))
        );
    }

    #[test]
    fn sort_skips_nan_like_missing() {
        let table = Table::from_rows(
            ["name", "rating"],
            vec![
                vec!["Akira".into(), Value::Number(f64::NAN)],
                vec!["Mushishi".into(), 8.7.into()],
                vec!["Monster".into(), 8.8.into()],
            ],
        )
        .unwrap();
        let sorted = table.sort_by("rating", false).unwrap();
        let names: Vec<_> = sorted.column("name").unwrap().cloned().collect();
        assert_eq!(
            names,
            vec![Value::from("Mushishi"), Value::from("Monster"), Value::from("Akira")]
        );
    }

    #[test]
    fn cut_uses_right_closed_bins() {
        let table = Table::from_rows(
            ["rating"],
            vec![
                vec![5.0.into()],
                vec![7.0.into()],
                vec![7.5.into()],
                vec![9.2.into()],
                vec![Value::Missing],
                vec![0.0.into()],
                vec![11.0.into()],
            ],
        )
        .unwrap();
        let binned = table
            .cut("rating", &[0.0, 7.0, 8.5, 10.0], &["low", "mid", "high"], "band")
            .unwrap();
        let bands: Vec<_> = binned.column("band").unwrap().cloned().collect();
        assert_eq!(
            bands,
            vec![
                Value::from("low"),
                Value::from("low"),
                Value::from("mid"),
                Value::from("high"),
                Value::Missing,
                Value::Missing,
                Value::Missing,
            ]
        );
    }

    #[test]
    fn cut_checks_bins_and_labels() {
        let table = anime();
        assert_matches!(
            table.cut("rating", &[0.0, 5.0], &["a", "b"], "band"),
            Err(TableError::Schema(_))
        );
        assert_matches!(
            table.cut("rating", &[5.0, 0.0], &["a"], "band"),
            Err(TableError::Schema(_))
        );
        assert_matches!(
            table.cut("name", &[0.0, 5.0], &["a"], "band"),
            Err(TableError::Type { .. })
        );
    }

    #[test]
    fn map_column_leaves_unmapped_missing() {
        let table = Table::from_rows(
            ["species"],
            vec![vec!["Adelie".into()], vec!["Chinstrap".into()], vec!["Gentoo".into()]],
        )
        .unwrap();
        let mapping = HashMap::from([
            ("Adelie".to_string(), Value::from("adel")),
            ("Gentoo".to_string(), Value::from("gent")),
        ]);
        let mapped = table.map_column("species", "species_2", &mapping).unwrap();
        let values: Vec<_> = mapped.column("species_2").unwrap().cloned().collect();
        assert_eq!(values, vec![Value::from("adel"), Value::Missing, Value::from("gent")]);
    }

    #[test]
    fn drop_duplicates_keeps_first() {
        let table = Table::from_rows(
            ["a", "b"],
            vec![
                vec![1.0.into(), Value::Missing],
                vec![2.0.into(), "x".into()],
                vec![1.0.into(), Value::Missing],
            ],
        )
        .unwrap();
        let deduped = table.drop_duplicates();
        assert_eq!(deduped.height(), 2);
        assert_eq!(deduped.rows()[1], vec![Value::from(2.0), Value::from("x")]);
    }

    #[test]
    fn select_and_head() {
        let table = anime().select(&["rating", "name"]).unwrap().head(2);
        assert_eq!(table.columns(), &["rating".to_string(), "name".to_string()]);
        assert_eq!(table.height(), 2);
        assert_matches!(anime().select(&["missing"]), Err(TableError::Schema(_)));
    }
}
