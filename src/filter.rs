use crate::error::{Result, TableError};
use crate::table::{Table, VALUE};
use crate::utils::column_series;
use crate::value::Value;
use polars::prelude as pl;
use polars::prelude::{NamedFrom, Series};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOps {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqualThan,
    LowerThan,
    LowerEqualThan,
    IsNull,
    IsNotNull,
}

/// Keeps the rows whose `column` satisfies `operation` against `value`.
///
/// Comparisons only match values of the same kind, so a missing cell or a
/// number compared with text never passes anything but `IsNull`.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrameFilter {
    pub column: String,
    pub operation: FilterOps,
    pub value: Value,
}

impl DataFrameFilter {
    pub fn new(column: &str, operation: FilterOps, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            operation,
            value: value.into(),
        }
    }

    fn predicate(&self) -> pl::Expr {
        let cell = pl::col(VALUE);
        let operand = match &self.value {
            Value::Number(n) => pl::lit(*n),
            Value::Text(s) => pl::lit(s.as_str()),
            Value::Missing => pl::lit(pl::NULL),
        };
        match self.operation {
            FilterOps::Equal => cell.eq(operand),
            FilterOps::NotEqual => cell.neq(operand),
            FilterOps::GreaterThan => cell.gt(operand),
            FilterOps::GreaterEqualThan => cell.gt_eq(operand),
            FilterOps::LowerThan => cell.lt(operand),
            FilterOps::LowerEqualThan => cell.lt_eq(operand),
            FilterOps::IsNull => cell.is_null(),
            FilterOps::IsNotNull => cell.is_not_null(),
        }
    }

    // comparisons only see cells of the operand's kind
    fn cells(&self, table: &Table) -> Result<Series> {
        let cells = table.column(&self.column)?;
        Ok(match (self.operation, &self.value) {
            (FilterOps::IsNull | FilterOps::IsNotNull, _) => {
                column_series(VALUE, table.kind(&self.column)?, cells)
            }
            (_, Value::Number(_)) => {
                Series::new(VALUE, cells.map(Value::as_f64).collect::<Vec<_>>())
            }
            _ => Series::new(VALUE, cells.map(Value::as_str).collect::<Vec<_>>()),
        })
    }
}

impl Table {
    pub fn filter(&self, filter: &DataFrameFilter) -> Result<Table> {
        let needs_operand = !matches!(filter.operation, FilterOps::IsNull | FilterOps::IsNotNull);
        if needs_operand && filter.value.is_missing() {
            return Err(TableError::Schema(format!(
                "{:?} on `{}` needs a value to compare against",
                filter.operation, filter.column
            )));
        }
        let cells = filter.cells(self)?;
        let out = self.take_rows_by(cells, |lf| lf.filter(filter.predicate()))?;
        log::debug!(
            "filter {:?} on `{}` kept {} of {} rows",
            filter.operation,
            filter.column,
            out.height(),
            self.height()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn anime() -> Table {
        Table::from_rows(
            ["name", "year", "episodes"],
            vec![
                vec!["One Piece".into(), 1999.into(), 1100.into()],
                vec!["Frieren".into(), 2023.into(), 28.into()],
                vec!["Mononoke".into(), 2007.into(), Value::Missing],
                vec!["Trigun".into(), 1998.into(), 26.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn numeric_comparisons_skip_missing() {
        let table = anime();
        let short = table
            .filter(&DataFrameFilter::new("episodes", FilterOps::LowerEqualThan, 100.0))
            .unwrap();
        assert_eq!(short.height(), 2);
        let recent = table
            .filter(&DataFrameFilter::new("year", FilterOps::GreaterEqualThan, 2007.0))
            .unwrap();
        assert_eq!(recent.height(), 2);
    }

    #[test]
    fn null_checks() {
        let table = anime();
        let nulls = table
            .filter(&DataFrameFilter::new("episodes", FilterOps::IsNull, Value::Missing))
            .unwrap();
        assert_eq!(nulls.value(0, "name").unwrap(), &Value::from("Mononoke"));
        let present = table
            .filter(&DataFrameFilter::new("episodes", FilterOps::IsNotNull, Value::Missing))
            .unwrap();
        assert_eq!(present.height(), 3);
    }

    #[test]
    fn text_equality() {
        let table = anime();
        let frieren = table
            .filter(&DataFrameFilter::new("name", FilterOps::Equal, "Frieren"))
            .unwrap();
        assert_eq!(frieren.height(), 1);
        let others = table
            .filter(&DataFrameFilter::new("name", FilterOps::NotEqual, "Frieren"))
            .unwrap();
        assert_eq!(others.height(), 3);
    }

    #[test]
    fn kind_mismatch_matches_nothing() {
        let table = anime();
        let none = table
            .filter(&DataFrameFilter::new("name", FilterOps::GreaterThan, 1.0))
            .unwrap();
        assert!(none.is_empty());
        let none = table
            .filter(&DataFrameFilter::new("year", FilterOps::NotEqual, "1999"))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn comparison_needs_value() {
        assert_matches!(
            anime().filter(&DataFrameFilter::new("year", FilterOps::Equal, Value::Missing)),
            Err(TableError::Schema(_))
        );
        assert_matches!(
            anime().filter(&DataFrameFilter::new("genre", FilterOps::IsNull, Value::Missing)),
            Err(TableError::Schema(_))
        );
    }
}
