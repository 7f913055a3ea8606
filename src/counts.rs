use crate::aggregate::{AggFunc, Aggregation, MissingKeys};
use crate::error::{Result, TableError};
use crate::summary::reduce_column;
use crate::table::Table;
use crate::value::Value;

/// Distinct non-missing values of `column` with their row counts, most
/// frequent first. Ties keep first-encountered order.
pub fn value_counts(table: &Table, column: &str) -> Result<Table> {
    Aggregation::new([column])
        .reduce("count", column, AggFunc::CountAll)
        .missing_keys(MissingKeys::Drop)
        .sort_by("count", true)
        .apply(table)
}

/// Splits every text cell of `column` on `delimiter`, trims the pieces and
/// counts them as in [`value_counts`]. Empty pieces are ignored.
pub fn split_value_counts(table: &Table, column: &str, delimiter: &str) -> Result<Table> {
    let mut exploded = Table::new([column])?;
    for value in table.column(column)? {
        match value {
            value if value.is_missing() => {}
            Value::Text(text) => {
                for piece in text.split(delimiter).map(str::trim).filter(|p| !p.is_empty()) {
                    exploded.push_row(vec![Value::from(piece)])?;
                }
            }
            _ => {
                return Err(TableError::Type {
                    column: column.to_string(),
                    func: "split".to_string(),
                    kind: "numeric".to_string(),
                })
            }
        }
    }
    log::debug!(
        "split `{column}` into {} pieces from {} rows",
        exploded.height(),
        table.height()
    );
    value_counts(&exploded, column)
}

pub fn nunique(table: &Table, column: &str) -> Result<usize> {
    let count = reduce_column(table, column, AggFunc::CountDistinct)?;
    Ok(count.as_f64().unwrap_or_default() as usize)
}

/// The `n` rows with the largest `column`, projected onto `columns`.
/// Missing values never rank ahead of present ones.
pub fn nlargest<S: AsRef<str>>(
    table: &Table,
    n: usize,
    column: &str,
    columns: &[S],
) -> Result<Table> {
    table.sort_by(column, true)?.head(n).select(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anime() -> Table {
        Table::from_rows(
            ["name", "type", "genre", "members"],
            vec![
                vec!["Naruto".into(), "TV".into(), "Action, Adventure".into(), 1_800_000.into()],
                vec!["Akira".into(), "Movie".into(), "Action,Sci-Fi".into(), 400_000.into()],
                vec!["Clannad".into(), "TV".into(), "Drama, Romance".into(), 900_000.into()],
                vec!["Nausicaa".into(), "Movie".into(), Value::Missing, Value::Missing],
                vec!["Hellsing".into(), "OVA".into(), "Action".into(), 500_000.into()],
            ],
        )
        .unwrap()
    }

    fn pairs(table: &Table) -> Vec<(Value, Value)> {
        table
            .rows()
            .iter()
            .map(|row| (row[0].clone(), row[1].clone()))
            .collect()
    }

    #[test]
    fn value_counts_descending_with_stable_ties() {
        let counts = value_counts(&anime(), "type").unwrap();
        assert_eq!(
            pairs(&counts),
            vec![
                (Value::from("TV"), Value::from(2.0)),
                (Value::from("Movie"), Value::from(2.0)),
                (Value::from("OVA"), Value::from(1.0)),
            ]
        );
    }

    #[test]
    fn genre_counts() {
        let counts = split_value_counts(&anime(), "genre", ",").unwrap();
        assert_eq!(counts.value(0, "genre").unwrap(), &Value::from("Action"));
        assert_eq!(counts.value(0, "count").unwrap(), &Value::from(3.0));
        assert_eq!(counts.height(), 5);
        assert_eq!(nunique(&anime(), "type").unwrap(), 3);
    }

    #[test]
    fn top_by_members() {
        let top = nlargest(&anime(), 2, "members", &["name", "members"]).unwrap();
        assert_eq!(
            pairs(&top),
            vec![
                (Value::from("Naruto"), Value::from(1_800_000.0)),
                (Value::from("Clannad"), Value::from(900_000.0)),
            ]
        );
    }
}
