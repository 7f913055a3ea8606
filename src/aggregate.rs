use crate::error::{Result, TableError};
use crate::expr::{finite, Expr};
use crate::table::Table;
use crate::utils::{table_from_dataframe, table_to_dataframe};
use crate::value::ColumnKind;
use polars::prelude as pl;
use polars::prelude::{IntoLazy, SortMultipleOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    /// Non-missing values.
    Count,
    /// Every row of the group, missing values included.
    CountAll,
    CountDistinct,
    Sum,
    Mean,
    Median,
    Min,
    Max,
    /// Sample standard deviation (n - 1 denominator).
    Std,
}

impl AggFunc {
    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::CountAll => "count_all",
            AggFunc::CountDistinct => "count_distinct",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Median => "median",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Std => "std",
        }
    }

    pub(crate) fn accepts(self, kind: ColumnKind) -> bool {
        match self {
            AggFunc::Count | AggFunc::CountAll | AggFunc::CountDistinct => true,
            AggFunc::Sum | AggFunc::Mean | AggFunc::Median | AggFunc::Std => {
                kind.is_numeric_compatible()
            }
            AggFunc::Min | AggFunc::Max => kind != ColumnKind::Mixed,
        }
    }

    fn output_kind(self, kind: ColumnKind) -> ColumnKind {
        match self {
            AggFunc::Min | AggFunc::Max => kind,
            _ => ColumnKind::Numeric,
        }
    }

    // only the counts are non-null for an all-missing group
    pub(crate) fn expr(self, source: &str) -> pl::Expr {
        let c = pl::col(source);
        let null = || pl::lit(pl::NULL);
        match self {
            AggFunc::Count => c.count(),
            AggFunc::CountAll => c.len(),
            AggFunc::CountDistinct => c.drop_nulls().n_unique(),
            AggFunc::Sum => pl::when(c.clone().count().eq(pl::lit(0)))
                .then(null())
                .otherwise(finite(c.sum())),
            AggFunc::Mean => finite(c.mean()),
            AggFunc::Median => finite(c.median()),
            AggFunc::Min => c.min(),
            AggFunc::Max => c.max(),
            AggFunc::Std => pl::when(c.clone().count().lt(pl::lit(2)))
                .then(null())
                .otherwise(finite(c.std(1))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    pub output: String,
    pub source: String,
    pub func: AggFunc,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub output: String,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

/// How records whose group key contains a missing value are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeys {
    #[default]
    Group,
    Drop,
}

/// A group-by-then-reduce plan.
///
/// The output schema is the group-key columns, then the reduction outputs,
/// then the derived outputs, in declaration order. Rows come out in
/// first-encountered group order unless `sort_by` is set; `limit` truncates
/// after sorting.
///
/// ```
/// use tabagg::{AggFunc, Aggregation, Table, Value};
///
/// let table = Table::from_rows(
///     ["type", "rating"],
///     vec![
///         vec!["TV".into(), 8.6.into()],
///         vec!["TV".into(), 9.1.into()],
///         vec!["Movie".into(), 8.9.into()],
///     ],
/// )?;
/// let summary = Aggregation::new(["type"])
///     .reduce("avg_rating", "rating", AggFunc::Mean)
///     .apply(&table)?;
/// assert_eq!(summary.value(1, "type")?, &Value::from("Movie"));
/// # Ok::<(), tabagg::TableError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Aggregation {
    pub group_by: Vec<String>,
    pub reductions: Vec<Reduction>,
    pub derived: Vec<DerivedColumn>,
    pub sort_by: Option<SortBy>,
    pub limit: Option<usize>,
    pub missing_keys: MissingKeys,
}

impl Aggregation {
    pub fn new<I, S>(group_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_by: group_by.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn reduce(mut self, output: &str, source: &str, func: AggFunc) -> Self {
        self.reductions.push(Reduction {
            output: output.to_string(),
            source: source.to_string(),
            func,
        });
        self
    }

    pub fn derive(mut self, output: &str, expr: Expr) -> Self {
        self.derived.push(DerivedColumn {
            output: output.to_string(),
            expr,
        });
        self
    }

    pub fn sort_by(mut self, column: &str, descending: bool) -> Self {
        self.sort_by = Some(SortBy {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn missing_keys(mut self, missing_keys: MissingKeys) -> Self {
        self.missing_keys = missing_keys;
        self
    }

    pub fn apply(&self, table: &Table) -> Result<Table> {
        aggregate(table, self)
    }

    fn validate(&self, table: &Table) -> Result<Plan> {
        if self.group_by.is_empty() {
            return Err(TableError::Schema("at least one group key is required".into()));
        }
        if self.reductions.is_empty() {
            return Err(TableError::Schema("at least one reduction is required".into()));
        }

        let mut output: Vec<String> = Vec::new();
        let mut kinds: HashMap<String, ColumnKind> = HashMap::new();

        for key in &self.group_by {
            declare(&mut output, &mut kinds, key, table.kind(key)?)?;
        }

        let mut reductions = Vec::with_capacity(self.reductions.len());
        for r in &self.reductions {
            let kind = table.kind(&r.source)?;
            if !r.func.accepts(kind) {
                return Err(TableError::Type {
                    column: r.source.clone(),
                    func: r.func.name().to_string(),
                    kind: kind.to_string(),
                });
            }
            declare(&mut output, &mut kinds, &r.output, r.func.output_kind(kind))?;
            reductions.push(r.func.expr(&r.source).alias(&r.output));
        }

        let mut derived = Vec::with_capacity(self.derived.len());
        for d in &self.derived {
            for reference in d.expr.columns() {
                let kind = kinds.get(reference).ok_or_else(|| TableError::Dependency {
                    column: d.output.clone(),
                    reference: reference.to_string(),
                })?;
                if !kind.is_numeric_compatible() {
                    return Err(TableError::Type {
                        column: reference.to_string(),
                        func: format!("derived column `{}`", d.output),
                        kind: kind.to_string(),
                    });
                }
            }
            declare(&mut output, &mut kinds, &d.output, ColumnKind::Numeric)?;
            derived.push(d.expr.to_polars().alias(&d.output));
        }

        if let Some(sort) = &self.sort_by {
            if !kinds.contains_key(&sort.column) {
                return Err(TableError::Schema(format!(
                    "sort column `{}` is not part of the output",
                    sort.column
                )));
            }
        }

        Ok(Plan {
            output,
            reductions,
            derived,
        })
    }
}

fn declare(
    output: &mut Vec<String>,
    kinds: &mut HashMap<String, ColumnKind>,
    name: &str,
    kind: ColumnKind,
) -> Result<()> {
    if kinds.insert(name.to_string(), kind).is_some() {
        return Err(TableError::Schema(format!("duplicate output column `{name}`")));
    }
    output.push(name.to_string());
    Ok(())
}

struct Plan {
    output: Vec<String>,
    reductions: Vec<pl::Expr>,
    derived: Vec<pl::Expr>,
}

pub(crate) fn sort_options(descending: bool) -> SortMultipleOptions {
    SortMultipleOptions::default()
        .with_order_descending(descending)
        .with_nulls_last(true)
        .with_maintain_order(true)
}

/// Groups `table` by the key columns and reduces every group to one summary
/// row. The input table is never modified.
pub fn aggregate(table: &Table, aggregation: &Aggregation) -> Result<Table> {
    let plan = aggregation.validate(table)?;
    log::debug!(
        "aggregating {} rows by {:?} into {:?}",
        table.height(),
        aggregation.group_by,
        plan.output
    );

    let keys: Vec<pl::Expr> = aggregation.group_by.iter().map(|k| pl::col(k)).collect();
    let mut lf = table_to_dataframe(table)?.lazy();
    if aggregation.missing_keys == MissingKeys::Drop {
        if let Some(present) = keys
            .iter()
            .map(|k| k.clone().is_not_null())
            .reduce(|a, b| a.and(b))
        {
            lf = lf.filter(present);
        }
    }
    let mut lf = lf.group_by_stable(keys).agg(plan.reductions);
    // one step per column so later columns see earlier ones
    for expr in plan.derived {
        lf = lf.with_column(expr);
    }
    if let Some(sort) = &aggregation.sort_by {
        lf = lf.sort([sort.column.as_str()], sort_options(sort.descending));
    }
    if let Some(limit) = aggregation.limit {
        lf = lf.limit(pl::IdxSize::try_from(limit).unwrap_or(pl::IdxSize::MAX));
    }

    let df = lf.collect()?;
    log::debug!("found {} groups", df.height());
    table_from_dataframe(&df)
}
