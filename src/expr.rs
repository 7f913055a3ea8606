use polars::prelude as pl;
use serde::{Deserialize, Serialize};
use std::ops;

/// Row-wise arithmetic over named columns.
///
/// A missing operand makes the result missing, as does division by zero or
/// any non-finite result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Column(String),
    Literal(f64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    FloorDiv(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn lit(n: f64) -> Self {
        Expr::Literal(n)
    }

    pub fn floor_div(self, rhs: Expr) -> Self {
        Expr::FloorDiv(Box::new(self), Box::new(rhs))
    }

    /// Column names referenced by this expression, in left-to-right order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Literal(_) => {}
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::FloorDiv(l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
        }
    }

    pub(crate) fn to_polars(&self) -> pl::Expr {
        match self {
            Expr::Column(name) => pl::col(name).cast(pl::DataType::Float64),
            Expr::Literal(n) => pl::lit(*n),
            Expr::Add(l, r) => finite(l.to_polars() + r.to_polars()),
            Expr::Sub(l, r) => finite(l.to_polars() - r.to_polars()),
            Expr::Mul(l, r) => finite(l.to_polars() * r.to_polars()),
            Expr::Div(l, r) => divide(l, r, false),
            Expr::FloorDiv(l, r) => divide(l, r, true),
        }
    }
}

fn divide(l: &Expr, r: &Expr, floor: bool) -> pl::Expr {
    let divisor = r.to_polars();
    let quotient = l.to_polars() / divisor.clone();
    let quotient = if floor { quotient.floor() } else { quotient };
    pl::when(divisor.eq(pl::lit(0.0)))
        .then(pl::lit(pl::NULL))
        .otherwise(finite(quotient))
}

/// Nulls out NaN and infinities.
pub(crate) fn finite(expr: pl::Expr) -> pl::Expr {
    pl::when(expr.clone().is_finite())
        .then(expr)
        .otherwise(pl::lit(pl::NULL))
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use crate::value::Value;

    fn eval(expr: Expr, a: Value, b: Value) -> Value {
        let table = Table::from_rows(["a", "b"], vec![vec![a, b]]).unwrap();
        table.with_column("out", &expr).unwrap().value(0, "out").unwrap().clone()
    }

    #[test]
    fn arithmetic() {
        let (a, b) = (Value::from(7.0), Value::from(2.0));
        assert_eq!(eval(Expr::col("a") / Expr::col("b"), a.clone(), b.clone()), Value::from(3.5));
        assert_eq!(
            eval(Expr::col("a").floor_div(Expr::col("b")), a.clone(), b.clone()),
            Value::from(3.0)
        );
        assert_eq!(
            eval(Expr::col("a") * Expr::lit(2.0) - Expr::col("b"), a, b),
            Value::from(12.0)
        );
    }

    #[test]
    fn division_by_zero_is_missing() {
        let (a, b) = (Value::from(7.0), Value::from(0.0));
        assert_eq!(eval(Expr::col("a") / Expr::col("b"), a.clone(), b.clone()), Value::Missing);
        assert_eq!(eval(Expr::col("a").floor_div(Expr::col("b")), a, b), Value::Missing);
    }

    #[test]
    fn missing_operand_propagates() {
        assert_eq!(
            eval(Expr::col("a") + Expr::col("b"), Value::Missing, Value::from(1.0)),
            Value::Missing
        );
    }

    #[test]
    fn overflow_is_missing() {
        assert_eq!(
            eval(Expr::col("a") * Expr::col("b"), Value::from(1e308), Value::from(10.0)),
            Value::Missing
        );
    }

    #[test]
    fn referenced_columns() {
        let expr = Expr::col("a") + Expr::col("zzz") * Expr::lit(2.0);
        assert_eq!(expr.columns(), vec!["a", "zzz"]);
    }

    #[test]
    fn serde_shape() {
        let expr: Expr =
            serde_json::from_str(r#"{"div": [{"column": "avg_score"}, {"column": "num_genres"}]}"#)
                .unwrap();
        assert_eq!(expr, Expr::col("avg_score") / Expr::col("num_genres"));
    }
}
