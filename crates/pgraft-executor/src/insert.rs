use crate::cell::Cell;
use crate::ExecError;
use sqlparser::ast::{Expr, Insert, SetExpr, Value};

fn cell_from_expr(expr: &Expr) -> Result<Cell, ExecError> {
    match expr {
        Expr::Value(Value::SingleQuotedString(s)) => Ok(Cell::Text(s.clone())),
        Expr::Value(Value::Number(n, _)) => n
            .parse::<i32>()
            .map(Cell::Int32)
            .map_err(|_| ExecError::UnsupportedValue(expr.to_string())),
        other => Err(ExecError::UnsupportedValue(other.to_string())),
    }
}

/// Extracts the target relation name and the literal rows from an
/// `INSERT INTO t VALUES (...), (...)` statement. Any non-constant or
/// non-string/int value fails the whole statement.
pub fn rows_from_insert(stmt: &Insert) -> Result<(String, Vec<Vec<Cell>>), ExecError> {
    let table_name = stmt.table_name.to_string();

    let source = stmt
        .source
        .as_ref()
        .ok_or_else(|| ExecError::UnsupportedValue("INSERT without VALUES".to_owned()))?;

    let values = match source.body.as_ref() {
        SetExpr::Values(values) => values,
        other => return Err(ExecError::UnsupportedValue(other.to_string())),
    };

    let mut rows = Vec::with_capacity(values.rows.len());
    for row in &values.rows {
        let mut cells = Vec::with_capacity(row.len());
        for expr in row {
            cells.push(cell_from_expr(expr)?);
        }
        rows.push(cells);
    }

    Ok((table_name, rows))
}
