use crate::cell::Cell;
use crate::ExecError;
use pgraft_catalog::{get_table, TableDef};
use pgraft_kv::{KvStore, DATA_BUCKET};
use sqlparser::ast::{Expr, Query, SelectItem, SetExpr, TableFactor};

/// The result of a SELECT: the projected field list and every matched row,
/// already projected and ordered per the projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecResult {
    pub field_names: Vec<String>,
    pub field_types: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

fn relation_name(query: &Query) -> Result<String, ExecError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        _ => return Err(ExecError::UnsupportedQuery("only a bare SELECT is supported".into())),
    };
    let from = select
        .from
        .first()
        .ok_or_else(|| ExecError::UnsupportedQuery("SELECT without FROM".into()))?;
    match &from.relation {
        TableFactor::Table { name, .. } => Ok(name.to_string()),
        other => Err(ExecError::UnsupportedQuery(format!("unsupported FROM clause: {other}"))),
    }
}

fn projected_fields(query: &Query, table: &TableDef) -> Result<(Vec<String>, Vec<String>), ExecError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        _ => return Err(ExecError::UnsupportedQuery("only a bare SELECT is supported".into())),
    };

    let mut field_names = Vec::with_capacity(select.projection.len());
    let mut field_types = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        match item {
            // `SELECT *` expands to every column in schema order, the one
            // projection shape beyond a bare column reference this
            // dispatch accepts (no partial wildcards, no `t.*`).
            SelectItem::Wildcard(_) => {
                field_names.extend(table.column_names.iter().cloned());
                field_types.extend(table.column_types.iter().cloned());
            }
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                let field = ident.value.clone();
                let pos = table.column_names.iter().position(|c| c == &field);
                let ty = pos
                    .map(|i| table.column_types[i].clone())
                    .ok_or_else(|| ExecError::UnknownField(field.clone()))?;
                field_names.push(field);
                field_types.push(ty);
            }
            other => return Err(ExecError::UnsupportedQuery(format!("unsupported projection: {other}"))),
        };
    }
    Ok((field_names, field_types))
}

fn decode_row(bytes: &[u8]) -> Result<Vec<Cell>, ExecError> {
    Ok(bincode::deserialize(bytes)?)
}

fn project_row(row: &[Cell], table: &TableDef, field_names: &[String]) -> Vec<Cell> {
    field_names
        .iter()
        .filter_map(|field| {
            table
                .column_names
                .iter()
                .position(|c| c == field)
                .map(|i| row[i].clone())
        })
        .collect()
}

/// Runs the supported SELECT subset: a column list against a single FROM
/// relation, no WHERE, no joins, no ordering, no aggregates.
pub fn run_select(store: &KvStore, query: &Query) -> Result<ExecResult, ExecError> {
    let table_name = relation_name(query)?;
    let table = get_table(store, &table_name)?;
    let (field_names, field_types) = projected_fields(query, &table)?;

    let prefix = format!("rows_{table_name}_");
    let raw_rows = store.read(DATA_BUCKET, |cur| {
        cur.scan_prefix(prefix.as_bytes())
            .map(|entry| entry.map(|(_key, value)| value))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut rows = Vec::with_capacity(raw_rows.len());
    for value in raw_rows {
        let row = decode_row(&value)?;
        rows.push(project_row(&row, &table, &field_names));
    }

    Ok(ExecResult {
        field_names,
        field_types,
        rows,
    })
}
