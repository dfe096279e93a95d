use crate::ExecError;
use pgraft_catalog::TableDef;
use sqlparser::ast::{ColumnDef, CreateTable, DataType};

/// Collapses a parsed column type into the single dotted string the catalog
/// stores, e.g. `pg_catalog.int4` for `INT`, bare `text` for `TEXT`. Mirrors
/// the Go prototype's namespace-path join (`pg_query_go`'s `TypeName.Names`
/// collapsed with `.`); `sqlparser`'s `DataType` carries no such namespaced
/// path, so known shapes get the Postgres catalog name they correspond to
/// and anything else gets its own lowercase name (CREATE TABLE never
/// validates the type, only SELECT's OID lookup treats unknown types
/// specially).
fn catalog_type_name(dt: &DataType) -> String {
    match dt {
        DataType::Int(_) | DataType::Integer(_) | DataType::Int4(_) => "pg_catalog.int4".to_owned(),
        DataType::Text | DataType::Varchar(_) | DataType::Char(_) | DataType::String(_) => "text".to_owned(),
        other => other.to_string().to_lowercase(),
    }
}

fn column_def(cd: &ColumnDef) -> (String, String) {
    (cd.name.value.clone(), catalog_type_name(&cd.data_type))
}

pub fn table_def_from_create(stmt: &CreateTable) -> Result<TableDef, ExecError> {
    let name = stmt.name.to_string();
    let mut column_names = Vec::with_capacity(stmt.columns.len());
    let mut column_types = Vec::with_capacity(stmt.columns.len());
    for cd in &stmt.columns {
        let (cname, ctype) = column_def(cd);
        column_names.push(cname);
        column_types.push(ctype);
    }
    Ok(TableDef {
        name,
        column_names,
        column_types,
    })
}
