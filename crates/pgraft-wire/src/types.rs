use postgres_types::{Kind, Type};

/// Maps a catalog type name to the wire type callers expect to see in a
/// `RowDescription`. Only the two recognized column types get a real OID;
/// anything else — including every type a `CREATE TABLE` accepted but
/// `projected_fields` never needs to interpret — falls back to OID 0, the
/// same fallback the Go prototype's `dataTypeOIDMap` used for an unmapped
/// key.
pub fn pg_type_for(catalog_type_name: &str) -> Type {
    match catalog_type_name {
        "text" => Type::TEXT,
        "pg_catalog.int4" => Type::INT4,
        _ => Type::new("unknown".to_owned(), 0, Kind::Pseudo, "pg_catalog".to_owned()),
    }
}
