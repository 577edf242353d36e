//! PostgreSQL identifier quoting and column type mapping.
use crate::result::{PqError, PqResult};
use crate::schema::DataType;

pub const TYPE_STRING: &str = "text";
pub const TYPE_NUMBER: &str = "double precision";
pub const TYPE_INTEGER: &str = "bigint";
pub const TYPE_TIMESTAMP: &str = "timestamp without time zone";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_JSON: &str = "jsonb";
pub const TYPE_LOCATION: &str = "geometry(Point)";
pub const TYPE_SERIAL: &str = "bigserial";

/// Quote a string so it may be used as a PG identifier.
///
/// Embedded double quotes are doubled.  PG identifiers cannot contain
/// NUL bytes, so anything after the first one is dropped.
///
/// ```
/// use predsql::db::quote_ident;
/// assert_eq!(quote_ident("note"), r#""note""#);
/// assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
/// assert_eq!(quote_ident("a\0b"), r#""a""#);
/// ```
pub fn quote_ident(name: &str) -> String {
    let name = match name.find('\0') {
        Some(end) => &name[..end],
        None => name,
    };
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a column reference qualified by its table alias.
///
/// ```
/// use predsql::db::full_quote_ident;
/// assert_eq!(full_quote_ident("_t0", "left_id"), r#""_t0"."left_id""#);
/// ```
pub fn full_quote_ident(alias: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(alias), quote_ident(column))
}

/// Table name as it appears in FROM / JOIN clauses, schema qualified
/// when a schema is configured.
pub fn table_name(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(s) if !s.is_empty() => full_quote_ident(s, table),
        _ => quote_ident(table),
    }
}

/// Byte offsets of every `?` placeholder in `sql`.
///
/// Question marks inside string literals and quoted identifiers are
/// not placeholders.
///
/// ```
/// use predsql::db::placeholder_positions;
/// assert_eq!(placeholder_positions(r#""a?" = ? AND b = '?'"#), vec![7]);
/// ```
pub fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quote: Option<char> = None;

    for (idx, c) in sql.char_indices() {
        match quote {
            // A doubled quote inside a quoted run closes and
            // immediately reopens it, which nets out the same.
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '?' => positions.push(idx),
                _ => {}
            },
        }
    }

    positions
}

/// Storage column type for a record data type.
pub fn pq_data_type(data_type: DataType) -> PqResult<&'static str> {
    match data_type {
        DataType::String | DataType::Asset | DataType::Reference => Ok(TYPE_STRING),
        DataType::Number => Ok(TYPE_NUMBER),
        DataType::Integer => Ok(TYPE_INTEGER),
        DataType::DateTime => Ok(TYPE_TIMESTAMP),
        DataType::Boolean => Ok(TYPE_BOOLEAN),
        DataType::Json => Ok(TYPE_JSON),
        DataType::Location => Ok(TYPE_LOCATION),
        DataType::Sequence => Ok(TYPE_SERIAL),
        DataType::Acl | DataType::Unknown => Err(PqError::UnsupportedDataType(data_type)),
    }
}
