//! ORDER BY clauses.
//!
//! ORDER BY terms are handed to the statement builder without bind
//! arguments, so function arguments are written into the SQL text
//! directly instead of going through placeholders.
use super::PredicateCompiler;
use crate::db::full_quote_ident;
use crate::query::{Func, Sort};
use crate::result::{PqError, PqResult};

impl PredicateCompiler<'_> {
    /// Compile one sort term, e.g. `"note"."title" ASC`.
    pub fn compile_sort(&self, sort: &Sort) -> PqResult<String> {
        Ok(format!("{} {}", self.sort_expression(sort)?, sort.order))
    }

    /// The value a sort orders by, without its direction.
    pub fn sort_expression(&self, sort: &Sort) -> PqResult<String> {
        match (&sort.key_path, &sort.func) {
            (Some(key_path), _) => Ok(full_quote_ident(&self.primary_table, key_path)),
            (None, Some(func)) => func_order_by_sql(&self.primary_table, func),
            (None, None) => Err(PqError::InvalidSort),
        }
    }
}

fn func_order_by_sql(alias: &str, func: &Func) -> PqResult<String> {
    match func {
        Func::Distance { field, location } => Ok(format!(
            "ST_Distance_Sphere({}, ST_MakePoint({:.6}, {:.6}))",
            full_quote_ident(alias, field),
            location.lng(),
            location.lat(),
        )),
        Func::Count { .. }
        | Func::UserData { .. }
        | Func::UserRelation { .. }
        | Func::UserDiscover { .. } => Err(PqError::UnsupportedSortFunc(func.name().to_string())),
    }
}
