//! Expressions and literals to SQL operands.
use super::Fragment;
use crate::conf::USER_TABLE;
use crate::db::full_quote_ident;
use crate::query::{Expression, Func};
use crate::result::{PqError, PqResult};
use crate::value::Value;

/// Compile an expression whose key paths are columns of `alias`.
pub fn compile_expression(alias: &str, expr: &Expression) -> PqResult<Fragment> {
    match expr {
        Expression::KeyPath(name) => Ok(Fragment::text(full_quote_ident(alias, name))),
        Expression::Function(func) => func_to_sql(alias, func),
        Expression::Literal(value) => Ok(literal_to_sql(value)),
    }
}

pub fn func_to_sql(alias: &str, func: &Func) -> PqResult<Fragment> {
    match func {
        Func::Distance { field, location } => Ok(Fragment::new(
            format!(
                "ST_Distance_Sphere({}, ST_MakePoint(?, ?))",
                full_quote_ident(alias, field)
            ),
            vec![Value::Number(location.lng()), Value::Number(location.lat())],
        )),
        Func::Count { overall_records } => Ok(Fragment::text(if *overall_records {
            "COUNT(*) OVER()"
        } else {
            "COUNT(*)"
        })),
        Func::UserData { data_name } => Ok(Fragment::text(full_quote_ident(USER_TABLE, data_name))),
        Func::UserRelation { .. } | Func::UserDiscover { .. } => {
            Err(PqError::MalformedPredicate(format!(
                "function `{}` is only valid as a functional predicate",
                func.name()
            )))
        }
    }
}

/// Scalars become a single placeholder.  Arrays become a parenthesized
/// placeholder list, or `(NULL)` when empty since `IN ()` is not valid
/// SQL and nothing is ever IN (NULL).
pub fn literal_to_sql(value: &Value) -> Fragment {
    match value {
        Value::Array(list) if list.is_empty() => Fragment::text("(NULL)"),
        Value::Array(list) => {
            let marks = vec!["?"; list.len()].join(",");
            let args = list.iter().map(|v| v.to_bind_value()).collect();
            Fragment::new(format!("({marks})"), args)
        }
        _ => Fragment::new("?", vec![value.to_bind_value()]),
    }
}

/// Set membership.  The operand types decide what is tested:
///
/// * literal IN keypath: the literal is an element of a JSON array column
/// * keypath IN literal: the column value is one of the listed values,
///   a lone scalar being a list of one
pub fn compile_contains(alias: &str, left: &Expression, right: &Expression) -> PqResult<Fragment> {
    match (left, right) {
        (Expression::Literal(_), Expression::KeyPath(_)) => {
            let column = compile_expression(alias, right)?;
            let needle = compile_expression(alias, left)?;
            Ok(Fragment::new(
                format!("jsonb_exists({}, {})", column.sql, needle.sql),
                needle.args,
            ))
        }
        (Expression::KeyPath(_), Expression::Literal(value)) => {
            let column = compile_expression(alias, left)?;
            let list = if value.is_array() {
                literal_to_sql(value)
            } else {
                literal_to_sql(&Value::Array(vec![value.clone()]))
            };
            Ok(Fragment::new(format!("{} IN {}", column.sql, list.sql), list.args))
        }
        _ => Err(PqError::MalformedPredicate(format!(
            "in requires a key path and a literal, got {left:?} and {right:?}"
        ))),
    }
}
