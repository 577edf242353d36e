//! Build query trees from their JSON wire format.
//!
//! ```
//! use predsql::parse::parse_predicate;
//! use predsql::query::{Operator, UserInfo};
//!
//! let query = json::parse(r#"
//!     ["and",
//!         ["eq", {"$type": "keypath", "$val": "title"}, "hello"],
//!         ["gt", {"$type": "keypath", "$val": "score"}, 10]]
//! "#).unwrap();
//!
//! let pred = parse_predicate(&query, &UserInfo::default()).unwrap();
//! assert_eq!(pred.operator, Operator::And);
//! assert_eq!(pred.children.len(), 2);
//! ```
use crate::query::{Expression, Func, Operand, Operator, Predicate, RelationDirection};
use crate::query::{Sort, SortOrder, UserInfo};
use crate::result::{PqError, PqResult};
use crate::value::{Location, Reference, Value};
use chrono::{DateTime, Utc};
use json::JsonValue;
use std::collections::BTreeMap;

/// Parse a predicate.  Relation predicates target `user`.
pub fn parse_predicate(query: &JsonValue, user: &UserInfo) -> PqResult<Predicate> {
    let (name, rest) = split_list(query)?;
    let operator: Operator = name.parse()?;

    match operator {
        Operator::And | Operator::Or => {
            let mut children = Vec::new();
            for child in rest {
                children.push(Operand::Predicate(parse_predicate(child, user)?));
            }
            Ok(Predicate::new(operator, children))
        }
        Operator::Not => match rest {
            [child] => Ok(Predicate::not(parse_predicate(child, user)?)),
            _ => Err(format!("not takes one predicate, got {}", rest.len()).into()),
        },
        Operator::Functional => parse_functional(rest, user),
        _ => match rest {
            [left, right] => Ok(Predicate::compare(
                operator,
                parse_expression(left)?,
                parse_expression(right)?,
            )),
            _ => Err(format!("{name} takes two expressions, got {}", rest.len()).into()),
        },
    }
}

fn parse_functional(args: &[JsonValue], user: &UserInfo) -> PqResult<Predicate> {
    let (name, rest) = match args.split_first() {
        Some((n, r)) => (n.as_str().ok_or("function name must be a string")?, r),
        None => return Err("func requires a function name".into()),
    };

    let func = match (name, rest) {
        ("userRelation", [key_path, relation]) => {
            let key_path = match parse_expression(key_path)? {
                Expression::KeyPath(k) => k,
                other => return Err(format!("userRelation requires a key path, got {other:?}").into()),
            };

            if relation["$type"].as_str() != Some("relation") {
                return Err(format!("userRelation requires a relation, got {}", relation.dump()).into());
            }

            let relation_name = relation["$name"]
                .as_str()
                .ok_or("relation requires a $name")?
                .to_string();

            let direction: RelationDirection =
                relation["$direction"].as_str().unwrap_or("").parse()?;

            Func::UserRelation {
                relation_name,
                direction,
                key_path,
                user: user.id().to_string(),
            }
        }
        ("userDiscover", [params]) => {
            if !params.is_object() {
                return Err("userDiscover requires an object of arguments".into());
            }

            let mut args = BTreeMap::new();
            for (key, val) in params.entries() {
                let values = if val.is_array() {
                    val.members().map(parse_value).collect::<PqResult<Vec<_>>>()?
                } else {
                    vec![parse_value(val)?]
                };
                args.insert(key.to_string(), values);
            }

            Func::UserDiscover { args }
        }
        _ => {
            return Err(format!(
                "{name} with {} argument(s) is not a predicate function",
                rest.len()
            )
            .into())
        }
    };

    Ok(Predicate::functional(func))
}

/// Parse an expression.  Anything not recognized as a key path or
/// function is a literal.
pub fn parse_expression(expr: &JsonValue) -> PqResult<Expression> {
    if expr["$type"].as_str() == Some("keypath") {
        let key_path = expr["$val"].as_str().ok_or("keypath requires a $val")?;
        return Ok(Expression::key_path(key_path));
    }

    if is_func_call(expr) {
        return parse_func(expr).map(Expression::Function);
    }

    parse_value(expr).map(Expression::Literal)
}

fn is_func_call(expr: &JsonValue) -> bool {
    expr.is_array() && expr[0].as_str() == Some("func")
}

fn parse_func(expr: &JsonValue) -> PqResult<Func> {
    let (_, rest) = split_list(expr)?;

    let name = rest
        .first()
        .and_then(|n| n.as_str())
        .ok_or("func requires a function name")?;

    match (name, &rest[1..]) {
        ("distance", [key_path, geo]) => {
            let field = match parse_expression(key_path)? {
                Expression::KeyPath(k) => k,
                other => return Err(format!("distance requires a key path, got {other:?}").into()),
            };

            match parse_value(geo)? {
                Value::Location(location) => Ok(Func::Distance { field, location }),
                other => Err(format!("distance requires a location, got {other}").into()),
            }
        }
        ("count", []) => Ok(Func::Count {
            overall_records: false,
        }),
        ("count", [overall]) => Ok(Func::Count {
            overall_records: overall.as_bool().ok_or("count takes a boolean")?,
        }),
        _ => Err(format!("unsupported function expression {}", expr.dump()).into()),
    }
}

/// Parse a literal value.
pub fn parse_value(value: &JsonValue) -> PqResult<Value> {
    if let Some(t) = value["$type"].as_str() {
        return parse_typed_value(t, value);
    }

    let v = match value {
        JsonValue::Null => Value::Null,
        JsonValue::Boolean(b) => Value::Bool(*b),
        JsonValue::Short(_) | JsonValue::String(_) => {
            Value::String(value.as_str().unwrap_or_default().to_string())
        }
        JsonValue::Number(_) => match value.as_i64() {
            Some(i) if !value.to_string().contains(['.', 'e', 'E']) => Value::Integer(i),
            _ => Value::Number(value.as_f64().unwrap_or_default()),
        },
        JsonValue::Array(list) => {
            Value::Array(list.iter().map(parse_value).collect::<PqResult<Vec<_>>>()?)
        }
        JsonValue::Object(_) => Value::Json(value.clone()),
    };

    Ok(v)
}

fn parse_typed_value(type_name: &str, value: &JsonValue) -> PqResult<Value> {
    match type_name {
        "date" => {
            let text = value["$date"].as_str().ok_or("date requires a $date")?;
            let date = DateTime::parse_from_rfc3339(text)
                .map_err(|e| format!("invalid date {text}: {e}"))?;
            Ok(Value::DateTime(date.with_timezone(&Utc)))
        }
        "ref" => {
            let id = value["$id"].as_str().ok_or("ref requires an $id")?;
            let reference =
                Reference::parse(id).ok_or_else(|| format!("ref id must be type/key: {id}"))?;
            Ok(Value::Reference(reference))
        }
        "geo" => {
            let lng = value["$lng"].as_f64().ok_or("geo requires a numeric $lng")?;
            let lat = value["$lat"].as_f64().ok_or("geo requires a numeric $lat")?;
            Ok(Value::Location(Location::new(lng, lat)))
        }
        _ => Err(PqError::MalformedInput(format!(
            "unexpected value type {type_name}"
        ))),
    }
}

/// Parse a list of `[expression, order]` pairs.  Order defaults to
/// ascending.
pub fn parse_sorts(sorts: &JsonValue) -> PqResult<Vec<Sort>> {
    if !sorts.is_array() {
        return Err(format!("sorts must be a list, got {}", sorts.dump()).into());
    }

    let mut list = Vec::new();

    for sort in sorts.members() {
        if !sort.is_array() || sort.is_empty() {
            return Err(format!("invalid sort entry {}", sort.dump()).into());
        }

        let order = match sort[1].as_str() {
            Some(o) => o.parse::<SortOrder>()?,
            None if sort[1].is_null() => SortOrder::Asc,
            None => return Err(format!("invalid sort order {}", sort[1].dump()).into()),
        };

        let s = match parse_expression(&sort[0])? {
            Expression::KeyPath(k) => Sort::by_key_path(&k, order),
            Expression::Function(f) => Sort::by_func(f, order),
            Expression::Literal(v) => return Err(format!("cannot sort by literal {v}").into()),
        };

        list.push(s);
    }

    Ok(list)
}

/// Split `["name", ...]` into its name and remaining members.
fn split_list(value: &JsonValue) -> PqResult<(&str, &[JsonValue])> {
    let list = match value {
        JsonValue::Array(list) => list.as_slice(),
        _ => return Err(format!("expected a list, got {}", value.dump()).into()),
    };

    match list.split_first() {
        Some((name, rest)) => match name.as_str() {
            Some(n) => Ok((n, rest)),
            None => Err(format!("list must start with a name, got {}", name.dump()).into()),
        },
        None => Err("expected a non-empty list".into()),
    }
}
