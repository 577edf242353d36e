//! Backend agnostic query vocabulary: predicates, expressions,
//! functions and sorts.
use crate::result::{PqError, PqResult};
use crate::value::{Location, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Like,
    ILike,
    In,
    Functional,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Equal => "eq",
            Self::NotEqual => "neq",
            Self::GreaterThan => "gt",
            Self::LessThan => "lt",
            Self::GreaterThanOrEqual => "gte",
            Self::LessThanOrEqual => "lte",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::In => "in",
            Self::Functional => "func",
        }
    }
}

impl FromStr for Operator {
    type Err = PqError;

    fn from_str(s: &str) -> PqResult<Self> {
        let op = match s {
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "eq" => Self::Equal,
            "neq" => Self::NotEqual,
            "gt" => Self::GreaterThan,
            "lt" => Self::LessThan,
            "gte" => Self::GreaterThanOrEqual,
            "lte" => Self::LessThanOrEqual,
            "like" => Self::Like,
            "ilike" => Self::ILike,
            "in" => Self::In,
            "func" => Self::Functional,
            _ => return Err(PqError::UnsupportedOperator(s.to_string())),
        };
        Ok(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationDirection {
    Outward,
    Inward,
    Mutual,
}

impl FromStr for RelationDirection {
    type Err = PqError;

    /// An empty direction means outward.
    fn from_str(s: &str) -> PqResult<Self> {
        match s {
            "" | "outward" => Ok(Self::Outward),
            "inward" => Ok(Self::Inward),
            "mutual" => Ok(Self::Mutual),
            _ => Err(PqError::MalformedPredicate(format!(
                "unrecognized relation direction `{s}`"
            ))),
        }
    }
}

/// Functions usable in expressions, sorts and functional predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Func {
    /// Distance in meters between a location column and a point.
    Distance { field: String, location: Location },
    /// Row count; the window form counts every matching record.
    Count { overall_records: bool },
    /// A column of the joined user table.
    UserData { data_name: String },
    /// Records whose owner stands in a relation with `user`.
    UserRelation {
        relation_name: String,
        direction: RelationDirection,
        key_path: String,
        user: String,
    },
    /// User lookup by contact data.  Only "email" is recognized.
    UserDiscover { args: BTreeMap<String, Vec<Value>> },
}

impl Func {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Distance { .. } => "distance",
            Self::Count { .. } => "count",
            Self::UserData { .. } => "userData",
            Self::UserRelation { .. } => "userRelation",
            Self::UserDiscover { .. } => "userDiscover",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    KeyPath(String),
    Literal(Value),
    Function(Func),
}

impl Expression {
    pub fn key_path(name: &str) -> Self {
        Expression::KeyPath(name.to_string())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Predicate(Predicate),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub operator: Operator,
    pub children: Vec<Operand>,
}

impl Predicate {
    pub fn new(operator: Operator, children: Vec<Operand>) -> Self {
        Predicate { operator, children }
    }

    pub fn and(children: Vec<Predicate>) -> Self {
        Self::compound(Operator::And, children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Self::compound(Operator::Or, children)
    }

    pub fn not(child: Predicate) -> Self {
        Self::compound(Operator::Not, vec![child])
    }

    fn compound(operator: Operator, children: Vec<Predicate>) -> Self {
        Predicate {
            operator,
            children: children.into_iter().map(Operand::Predicate).collect(),
        }
    }

    /// Comparison (including In) between two expressions.
    pub fn compare(operator: Operator, left: Expression, right: Expression) -> Self {
        Predicate {
            operator,
            children: vec![Operand::Expression(left), Operand::Expression(right)],
        }
    }

    pub fn functional(func: Func) -> Self {
        Predicate {
            operator: Operator::Functional,
            children: vec![Operand::Expression(Expression::Function(func))],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = PqError;

    fn from_str(s: &str) -> PqResult<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(PqError::UnknownSortOrder(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// Sort by a column or by a function.  The key path wins when both
/// are set.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub key_path: Option<String>,
    pub func: Option<Func>,
    pub order: SortOrder,
}

impl Sort {
    pub fn by_key_path(key_path: &str, order: SortOrder) -> Self {
        Sort {
            key_path: Some(key_path.to_string()),
            func: None,
            order,
        }
    }

    pub fn by_func(func: Func, order: SortOrder) -> Self {
        Sort {
            key_path: None,
            func: Some(func),
            order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclLevel {
    Read,
    Write,
}

/// The acting user.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserInfo {
    id: String,
    roles: Vec<String>,
}

impl UserInfo {
    pub fn new(id: &str, roles: &[&str]) -> Self {
        UserInfo {
            id: id.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }
}
