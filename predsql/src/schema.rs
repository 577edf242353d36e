//! Record schema: column name to field type.
use crate::query::Expression;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Number,
    Integer,
    DateTime,
    Boolean,
    Asset,
    Reference,
    Location,
    Json,
    Sequence,
    Acl,
    Unknown,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::DateTime => "datetime",
            Self::Boolean => "boolean",
            Self::Asset => "asset",
            Self::Reference => "ref",
            Self::Location => "location",
            Self::Json => "json",
            Self::Sequence => "sequence",
            Self::Acl => "acl",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for DataType {
    fn from(s: &str) -> Self {
        match s {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "datetime" => Self::DateTime,
            "boolean" => Self::Boolean,
            "asset" => Self::Asset,
            "ref" => Self::Reference,
            "location" => Self::Location,
            "json" => Self::Json,
            "sequence" => Self::Sequence,
            "acl" => Self::Acl,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type information for a single column.
///
/// Computed columns carry the expression that produces them.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    data_type: DataType,
    expression: Option<Expression>,
}

impl FieldType {
    pub fn new(data_type: DataType) -> Self {
        FieldType {
            data_type,
            expression: None,
        }
    }

    pub fn computed(data_type: DataType, expression: Expression) -> Self {
        FieldType {
            data_type,
            expression: Some(expression),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn expression(&self) -> Option<&Expression> {
        self.expression.as_ref()
    }
}

/// Ordered so that synthetic columns render in a stable order.
pub type RecordSchema = BTreeMap<String, FieldType>;
