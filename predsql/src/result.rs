//! Common result type for the predicate compiler.
//!
//! Errors fall into two groups.  Contract violations mean the caller
//! handed us a tree that can never become valid SQL (wrong child count,
//! wrong operand kinds, an empty predicate).  Validation errors are
//! well-formed requests we refuse to compile and should be reported back
//! as query validation failures.
//!
//! ```
//! use predsql::result::*;
//!
//! fn foo() -> PqResult<()> {
//!     Err("bad input")?;
//!     Ok(())
//! }
//!
//! let err = foo().err().unwrap();
//! assert!(err.is_contract_violation());
//! assert_eq!(err.to_string(), "malformed input: bad input");
//! ```
use crate::schema::DataType;

pub type PqResult<T> = std::result::Result<T, PqError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PqError {
    /// A predicate with no children reached the compiler.
    #[error("no SQL can be compiled from an empty predicate")]
    EmptyPredicate,

    /// Predicate node has the wrong shape for its operator.
    #[error("malformed predicate: {0}")]
    MalformedPredicate(String),

    /// Input that could not be turned into a query tree at all.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("operator `{0}` is not supported")]
    UnsupportedOperator(String),

    #[error("unsupported data type = {0}")]
    UnsupportedDataType(DataType),

    #[error("{0}")]
    InvalidContext(String),

    #[error("invalid sort: specify either key path or func")]
    InvalidSort,

    #[error("function `{0}` cannot be used for sorting")]
    UnsupportedSortFunc(String),

    #[error("unknown sort order = {0}")]
    UnknownSortOrder(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PqError {
    /// True if the error indicates a bug in whoever built the query
    /// tree, as opposed to a request we chose not to serve.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::EmptyPredicate | Self::MalformedPredicate(_) | Self::MalformedInput(_)
        )
    }
}

impl From<String> for PqError {
    fn from(msg: String) -> Self {
        PqError::MalformedInput(msg)
    }
}

impl From<&str> for PqError {
    fn from(msg: &str) -> Self {
        PqError::MalformedInput(msg.to_string())
    }
}
