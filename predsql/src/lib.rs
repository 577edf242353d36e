pub use compiler::Fragment;
pub use compiler::PredicateCompiler;
pub use conf::Config;
pub use query::Predicate;
pub use result::PqError;
pub use result::PqResult;
pub use select::SelectQuery;
pub use select::Statement;
pub use value::Value;

pub mod compiler;
pub mod conf;
pub mod db;
pub mod parse;
pub mod query;
pub mod result;
pub mod schema;
pub mod select;
pub mod value;

#[cfg(test)]
mod tests;
