//! Predicate to SQL compiler.
//!
//! A `PredicateCompiler` is created for a single query.  While
//! predicates are compiled it collects the secondary tables the query
//! must join against and any synthetic columns introduced along the
//! way.  Once compilation is done, `finish()` hands back the join
//! clauses and the updated record schema.
//!
//! ```
//! use predsql::compiler::PredicateCompiler;
//! use predsql::conf::Config;
//! use predsql::query::{Expression, Operator, Predicate};
//!
//! let conf = Config::new();
//! let mut compiler = PredicateCompiler::new(&conf, "note");
//!
//! let pred = Predicate::compare(
//!     Operator::Equal,
//!     Expression::key_path("title"),
//!     Expression::literal("hello"),
//! );
//!
//! let frag = compiler.compile(&pred).unwrap();
//! assert_eq!(frag.sql, r#""note"."title" = ?"#);
//! assert_eq!(frag.args.len(), 1);
//! ```
use crate::conf::Config;
use crate::db;
use crate::query::{AclLevel, Expression, Operand, Operator, Predicate, UserInfo};
use crate::result::{PqError, PqResult};
use crate::schema::{FieldType, RecordSchema};
use crate::value::Value;
use log::{debug, trace};

pub mod acl;
pub mod expr;
pub mod functional;
pub mod join;
pub mod sort;

pub use join::JoinSpec;

/// A piece of SQL plus the values bound to its `?` placeholders, in
/// placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Fragment {
            sql: sql.into(),
            args,
        }
    }

    /// SQL with nothing to bind.
    pub fn text(sql: impl Into<String>) -> Self {
        Fragment::new(sql, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    pub fn placeholder_count(&self) -> usize {
        db::placeholder_positions(&self.sql).len()
    }
}

/// What a session leaves behind once compilation is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// LEFT JOIN clauses in the order the joins were requested.
    pub joins: Vec<String>,
    /// Joins may fan out rows, so results need DISTINCT.
    pub distinct: bool,
    /// Caller schema plus synthetic columns.
    pub schema: RecordSchema,
}

#[derive(Debug)]
pub struct PredicateCompiler<'a> {
    config: &'a Config,

    /// Record type being queried.  Also used as the alias of the
    /// primary table when qualifying columns.
    primary_table: String,

    /// Distinct joins in request order.  The position of a join in
    /// this list determines its alias.
    joined_tables: Vec<JoinSpec>,

    /// Output columns added by predicates, e.g. user discovery.
    extra_columns: RecordSchema,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(config: &'a Config, primary_table: &str) -> Self {
        PredicateCompiler {
            config,
            primary_table: primary_table.to_string(),
            joined_tables: Vec::new(),
            extra_columns: RecordSchema::new(),
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn primary_table(&self) -> &str {
        &self.primary_table
    }

    pub fn joined_tables(&self) -> &[JoinSpec] {
        &self.joined_tables
    }

    pub fn extra_columns(&self) -> &RecordSchema {
        &self.extra_columns
    }

    /// Compile a predicate tree into a WHERE fragment.
    pub fn compile(&mut self, predicate: &Predicate) -> PqResult<Fragment> {
        if predicate.is_empty() {
            return Err(PqError::EmptyPredicate);
        }

        match predicate.operator {
            Operator::And | Operator::Or => self.compile_compound(predicate),
            Operator::Not => self.compile_not(predicate),
            Operator::Functional => self.compile_functional(predicate),
            Operator::In => {
                let (left, right) = expression_pair(predicate)?;
                expr::compile_contains(&self.primary_table, left, right)
            }
            Operator::Equal
            | Operator::NotEqual
            | Operator::GreaterThan
            | Operator::LessThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThanOrEqual
            | Operator::Like
            | Operator::ILike => self.compile_comparison(predicate),
        }
    }

    /// Compile the caller's predicate and AND it with the row access
    /// restrictions for `user`.
    ///
    /// Either side may be absent.  An empty fragment means no WHERE
    /// clause is needed.
    pub fn compile_with_access(
        &mut self,
        predicate: Option<&Predicate>,
        user: &UserInfo,
        level: AclLevel,
    ) -> PqResult<Fragment> {
        let mut parts = Vec::new();

        if let Some(p) = predicate {
            parts.push(self.compile(p)?);
        }

        parts.push(acl::access_predicate(user, level));

        let frag = join_fragments(parts, " AND ");

        debug!(
            "compiled {level:?} WHERE for {}: {} {:?}",
            self.primary_table, frag.sql, frag.args
        );

        Ok(frag)
    }

    fn compile_compound(&mut self, predicate: &Predicate) -> PqResult<Fragment> {
        let sep = match predicate.operator {
            Operator::And => " AND ",
            Operator::Or => " OR ",
            op => return Err(PqError::UnsupportedOperator(op.to_string())),
        };

        let mut parts = Vec::new();
        for child in predicate_children(predicate)? {
            parts.push(self.compile(child)?);
        }

        Ok(join_fragments(parts, sep))
    }

    fn compile_not(&mut self, predicate: &Predicate) -> PqResult<Fragment> {
        let children = predicate_children(predicate)?;
        if children.len() != 1 {
            return Err(PqError::MalformedPredicate(format!(
                "not requires exactly one predicate, got {}",
                children.len()
            )));
        }

        let inner = self.compile(children[0])?;
        Ok(Fragment::new(format!("NOT ({})", inner.sql), inner.args))
    }

    fn compile_comparison(&self, predicate: &Predicate) -> PqResult<Fragment> {
        let op = match predicate.operator {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            op => return Err(PqError::UnsupportedOperator(op.to_string())),
        };

        let (left, right) = expression_pair(predicate)?;

        let mut lhs = expr::compile_expression(&self.primary_table, left)?;
        let rhs = expr::compile_expression(&self.primary_table, right)?;

        lhs.args.extend(rhs.args);

        Ok(Fragment::new(format!("{} {op} {}", lhs.sql, rhs.sql), lhs.args))
    }

    /// Add an output column that was not explicitly requested.
    pub(crate) fn add_extra_column(&mut self, name: &str, field: FieldType) {
        trace!("registering synthetic column {name} for {}", self.primary_table);
        self.extra_columns.insert(name.to_string(), field);
    }

    /// Consume the session, rendering joins and merging the synthetic
    /// columns into `schema`.
    pub fn finish(self, mut schema: RecordSchema) -> Compiled {
        let (joins, distinct) = self.render_joins();

        for (name, field) in self.extra_columns {
            schema.insert(name, field);
        }

        Compiled {
            joins,
            distinct,
            schema,
        }
    }
}

/// Join non-empty fragments with `sep`, parenthesized as a group.
fn join_fragments(parts: Vec<Fragment>, sep: &str) -> Fragment {
    let parts: Vec<Fragment> = parts.into_iter().filter(|f| !f.is_empty()).collect();

    match parts.len() {
        0 => Fragment::default(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => {
            let mut args = Vec::new();
            let mut sqls = Vec::new();
            for part in parts {
                sqls.push(part.sql);
                args.extend(part.args);
            }
            Fragment::new(format!("({})", sqls.join(sep)), args)
        }
    }
}

fn predicate_children(predicate: &Predicate) -> PqResult<Vec<&Predicate>> {
    predicate
        .children
        .iter()
        .map(|c| match c {
            Operand::Predicate(p) => Ok(p),
            Operand::Expression(e) => Err(PqError::MalformedPredicate(format!(
                "{} expects predicates, got expression {e:?}",
                predicate.operator
            ))),
        })
        .collect()
}

fn expression_pair(predicate: &Predicate) -> PqResult<(&Expression, &Expression)> {
    match predicate.children.as_slice() {
        [Operand::Expression(left), Operand::Expression(right)] => Ok((left, right)),
        _ => Err(PqError::MalformedPredicate(format!(
            "{} expects exactly two expressions",
            predicate.operator
        ))),
    }
}
