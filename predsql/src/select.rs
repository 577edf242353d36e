//! Assemble a complete SELECT statement for a record query.
use crate::compiler::{expr, Fragment, PredicateCompiler};
use crate::conf::{Config, PlaceholderFormat};
use crate::db;
use crate::query::{AclLevel, Expression, Func, Predicate, Sort, UserInfo};
use crate::result::PqResult;
use crate::schema::{DataType, FieldType, RecordSchema};
use crate::value::Value;
use log::debug;

/// Output column holding the number of records matching the query,
/// regardless of paging.
pub const RECORD_COUNT_COLUMN: &str = "_record_count";

/// Prefix of output columns carrying function sort values.  SELECT
/// DISTINCT may only ORDER BY what it selects.
pub const SORT_COLUMN_PREFIX: &str = "_sort_";

#[derive(Debug, Clone, PartialEq)]
pub struct Pager {
    limit: usize,
    offset: usize,
}

impl Pager {
    pub fn new(limit: usize, offset: usize) -> Self {
        Pager { limit, offset }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// A query against one record type.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    record_type: String,
    predicate: Option<Predicate>,
    sorts: Vec<Sort>,
    pager: Option<Pager>,
    access: Option<(UserInfo, AclLevel)>,
    overall_count: bool,
}

/// Final SQL plus its bind arguments and the schema of the rows it
/// returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
    pub schema: RecordSchema,
}

impl SelectQuery {
    pub fn new(record_type: &str) -> Self {
        SelectQuery {
            record_type: record_type.to_string(),
            predicate: None,
            sorts: Vec::new(),
            pager: None,
            access: None,
            overall_count: false,
        }
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn set_predicate(&mut self, p: Predicate) {
        self.predicate = Some(p);
    }

    pub fn set_sorts(&mut self, sorts: Vec<Sort>) {
        self.sorts = sorts;
    }

    pub fn set_pager(&mut self, pager: Pager) {
        self.pager = Some(pager);
    }

    /// Restrict results to rows visible to `user`.
    pub fn set_access(&mut self, user: UserInfo, level: AclLevel) {
        self.access = Some((user, level));
    }

    /// Also select the total count of matching records.
    pub fn set_overall_count(&mut self, on: bool) {
        self.overall_count = on;
    }

    pub fn compile(&self, config: &Config, schema: RecordSchema) -> PqResult<Statement> {
        let mut compiler = PredicateCompiler::new(config, &self.record_type);

        let filter = match &self.access {
            Some((user, level)) => {
                compiler.compile_with_access(self.predicate.as_ref(), user, *level)?
            }
            None => match &self.predicate {
                Some(p) => compiler.compile(p)?,
                None => Fragment::default(),
            },
        };

        let mut extra: Vec<(String, FieldType)> = compiler
            .extra_columns()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if self.overall_count {
            extra.push((
                RECORD_COUNT_COLUMN.to_string(),
                FieldType::computed(
                    DataType::Integer,
                    Expression::Function(Func::Count {
                        overall_records: true,
                    }),
                ),
            ));
        }

        // Select list arguments precede WHERE arguments in the text.
        let mut args = Vec::new();
        let mut columns = vec![format!("{}.*", db::quote_ident(&self.record_type))];

        for (name, field) in extra.iter() {
            if let Some(expression) = field.expression() {
                let frag = expr::compile_expression(&self.record_type, expression)?;
                columns.push(format!("{} AS {}", frag.sql, db::quote_ident(name)));
                args.extend(frag.args);
            }
        }

        // Joins are all requested by now; sorts never add any.
        let distinct = !compiler.joined_tables().is_empty();
        let mut order_by = Vec::new();

        for (idx, sort) in self.sorts.iter().enumerate() {
            match (&sort.key_path, &sort.func) {
                (None, Some(func)) if distinct => {
                    let term = compiler.sort_expression(sort)?;
                    let name = format!("{SORT_COLUMN_PREFIX}{idx}");
                    columns.push(format!("{term} AS {}", db::quote_ident(&name)));
                    order_by.push(format!("{} {}", db::quote_ident(&name), sort.order));
                    extra.push((
                        name,
                        FieldType::computed(DataType::Number, Expression::Function(func.clone())),
                    ));
                }
                _ => order_by.push(compiler.compile_sort(sort)?),
            }
        }

        let compiled = compiler.finish(schema);

        let mut sql = String::from("SELECT ");
        if compiled.distinct {
            sql += "DISTINCT ";
        }

        sql += &format!(
            "{} FROM {} AS {}",
            columns.join(", "),
            db::table_name(config.schema(), &self.record_type),
            db::quote_ident(&self.record_type)
        );

        for join in compiled.joins.iter() {
            sql += " ";
            sql += join;
        }

        if !filter.is_empty() {
            sql += &format!(" WHERE {}", filter.sql);
            args.extend(filter.args);
        }

        if !order_by.is_empty() {
            sql += &format!(" ORDER BY {}", order_by.join(", "));
        }

        if let Some(pager) = &self.pager {
            sql += &format!(" LIMIT {} OFFSET {}", pager.limit(), pager.offset());
        }

        if config.placeholder() == PlaceholderFormat::Dollar {
            sql = dollar_placeholders(&sql);
        }

        debug!("assembled statement: {sql} {args:?}");

        let mut schema = compiled.schema;
        for (name, field) in extra {
            schema.insert(name, field);
        }

        Ok(Statement { sql, args, schema })
    }
}

/// Replace `?` placeholders with `$1`, `$2`, ...
///
/// ```
/// use predsql::select::dollar_placeholders;
/// assert_eq!(dollar_placeholders("a = ? AND b IN (?,?) AND c = '?'"),
///     "a = $1 AND b IN ($2,$3) AND c = '?'");
/// ```
pub fn dollar_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut last = 0;

    for (num, pos) in db::placeholder_positions(sql).into_iter().enumerate() {
        out += &sql[last..pos];
        out += &format!("${}", num + 1);
        last = pos + 1;
    }

    out += &sql[last..];
    out
}
