//! Secondary tables joined to the primary table.
use super::PredicateCompiler;
use crate::conf::USER_TABLE;
use crate::db;
use log::trace;

/// How a secondary table is joined to the primary table.
///
/// Two specs are the same join iff all three parts match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    secondary_table: String,
    primary_column: String,
    secondary_column: String,
}

impl JoinSpec {
    pub fn new(secondary_table: &str, primary_column: &str, secondary_column: &str) -> Self {
        JoinSpec {
            secondary_table: secondary_table.to_string(),
            primary_column: primary_column.to_string(),
            secondary_column: secondary_column.to_string(),
        }
    }

    pub fn secondary_table(&self) -> &str {
        &self.secondary_table
    }

    pub fn primary_column(&self) -> &str {
        &self.primary_column
    }

    pub fn secondary_column(&self) -> &str {
        &self.secondary_column
    }
}

/// Alias of the join at `index` in the join list.
///
/// The user table always gets the same alias so user data can be
/// selected without knowing which join brought it in.
pub fn alias_name(secondary_table: &str, index: usize) -> String {
    if secondary_table == USER_TABLE {
        USER_TABLE.to_string()
    } else {
        format!("_t{index}")
    }
}

impl PredicateCompiler<'_> {
    /// Register a LEFT JOIN and return the alias of the joined table.
    ///
    /// Requesting an equal join again returns the alias it got the
    /// first time.
    pub fn request_join(&mut self, spec: JoinSpec) -> String {
        if let Some(index) = self.joined_tables.iter().position(|j| *j == spec) {
            return alias_name(&spec.secondary_table, index);
        }

        let index = self.joined_tables.len();
        let alias = alias_name(&spec.secondary_table, index);

        trace!(
            "joining {} AS {alias} on {}.{} = {alias}.{}",
            spec.secondary_table,
            self.primary_table,
            spec.primary_column,
            spec.secondary_column
        );

        self.joined_tables.push(spec);

        alias
    }

    /// LEFT JOIN clauses in request order, plus whether the query must
    /// SELECT DISTINCT.
    pub fn render_joins(&self) -> (Vec<String>, bool) {
        let joins: Vec<String> = self
            .joined_tables
            .iter()
            .enumerate()
            .map(|(index, join)| {
                let alias = alias_name(&join.secondary_table, index);
                format!(
                    "LEFT JOIN {} AS {} ON {} = {}",
                    db::table_name(self.config.schema(), &join.secondary_table),
                    db::quote_ident(&alias),
                    db::full_quote_ident(&self.primary_table, &join.primary_column),
                    db::full_quote_ident(&alias, &join.secondary_column),
                )
            })
            .collect();

        let distinct = !joins.is_empty();

        (joins, distinct)
    }
}
