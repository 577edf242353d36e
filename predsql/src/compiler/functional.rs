//! Functional predicates: relationship and user discovery lookups.
use super::expr::compile_contains;
use super::{Fragment, JoinSpec, PredicateCompiler};
use crate::conf::USER_TABLE;
use crate::db::full_quote_ident;
use crate::query::{Expression, Func, Operand, Predicate, RelationDirection};
use crate::result::{PqError, PqResult};
use crate::schema::{DataType, FieldType};
use crate::value::Value;
use log::debug;
use std::collections::BTreeMap;

/// Column of the primary table holding the record owner.
const OWNER_COLUMN: &str = "_owner_id";

pub const TRANSIENT_EMAIL: &str = "_transient__email";
pub const TRANSIENT_USERNAME: &str = "_transient__username";

impl PredicateCompiler<'_> {
    pub(super) fn compile_functional(&mut self, predicate: &Predicate) -> PqResult<Fragment> {
        let func = match predicate.children.as_slice() {
            [Operand::Expression(Expression::Function(func))] => func,
            _ => {
                return Err(PqError::MalformedPredicate(
                    "functional predicate requires a single function expression".into(),
                ))
            }
        };

        match func {
            Func::UserRelation {
                relation_name,
                direction,
                key_path,
                user,
            } => Ok(self.compile_user_relation(relation_name, *direction, key_path, user)),
            Func::UserDiscover { args } => self.compile_user_discover(args),
            Func::Distance { .. } | Func::Count { .. } | Func::UserData { .. } => {
                Err(PqError::MalformedPredicate(format!(
                    "function `{}` cannot be used as a functional predicate",
                    func.name()
                )))
            }
        }
    }

    /// Records whose owner (or `key_path` column) relates to `user`.
    ///
    /// Relation tables hold (left_id, right_id) pairs meaning left
    /// relates to right.
    fn compile_user_relation(
        &mut self,
        relation: &str,
        direction: RelationDirection,
        key_path: &str,
        user: &str,
    ) -> Fragment {
        let primary_column = match key_path {
            "" | "_owner" => OWNER_COLUMN,
            col => col,
        };

        let sql = match direction {
            RelationDirection::Outward => {
                let out = self.request_join(JoinSpec::new(relation, primary_column, "right_id"));
                format!("{} = ?", full_quote_ident(&out, "left_id"))
            }
            RelationDirection::Inward => {
                let inw = self.request_join(JoinSpec::new(relation, primary_column, "left_id"));
                format!("{} = ?", full_quote_ident(&inw, "right_id"))
            }
            RelationDirection::Mutual => {
                let out = self.request_join(JoinSpec::new(relation, primary_column, "right_id"));
                let inw = self.request_join(JoinSpec::new(relation, primary_column, "left_id"));
                format!(
                    "{} = {} AND {} = ?",
                    full_quote_ident(&out, "left_id"),
                    full_quote_ident(&inw, "right_id"),
                    full_quote_ident(&out, "left_id"),
                )
            }
        };

        Fragment::new(sql, vec![Value::from(user)])
    }

    /// Find users by contact data.  Only valid when querying users.
    ///
    /// Matched users also get their email and username selected as
    /// transient columns.
    fn compile_user_discover(&mut self, args: &BTreeMap<String, Vec<Value>>) -> PqResult<Fragment> {
        if self.primary_table != self.config.user_record_type() {
            return Err(PqError::InvalidContext(format!(
                "user discover predicate can only be used on {} records, not {}",
                self.config.user_record_type(),
                self.primary_table
            )));
        }

        for name in args.keys().filter(|k| k.as_str() != "email") {
            debug!("ignoring unsupported user discover argument: {name}");
        }

        let emails = args.get("email").cloned().unwrap_or_default();

        let alias = self.request_join(JoinSpec::new(USER_TABLE, "_id", "id"));

        let frag = compile_contains(
            &alias,
            &Expression::key_path("email"),
            &Expression::Literal(Value::Array(emails)),
        )?;

        self.add_extra_column(
            TRANSIENT_EMAIL,
            FieldType::computed(
                DataType::String,
                Expression::Function(Func::UserData {
                    data_name: "email".into(),
                }),
            ),
        );

        self.add_extra_column(
            TRANSIENT_USERNAME,
            FieldType::computed(
                DataType::String,
                Expression::Function(Func::UserData {
                    data_name: "username".into(),
                }),
            ),
        );

        Ok(frag)
    }
}
