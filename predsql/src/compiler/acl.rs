//! Row level access control.
//!
//! Each record carries an `_access` JSONB array of grants.  A record is
//! visible to a user when a grant names the user or one of the user's
//! roles, when the record has no grants at all, or when the user owns
//! the record.
//!
//! Records readable by user rickmak or the admin role:
//!
//! ```text
//! (_access @> '[{"role":"admin"}]' OR _access @> '[{"user_id":"rickmak"}]'
//!     OR _access IS NULL OR _owner_id = ?)
//! ```
use super::Fragment;
use crate::query::{AclLevel, UserInfo};
use crate::value::Value;
use log::debug;

/// Build the visibility predicate for `user`.
///
/// An anonymous user (empty id) gets an empty fragment, meaning no
/// restriction is applied; callers omit the predicate in that case.
pub fn access_predicate(user: &UserInfo, level: AclLevel) -> Fragment {
    if user.is_anonymous() {
        debug!("no access restriction applied for anonymous {level:?} query");
        return Fragment::default();
    }

    let mut sql = String::from("(");

    for role in user.roles() {
        sql += &format!("_access @> '[{{\"role\":{}}}]' OR ", json_sql_literal(role));
    }

    sql += &format!(
        "_access @> '[{{\"user_id\":{}}}]' OR _access IS NULL OR _owner_id = ?)",
        json_sql_literal(user.id())
    );

    Fragment::new(sql, vec![Value::from(user.id())])
}

/// JSON encode a string for use inside a single quoted SQL literal.
fn json_sql_literal(s: &str) -> String {
    json::stringify(s).replace('\'', "''")
}
