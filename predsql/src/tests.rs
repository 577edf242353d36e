use crate::compiler::functional::{TRANSIENT_EMAIL, TRANSIENT_USERNAME};
use crate::compiler::{JoinSpec, PredicateCompiler};
use crate::conf::{Config, PlaceholderFormat};
use crate::query::*;
use crate::result::PqError;
use crate::schema::{DataType, FieldType, RecordSchema};
use crate::select::{Pager, SelectQuery, RECORD_COUNT_COLUMN};
use crate::value::{Location, Value};
use std::collections::BTreeMap;

fn title_eq(s: &str) -> Predicate {
    Predicate::compare(
        Operator::Equal,
        Expression::key_path("title"),
        Expression::literal(s),
    )
}

fn discover(emails: &[&str]) -> Predicate {
    let mut args = BTreeMap::new();
    args.insert(
        "email".to_string(),
        emails.iter().map(|e| Value::from(*e)).collect::<Vec<_>>(),
    );
    Predicate::functional(Func::UserDiscover { args })
}

#[test]
fn join_aliases_are_reused() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let a = c.request_join(JoinSpec::new("_friend", "_owner_id", "right_id"));
    let b = c.request_join(JoinSpec::new("_friend", "_owner_id", "right_id"));
    assert_eq!(a, "_t0");
    assert_eq!(a, b);

    let d = c.request_join(JoinSpec::new("_friend", "_owner_id", "left_id"));
    let e = c.request_join(JoinSpec::new("_follow", "_owner_id", "right_id"));
    let f = c.request_join(JoinSpec::new("_friend", "author", "right_id"));

    assert_eq!(d, "_t1");
    assert_eq!(e, "_t2");
    assert_eq!(f, "_t3");
    assert_eq!(c.joined_tables().len(), 4);
}

#[test]
fn user_table_alias_is_fixed() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "user");

    c.request_join(JoinSpec::new("_friend", "_owner_id", "right_id"));
    c.request_join(JoinSpec::new("_follow", "_owner_id", "right_id"));

    let alias = c.request_join(JoinSpec::new("_user", "_id", "id"));
    assert_eq!(alias, "_user");
}

#[test]
fn no_joins_no_distinct() {
    let conf = Config::new();
    let c = PredicateCompiler::new(&conf, "note");

    let (joins, distinct) = c.render_joins();
    assert!(joins.is_empty());
    assert!(!distinct);
}

#[test]
fn render_joins_in_order() {
    let mut conf = Config::new();
    conf.set_schema("app_demo");
    let mut c = PredicateCompiler::new(&conf, "note");

    c.request_join(JoinSpec::new("_friend", "_owner_id", "right_id"));
    c.request_join(JoinSpec::new("_user", "_id", "id"));

    let (joins, distinct) = c.render_joins();
    assert!(distinct);
    assert_eq!(
        joins,
        vec![
            r#"LEFT JOIN "app_demo"."_friend" AS "_t0" ON "note"."_owner_id" = "_t0"."right_id""#,
            r#"LEFT JOIN "app_demo"."_user" AS "_user" ON "note"."_id" = "_user"."id""#,
        ]
    );
}

#[test]
fn in_empty_array() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let pred = Predicate::compare(
        Operator::In,
        Expression::key_path("category"),
        Expression::literal(Vec::<Value>::new()),
    );

    let frag = c.compile(&pred).unwrap();
    assert_eq!(frag.sql, r#""note"."category" IN (NULL)"#);
    assert!(frag.args.is_empty());
}

#[test]
fn in_array_binds_each_element() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let list: Vec<Value> = vec!["a".into(), "b".into(), "c".into()];
    let pred = Predicate::compare(
        Operator::In,
        Expression::key_path("category"),
        Expression::literal(list.clone()),
    );

    let frag = c.compile(&pred).unwrap();
    assert_eq!(frag.sql, r#""note"."category" IN (?,?,?)"#);
    assert_eq!(frag.placeholder_count(), 3);
    assert_eq!(frag.args, list);
}

#[test]
fn compound_predicates() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let pred = Predicate::or(vec![
        title_eq("a"),
        Predicate::and(vec![
            title_eq("b"),
            Predicate::compare(
                Operator::GreaterThanOrEqual,
                Expression::key_path("score"),
                Expression::literal(3i64),
            ),
        ]),
    ]);

    let frag = c.compile(&pred).unwrap();
    assert_eq!(
        frag.sql,
        r#"("note"."title" = ? OR ("note"."title" = ? AND "note"."score" >= ?))"#
    );
    assert_eq!(
        frag.args,
        vec![Value::from("a"), Value::from("b"), Value::Integer(3)]
    );
}

#[test]
fn not_wraps_inner_predicate() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let frag = c.compile(&Predicate::not(title_eq("x"))).unwrap();
    assert_eq!(frag.sql, r#"NOT ("note"."title" = ?)"#);
    assert_eq!(frag.args, vec![Value::from("x")]);

    // Errors below a NOT are reported, not swallowed.
    let bad = Predicate::not(Predicate::new(Operator::Equal, Vec::new()));
    assert_eq!(c.compile(&bad), Err(PqError::EmptyPredicate));
}

#[test]
fn empty_predicate() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let err = c.compile(&Predicate::and(Vec::new())).unwrap_err();
    assert_eq!(err, PqError::EmptyPredicate);
    assert!(err.is_contract_violation());
}

#[test]
fn comparison_requires_two_expressions() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let pred = Predicate::new(
        Operator::Like,
        vec![Operand::Expression(Expression::key_path("title"))],
    );

    assert!(matches!(
        c.compile(&pred),
        Err(PqError::MalformedPredicate(_))
    ));
}

#[test]
fn access_control_for_user_with_role() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let user = UserInfo::new("alice", &["admin"]);
    let frag = c.compile_with_access(None, &user, AclLevel::Read).unwrap();

    assert!(frag.sql.contains(r#"_access @> '[{"role":"admin"}]'"#));
    assert!(frag.sql.contains(r#"_access @> '[{"user_id":"alice"}]'"#));
    assert!(frag.sql.contains("_access IS NULL"));
    assert!(frag.sql.contains("_owner_id = ?"));
    assert_eq!(frag.sql.matches(" OR ").count(), 3);
    assert_eq!(frag.args, vec![Value::from("alice")]);
}

#[test]
fn access_control_anded_after_predicate() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let user = UserInfo::new("alice", &[]);
    let frag = c
        .compile_with_access(Some(&title_eq("x")), &user, AclLevel::Write)
        .unwrap();

    assert!(frag.sql.starts_with(r#"("note"."title" = ? AND (_access @>"#));
    assert_eq!(frag.args, vec![Value::from("x"), Value::from("alice")]);

    let anon = c
        .compile_with_access(Some(&title_eq("x")), &UserInfo::default(), AclLevel::Read)
        .unwrap();
    assert_eq!(anon.sql, r#""note"."title" = ?"#);
}

#[test]
fn discover_outside_user_table() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let err = c.compile(&discover(&["a@example.com"])).unwrap_err();
    assert!(matches!(err, PqError::InvalidContext(_)));
    assert!(!err.is_contract_violation());
    assert!(c.extra_columns().is_empty());
    assert!(c.joined_tables().is_empty());
}

#[test]
fn discover_users_by_email() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "user");

    let frag = c
        .compile(&discover(&["a@example.com", "b@example.com"]))
        .unwrap();

    assert_eq!(frag.sql, r#""_user"."email" IN (?,?)"#);
    assert_eq!(frag.args.len(), 2);
    assert_eq!(c.joined_tables(), &[JoinSpec::new("_user", "_id", "id")]);

    let mut schema = RecordSchema::new();
    schema.insert("name".into(), FieldType::new(DataType::String));

    let compiled = c.finish(schema);
    assert!(compiled.distinct);
    assert_eq!(compiled.schema.len(), 3);

    let email = &compiled.schema[TRANSIENT_EMAIL];
    assert_eq!(email.data_type(), DataType::String);
    assert_eq!(
        email.expression(),
        Some(&Expression::Function(Func::UserData {
            data_name: "email".into()
        }))
    );
    assert!(compiled.schema.contains_key(TRANSIENT_USERNAME));
}

#[test]
fn discover_with_no_emails() {
    let mut conf = Config::new();
    conf.set_user_record_type("member");
    let mut c = PredicateCompiler::new(&conf, "member");

    let frag = c.compile(&discover(&[])).unwrap();
    assert_eq!(frag.sql, r#""_user"."email" IN (NULL)"#);
    assert!(frag.args.is_empty());
}

#[test]
fn mutual_relation() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let pred = Predicate::functional(Func::UserRelation {
        relation_name: "_friend".into(),
        direction: RelationDirection::Mutual,
        key_path: "_owner".into(),
        user: "alice".into(),
    });

    let frag = c.compile(&pred).unwrap();

    assert_eq!(c.joined_tables().len(), 2);
    assert_eq!(
        frag.sql,
        r#""_t0"."left_id" = "_t1"."right_id" AND "_t0"."left_id" = ?"#
    );
    assert_eq!(frag.args, vec![Value::from("alice")]);
}

#[test]
fn one_way_relations() {
    let conf = Config::new();
    let mut c = PredicateCompiler::new(&conf, "note");

    let relation = |direction| {
        Predicate::functional(Func::UserRelation {
            relation_name: "_follow".into(),
            direction,
            key_path: "".into(),
            user: "bob".into(),
        })
    };

    let out = c.compile(&relation(RelationDirection::Outward)).unwrap();
    assert_eq!(out.sql, r#""_t0"."left_id" = ?"#);

    let inw = c.compile(&relation(RelationDirection::Inward)).unwrap();
    assert_eq!(inw.sql, r#""_t1"."right_id" = ?"#);

    // The same relation again reuses its join.
    c.compile(&relation(RelationDirection::Outward)).unwrap();
    assert_eq!(c.joined_tables().len(), 2);
    assert_eq!(c.joined_tables()[1].secondary_column(), "left_id");
}

#[test]
fn distance_sort_has_no_args() {
    let conf = Config::new();
    let c = PredicateCompiler::new(&conf, "note");

    let sort = Sort::by_func(
        Func::Distance {
            field: "location".into(),
            location: Location::new(1.0, 2.0),
        },
        SortOrder::Asc,
    );

    let sql = c.compile_sort(&sort).unwrap();
    assert_eq!(
        sql,
        r#"ST_Distance_Sphere("note"."location", ST_MakePoint(1.000000, 2.000000)) ASC"#
    );
    assert!(!sql.contains('?'));
}

#[test]
fn sort_errors() {
    let conf = Config::new();
    let c = PredicateCompiler::new(&conf, "note");

    let none = Sort {
        key_path: None,
        func: None,
        order: SortOrder::Desc,
    };
    assert_eq!(c.compile_sort(&none), Err(PqError::InvalidSort));

    let count = Sort::by_func(Func::Count { overall_records: true }, SortOrder::Asc);
    assert_eq!(
        c.compile_sort(&count),
        Err(PqError::UnsupportedSortFunc("count".into()))
    );

    let both = Sort {
        key_path: Some("title".into()),
        func: Some(Func::Count { overall_records: false }),
        order: SortOrder::Desc,
    };
    assert_eq!(c.compile_sort(&both).unwrap(), r#""note"."title" DESC"#);
}

#[test]
fn select_statement() {
    let mut conf = Config::new();
    conf.set_schema("app_demo");
    conf.set_placeholder(PlaceholderFormat::Dollar);

    let mut query = SelectQuery::new("user");
    query.set_predicate(discover(&["a@example.com"]));
    query.set_access(UserInfo::new("alice", &[]), AclLevel::Read);
    query.set_sorts(vec![Sort::by_key_path("name", SortOrder::Asc)]);
    query.set_pager(Pager::new(10, 20));
    query.set_overall_count(true);

    let stmt = query.compile(&conf, RecordSchema::new()).unwrap();

    assert_eq!(
        stmt.sql,
        concat!(
            r#"SELECT DISTINCT "user".*, "_user"."email" AS "_transient__email", "#,
            r#""_user"."username" AS "_transient__username", "#,
            r#"COUNT(*) OVER() AS "_record_count" "#,
            r#"FROM "app_demo"."user" AS "user" "#,
            r#"LEFT JOIN "app_demo"."_user" AS "_user" ON "user"."_id" = "_user"."id" "#,
            r#"WHERE ("_user"."email" IN ($1) AND (_access @> '[{"user_id":"alice"}]' "#,
            r#"OR _access IS NULL OR _owner_id = $2)) "#,
            r#"ORDER BY "user"."name" ASC LIMIT 10 OFFSET 20"#,
        )
    );
    assert_eq!(stmt.args, vec![Value::from("a@example.com"), Value::from("alice")]);
    assert_eq!(stmt.schema.len(), 3);
    assert_eq!(stmt.schema[RECORD_COUNT_COLUMN].data_type(), DataType::Integer);
}

#[test]
fn select_everything() {
    let conf = Config::new();
    let stmt = SelectQuery::new("note")
        .compile(&conf, RecordSchema::new())
        .unwrap();

    assert_eq!(stmt.sql, r#"SELECT "note".* FROM "note" AS "note""#);
    assert!(stmt.args.is_empty());
}

fn distance_sort(order: SortOrder) -> Sort {
    Sort::by_func(
        Func::Distance {
            field: "place".into(),
            location: Location::new(114.5, 22.25),
        },
        order,
    )
}

#[test]
fn distinct_select_orders_by_selected_distance() {
    let mut conf = Config::new();
    conf.set_placeholder(PlaceholderFormat::Dollar);

    let mut query = SelectQuery::new("note");
    query.set_predicate(Predicate::functional(Func::UserRelation {
        relation_name: "_follow".into(),
        direction: RelationDirection::Outward,
        key_path: "_owner".into(),
        user: "alice".into(),
    }));
    query.set_sorts(vec![
        Sort::by_key_path("title", SortOrder::Asc),
        distance_sort(SortOrder::Desc),
    ]);

    let stmt = query.compile(&conf, RecordSchema::new()).unwrap();

    assert_eq!(
        stmt.sql,
        concat!(
            r#"SELECT DISTINCT "note".*, "#,
            r#"ST_Distance_Sphere("note"."place", ST_MakePoint(114.500000, 22.250000)) AS "_sort_1" "#,
            r#"FROM "note" AS "note" "#,
            r#"LEFT JOIN "_follow" AS "_t0" ON "note"."_owner_id" = "_t0"."right_id" "#,
            r#"WHERE "_t0"."left_id" = $1 "#,
            r#"ORDER BY "note"."title" ASC, "_sort_1" DESC"#,
        )
    );
    assert_eq!(stmt.args, vec![Value::from("alice")]);

    // Every ORDER BY term is a plain column or a selected alias.
    let order_by = stmt.sql.split(" ORDER BY ").nth(1).unwrap();
    assert!(!order_by.contains("ST_Distance_Sphere"));

    let sort_col = &stmt.schema["_sort_1"];
    assert_eq!(sort_col.data_type(), DataType::Number);
    assert!(matches!(
        sort_col.expression(),
        Some(Expression::Function(Func::Distance { .. }))
    ));
}

#[test]
fn plain_select_orders_by_distance_inline() {
    let conf = Config::new();

    let mut query = SelectQuery::new("note");
    query.set_predicate(title_eq("x"));
    query.set_sorts(vec![distance_sort(SortOrder::Asc)]);

    let stmt = query.compile(&conf, RecordSchema::new()).unwrap();

    assert_eq!(
        stmt.sql,
        concat!(
            r#"SELECT "note".* FROM "note" AS "note" WHERE "note"."title" = ? "#,
            r#"ORDER BY ST_Distance_Sphere("note"."place", ST_MakePoint(114.500000, 22.250000)) ASC"#,
        )
    );
    assert!(stmt.schema.is_empty());
}

#[test]
fn distinct_select_rejects_unsortable_func() {
    let conf = Config::new();

    let mut query = SelectQuery::new("user");
    query.set_predicate(discover(&["a@example.com"]));
    query.set_sorts(vec![Sort::by_func(
        Func::Count {
            overall_records: false,
        },
        SortOrder::Asc,
    )]);

    assert_eq!(
        query.compile(&conf, RecordSchema::new()).unwrap_err(),
        PqError::UnsupportedSortFunc("count".into())
    );
}
