//! Tests for statement classification

use super::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case::insert("INSERT INTO t(a,b) VALUES (:p0, :p1)")]
#[case::insert_lowercase("insert into t (a, b) values (:p0, :p1);")]
#[case::insert_literals("INSERT INTO t (a, b, c) VALUES (:p0, 'x, y', now())")]
#[case::update("UPDATE t SET x = :p0 WHERE id = :p1")]
#[case::update_lowercase("update t set x = :p0, y = 3 where id = :p1;")]
#[case::update_literal_predicate("UPDATE t SET x = :p0 WHERE id = 42")]
#[case::update_column_named_order("UPDATE orders SET total = :p0 WHERE order_id = :p1")]
#[case::update_quoted_and("UPDATE t SET note = 'this and that' WHERE id = :p1")]
#[case::update_block_comment("UPDATE t SET x = :p0 /* new x */ WHERE id = :p1")]
#[case::update_dashes_in_literal("UPDATE t SET note = '-- not a comment' WHERE id = :p1")]
fn test_batchable_statements(#[case] sql: &str) {
    assert!(is_batchable(sql), "expected batchable: {sql}");
}

#[rstest]
#[case::delete("DELETE FROM t WHERE id = :p0", NotBatchableReason::UnsupportedStatement)]
#[case::select("SELECT * FROM t", NotBatchableReason::UnsupportedStatement)]
#[case::insert_select("INSERT INTO t (a) SELECT a FROM s", NotBatchableReason::MissingValues)]
#[case::insert_multi_row("INSERT INTO t (a) VALUES (:p0), (:p1)", NotBatchableReason::TrailingClause)]
#[case::insert_returning("INSERT INTO t (a) VALUES (:p0) RETURNING id", NotBatchableReason::TrailingClause)]
#[case::insert_empty_value("INSERT INTO t (a, b) VALUES (:p0, )", NotBatchableReason::MalformedValues)]
#[case::insert_unbalanced("INSERT INTO t (a) VALUES (:p0", NotBatchableReason::MalformedValues)]
#[case::update_without_where("UPDATE t SET x = :p0", NotBatchableReason::MissingWhere)]
#[case::update_and("UPDATE t SET x = :p0 WHERE id = :p1 AND y = :p2", NotBatchableReason::CompoundPredicate)]
#[case::update_or("update t set x = :p0 where id = :p1 or id = :p2", NotBatchableReason::CompoundPredicate)]
#[case::update_range("UPDATE t SET x = :p0 WHERE id > :p1", NotBatchableReason::UnsupportedPredicate)]
#[case::update_is_null("UPDATE t SET x = :p0 WHERE id IS NULL", NotBatchableReason::UnsupportedPredicate)]
#[case::update_subquery("UPDATE t SET x = :p0 WHERE id = (SELECT 1)", NotBatchableReason::UnsupportedPredicate)]
#[case::update_from("UPDATE t SET x = s.x FROM s WHERE t.id = :p0", NotBatchableReason::UnsupportedSetClause)]
#[case::update_comment_in_set("UPDATE t SET x = :p0 -- set x\nWHERE id = :p1", NotBatchableReason::LineComment)]
#[case::update_trailing_comment("UPDATE t SET x = :p0 WHERE id = :p1 -- by id", NotBatchableReason::LineComment)]
#[case::insert_comment_in_values("INSERT INTO t (a, b) VALUES (:p0 -- first\n, :p1)", NotBatchableReason::LineComment)]
#[case::insert_comment_in_preamble("INSERT INTO t -- target\n(a) VALUES (:p0)", NotBatchableReason::LineComment)]
#[case::delete_with_comment("DELETE FROM t -- all\n", NotBatchableReason::UnsupportedStatement)]
fn test_not_batchable_statements(#[case] sql: &str, #[case] reason: NotBatchableReason) {
    assert_eq!(classify(sql), StatementShape::NotBatchable(reason));
    assert!(!is_batchable(sql));
}

#[test]
fn test_insert_shape() {
    let shape = classify("INSERT INTO t(a,b) VALUES (:p0, :p1)");

    assert_eq!(
        shape,
        StatementShape::Insert(InsertShape {
            preamble: "INSERT INTO t(a,b) VALUES (".to_string(),
            values: vec![":p0".to_string(), ":p1".to_string()],
        })
    );
}

#[test]
fn test_insert_shape_keeps_nested_values_whole() {
    let StatementShape::Insert(shape) =
        classify("INSERT INTO t (a, b, c) values(coalesce(:p0, 1), 'a,b', :p1);")
    else {
        panic!("expected insert shape");
    };

    assert_eq!(shape.preamble, "INSERT INTO t (a, b, c) VALUES (");
    assert_eq!(shape.values, vec!["coalesce(:p0, 1)", "'a,b'", ":p1"]);
}

#[test]
fn test_update_shape() {
    let shape = classify("UPDATE t SET x = :p0, y = 'a=b' WHERE id = :p1;");

    assert_eq!(
        shape,
        StatementShape::Update(SupportedUpdateShape {
            table: "t".to_string(),
            assignments: vec![
                Assignment {
                    column: "x".to_string(),
                    value: ":p0".to_string(),
                },
                Assignment {
                    column: "y".to_string(),
                    value: "'a=b'".to_string(),
                },
            ],
            predicate_column: "id".to_string(),
            predicate_value: ":p1".to_string(),
        })
    );
}

#[test]
fn test_reason_display() {
    assert_eq!(NotBatchableReason::CompoundPredicate.to_string(), "WHERE with AND/OR");
    assert_eq!(NotBatchableReason::MissingWhere.to_string(), "UPDATE without WHERE");
}
