//! End-to-end batching against an in-memory SQLite database

use std::sync::Arc;

use anyhow::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sqlbatch_batcher::{BatcherFactory, BatcherOptions, Disposition, StatementBatcher};
use sqlbatch_core::{Expectation, Parameter, PendingStatement, SqlBatchError, Value};
use sqlbatch_driver_sqlite::SqliteConnection;

const SCHEMA: &str = indoc! {"
    CREATE TABLE accounts (
        id INTEGER PRIMARY KEY,
        owner TEXT NOT NULL,
        balance INTEGER NOT NULL DEFAULT 0,
        note TEXT
    );
    INSERT INTO accounts (id, owner, balance) VALUES (1, 'ann', 100), (2, 'bob', 50);
"};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn setup(options: BatcherOptions) -> Result<(StatementBatcher, Arc<SqliteConnection>)> {
    init_tracing();
    let conn = Arc::new(SqliteConnection::open_in_memory()?);
    conn.execute_batch(SCHEMA).await?;
    let batcher = StatementBatcher::new(conn.clone(), options)?;
    Ok((batcher, conn))
}

fn insert_account(id: i64, owner: &str) -> PendingStatement {
    PendingStatement::new(
        "INSERT INTO accounts (id, owner, balance) VALUES (:id, :owner, 0)",
        vec![Parameter::new("id", id), Parameter::new("owner", owner)],
    )
}

fn set_balance(id: i64, balance: i64) -> PendingStatement {
    PendingStatement::new(
        "UPDATE accounts SET balance = :balance WHERE id = :id",
        vec![Parameter::new("balance", balance), Parameter::new("id", id)],
    )
}

async fn balances(conn: &SqliteConnection) -> Result<Vec<(i64, i64)>> {
    let rows = conn
        .query_rows("SELECT id, balance FROM accounts ORDER BY id", &[])
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| Some((row[0].as_i64()?, row[1].as_i64()?)))
        .collect())
}

#[tokio::test]
async fn test_inserts_land_in_one_round_trip() -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new().with_batch_size(3)).await?;

    batcher
        .submit(insert_account(3, "cy"), Expectation::row_count(1))
        .await?;
    batcher
        .submit(insert_account(4, "di"), Expectation::row_count(1))
        .await?;
    let outcome = batcher
        .submit(insert_account(5, "ed"), Expectation::row_count(1))
        .await?;

    assert_eq!(outcome.flushes.len(), 1);
    assert_eq!(outcome.flushes[0].affected_rows, 3);
    assert_eq!(outcome.flushes[0].parameter_count, 6);
    let owners = conn
        .query_rows("SELECT owner FROM accounts WHERE id > 2 ORDER BY id", &[])
        .await?;
    assert_eq!(
        owners,
        vec![
            vec![Value::String("cy".into())],
            vec![Value::String("di".into())],
            vec![Value::String("ed".into())],
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_updates_are_chained_and_verified() -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new()).await?;

    batcher.submit(set_balance(1, 10), Expectation::row_count(1)).await?;
    batcher.submit(set_balance(2, 20), Expectation::row_count(1)).await?;
    assert_eq!(
        batcher.pending_sql(),
        Some(
            "UPDATE accounts SET balance = :p0 WHERE id = :p1; \
             UPDATE accounts SET balance = :p2 WHERE id = :p3;"
        )
    );
    let report = batcher.flush().await?;

    assert_eq!(report.map(|r| r.affected_rows), Some(2));
    assert_eq!(balances(&conn).await?, vec![(1, 10), (2, 20)]);
    Ok(())
}

#[tokio::test]
async fn test_update_of_missing_row_is_an_outcome_mismatch() -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new()).await?;

    batcher.submit(set_balance(1, 10), Expectation::row_count(1)).await?;
    batcher.submit(set_balance(99, 20), Expectation::row_count(1)).await?;
    let err = batcher.flush().await.unwrap_err();

    assert!(matches!(
        err,
        SqlBatchError::OutcomeMismatch {
            expected: 2,
            actual: 1,
            batched: true
        }
    ));
    assert!(batcher.is_idle());
    // the verifier reports, it does not roll back
    assert_eq!(balances(&conn).await?, vec![(1, 10), (2, 50)]);
    Ok(())
}

#[tokio::test]
async fn test_constraint_violation_propagates_and_resets() -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new()).await?;

    batcher
        .submit(insert_account(3, "cy"), Expectation::row_count(1))
        .await?;
    batcher
        .submit(insert_account(1, "dup"), Expectation::row_count(1))
        .await?;
    let err = batcher.flush().await.unwrap_err();

    assert!(err.is_execution_failure());
    assert!(batcher.is_idle());
    let count = conn.query_rows("SELECT COUNT(*) FROM accounts", &[]).await?;
    assert_eq!(count, vec![vec![Value::Int64(2)]]);

    batcher
        .submit(insert_account(3, "cy"), Expectation::row_count(1))
        .await?;
    assert_eq!(batcher.flush().await?.map(|r| r.affected_rows), Some(1));
    Ok(())
}

#[rstest]
#[case::compound_predicate("UPDATE accounts SET balance = :b WHERE id = :id AND owner = 'ann'")]
#[case::other_operator("UPDATE accounts SET balance = :b WHERE id <= :id")]
#[case::line_comment("UPDATE accounts SET balance = :b -- new balance\nWHERE id = :id")]
#[tokio::test]
async fn test_unsupported_updates_run_immediately(#[case] sql: &str) -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new()).await?;

    let outcome = batcher
        .submit(
            PendingStatement::new(
                sql,
                vec![Parameter::new("b", 7i64), Parameter::new("id", 1i64)],
            ),
            Expectation::row_count(1),
        )
        .await?;

    assert!(matches!(
        outcome.disposition,
        Disposition::ExecutedImmediately { .. }
    ));
    assert!(batcher.is_idle());
    assert_eq!(balances(&conn).await?, vec![(1, 7), (2, 50)]);
    Ok(())
}

#[tokio::test]
async fn test_commented_inserts_are_not_merged() -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new()).await?;

    for (id, owner) in [(3i64, "cy"), (4, "di")] {
        let outcome = batcher
            .submit(
                PendingStatement::new(
                    "INSERT INTO accounts (id, owner) VALUES (:id -- new id\n, :owner)",
                    vec![Parameter::new("id", id), Parameter::new("owner", owner)],
                ),
                Expectation::row_count(1),
            )
            .await?;
        assert_eq!(
            outcome.disposition,
            Disposition::ExecutedImmediately { affected_rows: 1 }
        );
    }

    let count = conn.query_rows("SELECT COUNT(*) FROM accounts", &[]).await?;
    assert_eq!(count, vec![vec![Value::Int64(4)]]);
    Ok(())
}

#[tokio::test]
async fn test_pending_inserts_precede_unbatchable_delete() -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new()).await?;

    batcher
        .submit(insert_account(3, "cy"), Expectation::row_count(1))
        .await?;
    let outcome = batcher
        .submit(
            PendingStatement::new(
                "DELETE FROM accounts WHERE id = :id",
                vec![Parameter::new("id", 3i64)],
            ),
            Expectation::row_count(1),
        )
        .await?;

    assert_eq!(outcome.flushes.len(), 1);
    let count = conn.query_rows("SELECT COUNT(*) FROM accounts", &[]).await?;
    assert_eq!(count, vec![vec![Value::Int64(2)]]);
    Ok(())
}

#[tokio::test]
async fn test_quoted_text_survives_rewriting() -> Result<()> {
    let (mut batcher, conn) = setup(BatcherOptions::new()).await?;

    for (id, note) in [(1i64, "a, b"), (2, "it's (fine)")] {
        batcher
            .submit(
                PendingStatement::new(
                    "UPDATE accounts SET note = :note, owner = 'x; y' WHERE id = :id",
                    vec![Parameter::new("note", note), Parameter::new("id", id)],
                ),
                Expectation::row_count(1),
            )
            .await?;
    }
    batcher.flush().await?;

    let rows = conn
        .query_rows("SELECT owner, note FROM accounts ORDER BY id", &[])
        .await?;
    assert_eq!(
        rows,
        vec![
            vec![Value::String("x; y".into()), Value::String("a, b".into())],
            vec![Value::String("x; y".into()), Value::String("it's (fine)".into())],
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_factory_options_loaded_from_file() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sqlbatch.toml");
    std::fs::write(
        &path,
        indoc! {r#"
            batch_size = 2
            parameter_stem = "arg"
        "#},
    )?;

    let factory = BatcherFactory::new(BatcherOptions::load(&path)?)?;
    let conn = Arc::new(SqliteConnection::open_in_memory()?);
    conn.execute_batch(SCHEMA).await?;
    let mut batcher = factory.create_batcher(conn.clone());

    batcher
        .submit(insert_account(3, "cy"), Expectation::row_count(1))
        .await?;
    assert_eq!(
        batcher.pending_sql(),
        Some("INSERT INTO accounts (id, owner, balance) VALUES (:arg0, :arg1, 0)")
    );
    let outcome = batcher
        .submit(insert_account(4, "di"), Expectation::row_count(1))
        .await?;

    assert!(outcome.flushed());
    let count = conn.query_rows("SELECT COUNT(*) FROM accounts", &[]).await?;
    assert_eq!(count, vec![vec![Value::Int64(4)]]);
    Ok(())
}
