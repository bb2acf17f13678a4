#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use sql_access::prelude::*;

use common::{TITLES, library, library_with};

fn titles(db: &Database<SqlitePool>) -> Result<Vec<Option<String>>, SqlAccessError> {
    db.select_many(
        &Statement::new("SELECT title FROM book ORDER BY title"),
        Row::first_string,
    )
}

#[test]
fn unique_violation_recovers_conflicting_values() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let fallback = UniqueViolationQuery::projecting(Statement::with_params(
        "SELECT title FROM book WHERE title = ?",
        ["Alpha"],
    ));

    let err = lib
        .db
        .with_transaction(|tx| {
            tx.update_with_fallback(
                &Statement::with_params("INSERT INTO book (title) VALUES (?)", ["Alpha"]),
                &fallback,
            )
        })
        .unwrap_err();

    assert!(err.is_conflict());
    let violations = err.violations().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations.get("title"), Some(&RowValues::Text("Alpha".into())));
    assert_eq!(err.driver_error().and_then(DriverError::sql_state), Some("23505"));
    assert!(!err.is_retriable());
    Ok(())
}

#[test]
fn unique_violation_without_fallback_is_an_empty_conflict() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let err = lib
        .db
        .with_transaction(|tx| {
            tx.update(&Statement::with_params(
                "INSERT INTO book (title) VALUES (?)",
                ["Bravo"],
            ))
        })
        .unwrap_err();

    assert!(err.is_conflict());
    assert!(err.violations().is_some_and(|v| v.is_empty()));
    Ok(())
}

#[test]
fn conflict_with_fallback_leaves_the_transaction_usable() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let fallback = UniqueViolationQuery::projecting(Statement::with_params(
        "SELECT id, title FROM book WHERE title = ?",
        ["Charlie"],
    ));

    let recovered = lib.db.with_transaction(|tx| {
        let conflict = tx
            .update_with_fallback(
                &Statement::with_params("INSERT INTO book (title) VALUES (?)", ["Charlie"]),
                &fallback,
            )
            .unwrap_err();
        tx.update(&Statement::with_params(
            "INSERT INTO book (title) VALUES (?)",
            ["Foxtrot"],
        ))?;
        Ok(conflict.violations().cloned().unwrap_or_default())
    })?;

    assert_eq!(recovered.get("id"), Some(&RowValues::Long(3)));
    assert_eq!(titles(&lib.db)?.len(), TITLES.len() + 1);
    Ok(())
}

#[test]
fn update_counts_affected_rows() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let affected = lib.db.with_transaction(|tx| {
        tx.update(&Statement::with_params(
            "UPDATE book SET in_stock = ? WHERE in_stock = ?",
            [false, true],
        ))
    })?;
    assert_eq!(affected, 5);

    let in_stock = lib.db.select_first(
        &Statement::with_params("SELECT count(*) FROM book WHERE in_stock = ?", [true]),
        Row::first_long,
    )?;
    assert_eq!(in_stock, Some(0));
    Ok(())
}

#[test]
fn writes_outside_a_transaction_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let exec = lib.db.executor();
    assert!(!exec.is_transaction_active());

    let stmt = Statement::with_params("UPDATE book SET publisher = ?", ["Nobody"]);
    assert!(matches!(exec.update(&stmt), Err(SqlAccessError::TransactionRequired)));
    assert!(matches!(
        exec.insert_returning_uuid(&stmt),
        Err(SqlAccessError::TransactionRequired)
    ));
    assert!(matches!(
        exec.in_transaction(|_| Ok(())),
        Err(SqlAccessError::TransactionRequired)
    ));

    let publishers = lib.db.select_many(
        &Statement::new("SELECT publisher FROM book WHERE publisher IS NOT NULL"),
        Row::first_string,
    )?;
    assert!(publishers.is_empty());
    Ok(())
}

#[test]
fn update_returning_maps_the_written_row() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let updated = lib.db.with_transaction(|tx| {
        tx.update_returning(
            &Statement::with_params(
                "UPDATE book SET publisher = ? WHERE title = ? RETURNING id, publisher",
                ["Orbit", "Delta"],
            ),
            |row| Ok((row.get_long("id")?, row.get_string("publisher")?)),
        )
    })?;
    assert_eq!(updated, Some((4, Some("Orbit".to_string()))));

    let none = lib.db.with_transaction(|tx| {
        tx.update_returning(
            &Statement::with_params(
                "UPDATE book SET publisher = ? WHERE title = ? RETURNING id",
                ["Orbit", "Zulu"],
            ),
            Row::first_long,
        )
    })?;
    assert_eq!(none, None);
    Ok(())
}

#[test]
fn insert_returns_generated_keys() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let (id, uuid) = lib.db.with_transaction(|tx| {
        let id: i64 = tx.insert_returning_key(
            &Statement::with_params("INSERT INTO book (title) VALUES (?)", ["Foxtrot"]),
            "id",
        )?;
        let uuid = tx.insert_returning_uuid(&Statement::with_params(
            "INSERT INTO book (title) VALUES (?)",
            ["Golf"],
        ))?;
        Ok((id, uuid))
    })?;
    assert_eq!(id, 6);

    let title = lib.db.select_first(
        &Statement::with_params("SELECT title FROM book WHERE uuid = ?", [uuid]),
        Row::first_string,
    )?;
    assert_eq!(title, Some(Some("Golf".to_string())));
    Ok(())
}

#[test]
fn insert_without_a_row_has_no_generated_key() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let result = lib.db.with_transaction(|tx| {
        tx.insert_returning_uuid(&Statement::with_params(
            "INSERT INTO book (title) SELECT ? WHERE 1 = 0",
            ["Hotel"],
        ))
    });
    assert!(matches!(result, Err(SqlAccessError::MissingGeneratedKey)));
    Ok(())
}

#[test]
fn empty_queries_yield_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let stmt = Statement::with_params("SELECT id FROM book WHERE title = ?", ["Zulu"]);
    assert_eq!(lib.db.select_first(&stmt, Row::first_long)?, None);
    assert!(lib.db.select_many(&stmt, Row::first_long)?.is_empty());
    Ok(())
}

#[test]
fn failed_work_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let result: Result<(), SqlAccessError> = lib.db.with_transaction(|tx| {
        tx.update(&Statement::new("DELETE FROM book"))?;
        Err(SqlAccessError::ConfigError("abort".into()))
    });
    assert!(matches!(result, Err(SqlAccessError::ConfigError(_))));
    assert_eq!(titles(&lib.db)?.len(), TITLES.len());
    Ok(())
}

#[test]
fn nested_required_joins_the_active_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let result: Result<(), SqlAccessError> = lib.db.with_transaction(|tx| {
        tx.with_transaction(|inner| {
            assert!(inner.is_transaction_active());
            inner.update(&Statement::with_params(
                "DELETE FROM book WHERE title = ?",
                ["Echo"],
            ))
        })?;
        tx.in_transaction(|inner| inner.update(&Statement::new("DELETE FROM book")))?;
        Err(SqlAccessError::ConfigError("abort".into()))
    });
    assert!(result.is_err());
    assert_eq!(titles(&lib.db)?.len(), TITLES.len());
    Ok(())
}

#[test]
fn requires_new_commits_independently() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let result: Result<(), SqlAccessError> = lib.db.with_transaction(|tx| {
        tx.with_new_transaction(|independent| {
            independent.update(&Statement::with_params(
                "INSERT INTO book (title) VALUES (?)",
                ["Independent"],
            ))
        })?;
        Err(SqlAccessError::ConfigError("abort".into()))
    });
    assert!(result.is_err());

    let found = lib.db.select_first(
        &Statement::with_params("SELECT count(*) FROM book WHERE title = ?", ["Independent"]),
        Row::first_long,
    )?;
    assert_eq!(found, Some(1));
    Ok(())
}

#[test]
fn supports_runs_with_or_without_a_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let exec = lib.db.executor();
    let outside = exec.transact(Propagation::Supports, |e| Ok(e.is_transaction_active()))?;
    let inside = exec.transact(Propagation::Required, |e| {
        e.transact(Propagation::Supports, |e| Ok(e.is_transaction_active()))
    })?;
    assert!(!outside);
    assert!(inside);
    Ok(())
}

#[test]
fn pages_through_results() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let ordered = Statement::new("SELECT title FROM book ORDER BY title");

    let page = lib.db.select_many(&ordered.page(Some(2), Some(1)), Row::first_string)?;
    assert_eq!(page, vec![Some("Bravo".to_string()), Some("Charlie".to_string())]);

    let head = lib.db.select_many(&ordered.page(Some(3), None), Row::first_string)?;
    assert_eq!(head.len(), 3);

    let everything = lib.db.select_many(&ordered.page(None, None), Row::first_string)?;
    assert_eq!(everything.len(), TITLES.len());
    Ok(())
}

#[test]
fn binder_and_typed_accessors_round_trip_values() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let published = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
    lib.db.with_transaction(|tx| {
        tx.update(&Statement::with_binder(
            "UPDATE book SET published = ?, publisher = ?, in_stock = ? WHERE title = ?",
            move |b| {
                b.set_date(published)?.set_null()?.set_bool(false)?.set_string("Alpha")?;
                Ok(())
            },
        ))
    })?;

    let row = lib.db.select_first(
        &Statement::with_params(
            "SELECT published, publisher, in_stock, id FROM book WHERE title = ?",
            ["Alpha"],
        ),
        |row| {
            let date = row.get_date("published")?;
            let publisher = row.get_string(2)?;
            let publisher_was_null = row.was_null();
            let in_stock = row.get_bool("IN_STOCK")?;
            let id = row.get_int(4)?;
            Ok((date, publisher, publisher_was_null, in_stock, id))
        },
    )?;
    assert_eq!(row, Some((Some(published), None, true, false, 1)));
    Ok(())
}

#[test]
fn unknown_columns_are_reported() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let result = lib.db.select_first(
        &Statement::new("SELECT title FROM book ORDER BY id"),
        |row| row.get_string("isbn"),
    );
    assert!(matches!(result, Err(SqlAccessError::ColumnNotFound(_))));

    let result = lib.db.select_first(&Statement::new("SELECT title FROM book"), |row| {
        row.get_long(1)
    });
    assert!(matches!(result, Err(SqlAccessError::TypeMismatch { .. })));
    Ok(())
}

#[test]
fn nested_statement_while_cursor_is_open_is_busy() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let result = lib.db.with_transaction(|tx| {
        tx.select_many(&Statement::new("SELECT id FROM book"), |_| {
            tx.select_first(&Statement::new("SELECT 1"), Row::first_long)
        })
    });
    assert!(matches!(result, Err(SqlAccessError::ConnectionBusy)));
    Ok(())
}

#[test]
fn failures_and_statements_reach_the_diagnostics_sink() -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(MemorySink::new());
    let lib = library_with(Arc::clone(&sink))?;

    lib.db.select_many(
        &Statement::new("SELECT title\n       FROM book\n      WHERE in_stock = 1"),
        Row::first_string,
    )?;
    let traced = sink.messages(Severity::Low);
    assert!(traced.iter().any(|m| m == "SELECT title FROM book WHERE in_stock = 1"));

    let err = lib
        .db
        .with_transaction(|tx| tx.update(&Statement::new("INSERT INTO book (publisher) VALUES ('x')")))
        .unwrap_err();
    assert!(matches!(err, SqlAccessError::Unknown(_)));
    assert!(sink
        .messages(Severity::Low)
        .iter()
        .any(|m| m.starts_with("NOT_NULL_VIOLATION (23502)")));

    let err = lib.db.execute(&Statement::new("SELEKT 1")).unwrap_err();
    assert!(matches!(err, SqlAccessError::Unknown(_)));
    assert!(sink
        .messages(Severity::Low)
        .iter()
        .any(|m| m.starts_with("UNKNOWN_STATE ()")));
    assert!(sink.messages(Severity::High).is_empty());
    Ok(())
}

#[test]
fn default_sink_reports_through_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("sql_access=debug")
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || -> Result<(), Box<dyn std::error::Error>> {
        let lib = library()?;
        let err = lib.db.execute(&Statement::new("SELEKT 1")).unwrap_err();
        assert!(matches!(err, SqlAccessError::Unknown(_)));
        Ok(())
    })
}

#[test]
fn fallback_without_a_match_is_an_empty_conflict() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let fallback = UniqueViolationQuery::projecting(Statement::with_params(
        "SELECT title FROM book WHERE title = ?",
        ["Nowhere"],
    ));
    let err = lib
        .db
        .with_transaction(|tx| {
            tx.update_with_fallback(
                &Statement::with_params("INSERT INTO book (title) VALUES (?)", ["Alpha"]),
                &fallback,
            )
        })
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(err.violations().is_some_and(|v| v.is_empty()));
    Ok(())
}

#[test]
fn failed_guarded_writes_leave_no_savepoint_open() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let fallback = UniqueViolationQuery::projecting(Statement::with_params(
        "SELECT title FROM book WHERE title = ?",
        ["Alpha"],
    ));
    let release = Statement::new("RELEASE SAVEPOINT sql_access_fallback");

    let leftover = lib.db.with_transaction(|tx| {
        for _ in 0..3 {
            let err = tx
                .update_with_fallback(
                    &Statement::with_params("INSERT INTO book (title) VALUES (?)", ["Alpha"]),
                    &fallback,
                )
                .unwrap_err();
            assert!(err.is_conflict());
        }
        let err = tx
            .update_with_fallback(&Statement::new("INSERT INTO book (publisher) VALUES ('x')"), &fallback)
            .unwrap_err();
        assert!(matches!(err, SqlAccessError::Unknown(_)));

        let leftover = tx.execute(&release).is_ok();
        tx.update(&Statement::with_params(
            "INSERT INTO book (title) VALUES (?)",
            ["Foxtrot"],
        ))?;
        Ok(leftover)
    })?;

    assert!(!leftover);
    assert_eq!(titles(&lib.db)?.len(), TITLES.len() + 1);
    Ok(())
}

#[test]
fn panicking_work_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library()?;
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = lib.db.with_transaction(|tx| -> Result<(), SqlAccessError> {
            tx.update(&Statement::new("DELETE FROM book"))?;
            panic!("work abandoned mid-transaction");
        });
    }));
    assert!(outcome.is_err());
    assert_eq!(titles(&lib.db)?.len(), TITLES.len());
    Ok(())
}
