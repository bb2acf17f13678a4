#![allow(dead_code)]

use std::sync::Arc;

use sql_access::prelude::*;
use tempfile::TempDir;

/// Lowercase, hyphenated version-4 UUID built from SQLite's own randomness.
const UUID_DEFAULT: &str = "(lower(hex(randomblob(4)) || '-' || hex(randomblob(2)) || '-4' || \
    substr(hex(randomblob(2)), 2) || '-' || substr('89ab', abs(random()) % 4 + 1, 1) || \
    substr(hex(randomblob(2)), 2) || '-' || hex(randomblob(6))))";

pub const TITLES: [&str; 5] = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];

/// A library database in a temporary directory, seeded with [`TITLES`], all in stock.
pub struct Library {
    pub db: Database<SqlitePool>,
    _dir: TempDir,
}

pub fn library() -> Result<Library, Box<dyn std::error::Error>> {
    open(None)
}

pub fn library_with(sink: Arc<MemorySink>) -> Result<Library, Box<dyn std::error::Error>> {
    open(Some(sink))
}

fn open(sink: Option<Arc<MemorySink>>) -> Result<Library, Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("library.db");
    let mut db = SqliteOptions::builder(path.to_string_lossy())
        .max_connections(4)
        .build()?;
    if let Some(sink) = sink {
        db = db.with_diagnostics(sink);
    }

    db.execute(&Statement::new(format!(
        "CREATE TABLE book (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE DEFAULT {UUID_DEFAULT},
            title TEXT NOT NULL UNIQUE,
            publisher TEXT,
            published TEXT,
            in_stock INTEGER NOT NULL DEFAULT 1
        )"
    )))?;

    db.with_transaction(|tx| {
        for title in TITLES {
            tx.update(&Statement::with_params(
                "INSERT INTO book (title) VALUES (?)",
                [title],
            ))?;
        }
        Ok(())
    })?;

    Ok(Library { db, _dir: dir })
}
