use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::{debug, info};

/// Instruments offered since the school opened. Only inserted into an empty
/// catalog.
const DEFAULT_INSTRUMENTS: &[&str] = &["Violão", "Teclado", "Guitarra"];

/// Tables, indexes and views in creation order. Every statement is idempotent
/// so the migration can run on each start-up.
const SCHEMA: &[(&str, &str)] = &[
    (
        "students table",
        "CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            birth_date TEXT,
            gender TEXT,
            email TEXT,
            phone TEXT,
            registered_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Ativo'
        )",
    ),
    (
        "teachers table",
        "CREATE TABLE IF NOT EXISTS teachers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            specialization TEXT,
            status TEXT NOT NULL DEFAULT 'Ativo'
        )",
    ),
    (
        "instruments table",
        "CREATE TABLE IF NOT EXISTS instruments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
    ),
    (
        "offered_classes table",
        "CREATE TABLE IF NOT EXISTS offered_classes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            instrument_id INTEGER NOT NULL REFERENCES instruments(id)
        )",
    ),
    (
        "enrollments table",
        "CREATE TABLE IF NOT EXISTS enrollments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            offered_class_id INTEGER NOT NULL REFERENCES offered_classes(id),
            start_date TEXT NOT NULL,
            end_date TEXT,
            status TEXT NOT NULL DEFAULT 'Ativa'
        )",
    ),
    (
        "scheduled_lessons table",
        "CREATE TABLE IF NOT EXISTS scheduled_lessons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            teacher_id INTEGER NOT NULL,
            instrument_id INTEGER NOT NULL,
            lesson_date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            price REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'Agendada',
            notes TEXT NOT NULL DEFAULT ''
        )",
    ),
    (
        "payments table",
        "CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            paid_at TEXT NOT NULL,
            amount REAL NOT NULL,
            method TEXT NOT NULL DEFAULT '',
            lesson_id INTEGER,
            status TEXT NOT NULL DEFAULT 'Pago',
            notes TEXT NOT NULL DEFAULT ''
        )",
    ),
    (
        "lesson date index",
        "CREATE INDEX IF NOT EXISTS idx_lessons_date ON scheduled_lessons(lesson_date)",
    ),
    (
        "payment date index",
        "CREATE INDEX IF NOT EXISTS idx_payments_paid_at ON payments(paid_at)",
    ),
    (
        "payment lesson index",
        "CREATE INDEX IF NOT EXISTS idx_payments_lesson ON payments(lesson_id)",
    ),
    // Paid payments resolved to the lesson they settle. Payments without a
    // lesson, or pointing at a deleted one, never appear here.
    (
        "paid_lesson_payments view",
        "CREATE VIEW IF NOT EXISTS paid_lesson_payments AS
            SELECT p.id AS payment_id,
                   p.paid_at AS paid_at,
                   p.amount AS amount,
                   p.student_id AS student_id,
                   l.id AS lesson_id,
                   l.teacher_id AS teacher_id,
                   l.instrument_id AS instrument_id
            FROM payments p
            INNER JOIN scheduled_lessons l ON l.id = p.lesson_id
            WHERE p.status = 'Pago'",
    ),
    (
        "completed_lessons view",
        "CREATE VIEW IF NOT EXISTS completed_lessons AS
            SELECT * FROM scheduled_lessons WHERE status = 'Concluída'",
    ),
];

/// Open (creating if needed) the database at `path` and bring the schema up
/// to date.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    ensure_schema(&conn)?;
    info!(path = %path.display(), "record store ready");
    Ok(conn)
}

/// In-memory store with the full schema. Used by tests and throwaway runs.
pub fn open_in_memory_store() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Enable foreign keys and run the idempotent migration.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    for (name, sql) in SCHEMA {
        conn.execute(sql, [])
            .with_context(|| format!("failed to create {name}"))?;
        debug!(object = name, "schema object ensured");
    }

    Ok(())
}

/// Insert the default instrument catalog when no instruments exist yet.
/// Returns the number of rows inserted.
pub fn seed_reference_data(conn: &Connection) -> Result<usize> {
    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM instruments", [], |row| row.get(0))
        .context("failed to count instruments")?;
    if existing > 0 {
        return Ok(0);
    }

    let mut stmt = conn
        .prepare("INSERT INTO instruments (name) VALUES (?1)")
        .context("failed to prepare instrument seed")?;
    for name in DEFAULT_INSTRUMENTS {
        stmt.execute(params![name])
            .with_context(|| format!("failed to seed instrument {name}"))?;
    }

    info!(count = DEFAULT_INSTRUMENTS.len(), "seeded instrument catalog");
    Ok(DEFAULT_INSTRUMENTS.len())
}
