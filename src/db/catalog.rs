//! Reference data: instruments and the classes offered for them.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode};

use crate::models::{Instrument, OfferedClass};

pub fn create_instrument(conn: &Connection, name: &str) -> Result<Instrument> {
    conn.execute("INSERT INTO instruments (name) VALUES (?1)", params![name])
        .map_err(|err| map_unique_constraint(err, name))
        .context("failed to insert instrument")?;

    Ok(Instrument {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn fetch_instruments(conn: &Connection) -> Result<Vec<Instrument>> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM instruments ORDER BY name COLLATE NOCASE")
        .context("failed to prepare instrument query")?;

    let instruments = stmt
        .query_map([], |row| {
            Ok(Instrument {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to load instruments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect instruments")?;

    Ok(instruments)
}

/// Add a class to the catalog. The instrument must exist; the foreign key
/// rejects anything else.
pub fn create_offered_class(
    conn: &Connection,
    name: &str,
    instrument_id: i64,
) -> Result<OfferedClass> {
    conn.execute(
        "INSERT INTO offered_classes (name, instrument_id) VALUES (?1, ?2)",
        params![name, instrument_id],
    )
    .context("failed to insert offered class")?;

    Ok(OfferedClass {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        instrument_id,
    })
}

pub fn fetch_offered_classes(conn: &Connection) -> Result<Vec<OfferedClass>> {
    let mut stmt = conn
        .prepare("SELECT id, name, instrument_id FROM offered_classes ORDER BY name COLLATE NOCASE")
        .context("failed to prepare offered class query")?;

    let classes = stmt
        .query_map([], |row| {
            Ok(OfferedClass {
                id: row.get(0)?,
                name: row.get(1)?,
                instrument_id: row.get(2)?,
            })
        })
        .context("failed to load offered classes")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect offered classes")?;

    Ok(classes)
}

/// Instrument names are unique; turn the raw constraint failure into a
/// message the dashboard can show as-is.
fn map_unique_constraint(err: SqlError, name: &str) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        anyhow!("Instrument {name} already exists.")
    } else {
        err.into()
    }
}
