use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::{expect_affected, status_column};
use crate::models::{Teacher, TeacherStatus};

/// Insert an active teacher and return the hydrated row.
pub fn create_teacher(
    conn: &Connection,
    name: &str,
    email: Option<&str>,
    specialization: Option<&str>,
) -> Result<Teacher> {
    let status = TeacherStatus::Active;
    conn.execute(
        "INSERT INTO teachers (name, email, specialization, status) VALUES (?1, ?2, ?3, ?4)",
        params![name, email, specialization, status.as_str()],
    )
    .context("failed to insert teacher")?;

    Ok(Teacher {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        email: email.map(str::to_string),
        phone: None,
        specialization: specialization.map(str::to_string),
        status,
    })
}

pub fn fetch_teachers(conn: &Connection) -> Result<Vec<Teacher>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, email, phone, specialization, status
             FROM teachers
             ORDER BY name COLLATE NOCASE, id",
        )
        .context("failed to prepare teacher query")?;

    let teachers = stmt
        .query_map([], |row| {
            Ok(Teacher {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
                specialization: row.get(4)?,
                status: status_column(row, 5)?,
            })
        })
        .context("failed to load teachers")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect teachers")?;

    Ok(teachers)
}

/// Ids and names only, in the same order as `fetch_teachers`. The status
/// column is not read, so rows with unexpected labels still load.
pub fn fetch_teacher_names(conn: &Connection) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM teachers ORDER BY name COLLATE NOCASE, id")
        .context("failed to prepare teacher name query")?;

    let names = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to load teacher names")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect teacher names")?;

    Ok(names)
}

pub fn update_teacher_status(conn: &Connection, id: i64, status: TeacherStatus) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE teachers SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )
        .context("failed to update teacher status")?;
    expect_affected(updated, "Teacher")
}

pub fn delete_teacher(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM teachers WHERE id = ?1", params![id])
        .context("failed to delete teacher")?;
    expect_affected(deleted, "Teacher")
}
