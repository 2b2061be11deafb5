use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{expect_affected, status_column};
use crate::models::{NewStudent, Student, StudentStatus};

const STUDENT_COLUMNS: &str =
    "id, name, birth_date, gender, email, phone, registered_at, status";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        birth_date: row.get(2)?,
        gender: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        registered_at: row.get(6)?,
        status: status_column(row, 7)?,
    })
}

/// Register a student as active, stamped with the current local time.
pub fn create_student(conn: &Connection, student: &NewStudent) -> Result<Student> {
    let registered_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let status = StudentStatus::Active;

    conn.execute(
        "INSERT INTO students (name, birth_date, gender, email, phone, registered_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            student.name,
            student.birth_date,
            student.gender,
            student.email,
            student.phone,
            registered_at,
            status.as_str(),
        ],
    )
    .context("failed to insert student")?;

    Ok(Student {
        id: conn.last_insert_rowid(),
        name: student.name.clone(),
        birth_date: student.birth_date.clone(),
        gender: student.gender.clone(),
        email: student.email.clone(),
        phone: student.phone.clone(),
        registered_at,
        status,
    })
}

pub fn fetch_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
        params![id],
        student_from_row,
    )
    .optional()
    .context("failed to load student")
}

/// All students ordered by name, case-insensitively.
pub fn fetch_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY name COLLATE NOCASE, id"
        ))
        .context("failed to prepare student query")?;

    let students = stmt
        .query_map([], student_from_row)
        .context("failed to load students")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect students")?;

    Ok(students)
}

pub fn update_student_status(conn: &Connection, id: i64, status: StudentStatus) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE students SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )
        .context("failed to update student status")?;
    expect_affected(updated, "Student")
}

/// Remove a student. Enrollments cascade; lessons and payments are left in
/// place and simply stop resolving in joined reports.
pub fn delete_student(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM students WHERE id = ?1", params![id])
        .context("failed to delete student")?;
    expect_affected(deleted, "Student")
}
