use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::{expect_affected, status_column};
use crate::models::{Enrollment, EnrollmentStatus};

/// Enroll a student into an offered class starting on `start_date`
/// (`YYYY-MM-DD`).
pub fn create_enrollment(
    conn: &Connection,
    student_id: i64,
    offered_class_id: i64,
    start_date: &str,
) -> Result<Enrollment> {
    let status = EnrollmentStatus::Active;
    conn.execute(
        "INSERT INTO enrollments (student_id, offered_class_id, start_date, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![student_id, offered_class_id, start_date, status.as_str()],
    )
    .context("failed to insert enrollment")?;

    Ok(Enrollment {
        id: conn.last_insert_rowid(),
        student_id,
        offered_class_id,
        start_date: start_date.to_string(),
        end_date: None,
        status,
    })
}

pub fn fetch_enrollments(conn: &Connection, student_id: i64) -> Result<Vec<Enrollment>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, student_id, offered_class_id, start_date, end_date, status
             FROM enrollments
             WHERE student_id = ?1
             ORDER BY start_date, id",
        )
        .context("failed to prepare enrollment query")?;

    let enrollments = stmt
        .query_map([student_id], |row| {
            Ok(Enrollment {
                id: row.get(0)?,
                student_id: row.get(1)?,
                offered_class_id: row.get(2)?,
                start_date: row.get(3)?,
                end_date: row.get(4)?,
                status: status_column(row, 5)?,
            })
        })
        .context("failed to load enrollments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect enrollments")?;

    Ok(enrollments)
}

/// Change the enrollment status. Finishing an enrollment also records the
/// end date when one is supplied.
pub fn update_enrollment_status(
    conn: &Connection,
    id: i64,
    status: EnrollmentStatus,
    end_date: Option<&str>,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE enrollments SET status = ?1, end_date = COALESCE(?2, end_date) WHERE id = ?3",
            params![status.as_str(), end_date, id],
        )
        .context("failed to update enrollment")?;
    expect_affected(updated, "Enrollment")
}
