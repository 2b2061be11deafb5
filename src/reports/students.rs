use rusqlite::{params, Connection};

use super::{DateRange, MonthlyCount};
use crate::error::ReportResult;
use crate::models::StudentStatus;

/// Lifetime churn: how many students left and what share of everyone ever
/// registered that represents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChurnKpis {
    pub inactive: i64,
    /// Percentage in `0.0..=100.0`.
    pub rate: f64,
}

pub fn count_students(conn: &Connection, status: StudentStatus) -> ReportResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_all_students(conn: &Connection) -> ReportResult<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
    Ok(count)
}

/// Enrollments starting inside `range`, bucketed per month.
pub fn new_enrollments_by_month(
    conn: &Connection,
    range: &DateRange,
) -> ReportResult<Vec<MonthlyCount>> {
    monthly_counts(
        conn,
        range,
        "SELECT strftime('%Y-%m', start_date) AS month, COUNT(*)
         FROM enrollments
         WHERE date(start_date) = substr(start_date, 1, 10)
            AND date(start_date) BETWEEN ?1 AND ?2
         GROUP BY month
         ORDER BY month",
    )
}

/// Students registered inside `range`, bucketed per month. Kept apart from
/// enrollments: a student may register long before joining a class.
pub fn new_registrations_by_month(
    conn: &Connection,
    range: &DateRange,
) -> ReportResult<Vec<MonthlyCount>> {
    monthly_counts(
        conn,
        range,
        "SELECT strftime('%Y-%m', registered_at) AS month, COUNT(*)
         FROM students
         WHERE date(registered_at) = substr(registered_at, 1, 10)
            AND date(registered_at) BETWEEN ?1 AND ?2
         GROUP BY month
         ORDER BY month",
    )
}

fn monthly_counts(
    conn: &Connection,
    range: &DateRange,
    sql: &str,
) -> ReportResult<Vec<MonthlyCount>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![start, end], |row| {
            Ok(MonthlyCount {
                month: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Not date-bounded: churn is measured over the whole history.
pub fn churn_kpis(conn: &Connection) -> ReportResult<ChurnKpis> {
    let (total, inactive): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(status = ?1), 0) FROM students",
        params![StudentStatus::Inactive.as_str()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    if total == 0 {
        return Ok(ChurnKpis::default());
    }

    Ok(ChurnKpis {
        inactive,
        rate: inactive as f64 / total as f64 * 100.0,
    })
}

/// One row of the student list. Status stays the stored label so a row with
/// an unexpected value still shows up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub registered_at: String,
    pub status: String,
}

/// Every student, alphabetical. Not date-bounded.
pub fn student_roster(conn: &Connection) -> ReportResult<Vec<RosterEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, registered_at, status
         FROM students
         ORDER BY name COLLATE NOCASE, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RosterEntry {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
                registered_at: row.get(4)?,
                status: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
