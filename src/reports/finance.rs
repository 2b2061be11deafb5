use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::DateRange;
use crate::error::{ReportError, ReportResult};
use crate::models::{LessonStatus, PaymentStatus};

/// Number of students listed by the top spenders report unless told
/// otherwise.
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`.
    pub month: String,
    pub total: f64,
}

/// Revenue attributed to one instrument, teacher or student.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTotal {
    pub name: String,
    pub total: f64,
}

/// A completed lesson nobody has paid for yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPayment {
    pub lesson_id: i64,
    pub lesson_date: NaiveDate,
    /// `None` when the referenced student or teacher row no longer exists.
    pub student: Option<String>,
    pub teacher: Option<String>,
    pub price: f64,
}

/// Parse a user-supplied `top_n`, rejecting negatives and garbage.
pub fn parse_top_n(value: &str) -> ReportResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ReportError::InvalidTopN {
            value: value.to_string(),
        })
}

/// Sum of paid payments inside `range`.
pub fn total_revenue(conn: &Connection, range: &DateRange) -> ReportResult<f64> {
    if range.is_inverted() {
        return Ok(0.0);
    }
    let (start, end) = range.bounds();

    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM payments
         WHERE status = ?3 AND date(paid_at) = substr(paid_at, 1, 10)
            AND date(paid_at) BETWEEN ?1 AND ?2",
        params![start, end, PaymentStatus::Paid.as_str()],
        |row| row.get(0),
    )?;
    Ok(total)
}

pub fn monthly_revenue(conn: &Connection, range: &DateRange) -> ReportResult<Vec<MonthlyRevenue>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', paid_at) AS month, SUM(amount)
         FROM payments
         WHERE status = ?3 AND date(paid_at) = substr(paid_at, 1, 10)
            AND date(paid_at) BETWEEN ?1 AND ?2
         GROUP BY month
         ORDER BY month",
    )?;
    let rows = stmt
        .query_map(params![start, end, PaymentStatus::Paid.as_str()], |row| {
            Ok(MonthlyRevenue {
                month: row.get(0)?,
                total: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Paid lesson payments grouped by the instrument of the lesson they settle.
pub fn revenue_by_instrument(
    conn: &Connection,
    range: &DateRange,
) -> ReportResult<Vec<NamedTotal>> {
    named_totals(
        conn,
        range,
        "SELECT i.name, SUM(p.amount) AS total
         FROM paid_lesson_payments p
         INNER JOIN instruments i ON i.id = p.instrument_id
         WHERE date(p.paid_at) = substr(p.paid_at, 1, 10)
            AND date(p.paid_at) BETWEEN ?1 AND ?2
         GROUP BY i.id
         ORDER BY total DESC, i.name",
    )
}

/// Paid lesson payments grouped by the teacher who gave the lesson.
pub fn revenue_by_teacher(conn: &Connection, range: &DateRange) -> ReportResult<Vec<NamedTotal>> {
    named_totals(
        conn,
        range,
        "SELECT t.name, SUM(p.amount) AS total
         FROM paid_lesson_payments p
         INNER JOIN teachers t ON t.id = p.teacher_id
         WHERE date(p.paid_at) = substr(p.paid_at, 1, 10)
            AND date(p.paid_at) BETWEEN ?1 AND ?2
         GROUP BY t.id
         ORDER BY total DESC, t.name",
    )
}

/// Students ranked by what they paid inside `range`. Payments need not
/// reference a lesson to count here.
pub fn top_spending_students(
    conn: &Connection,
    top_n: usize,
    range: &DateRange,
) -> ReportResult<Vec<NamedTotal>> {
    if top_n == 0 || range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();
    let limit = i64::try_from(top_n).unwrap_or(i64::MAX);

    let mut stmt = conn.prepare(
        "SELECT s.name, SUM(p.amount) AS total
         FROM payments p
         INNER JOIN students s ON s.id = p.student_id
         WHERE p.status = ?4 AND date(p.paid_at) = substr(p.paid_at, 1, 10)
            AND date(p.paid_at) BETWEEN ?1 AND ?2
         GROUP BY s.id
         ORDER BY total DESC, s.name
         LIMIT ?3",
    )?;
    let rows = stmt
        .query_map(
            params![start, end, limit, PaymentStatus::Paid.as_str()],
            named_total,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn named_total(row: &rusqlite::Row<'_>) -> rusqlite::Result<NamedTotal> {
    Ok(NamedTotal {
        name: row.get(0)?,
        total: row.get(1)?,
    })
}

fn named_totals(conn: &Connection, range: &DateRange, sql: &str) -> ReportResult<Vec<NamedTotal>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![start, end], named_total)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Completed lessons in `range` with no paid payment pointing at them. Each
/// lesson is listed once no matter how many non-paid payments reference it.
pub fn pending_payments(conn: &Connection, range: &DateRange) -> ReportResult<Vec<PendingPayment>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(
        "SELECT l.id, date(l.lesson_date) AS day, s.name, t.name, l.price
         FROM scheduled_lessons l
         LEFT JOIN students s ON s.id = l.student_id
         LEFT JOIN teachers t ON t.id = l.teacher_id
         WHERE l.status = ?3
           AND date(l.lesson_date) = substr(l.lesson_date, 1, 10)
           AND date(l.lesson_date) BETWEEN ?1 AND ?2
           AND NOT EXISTS (
               SELECT 1 FROM payments p WHERE p.lesson_id = l.id AND p.status = ?4
           )
         ORDER BY day, l.id",
    )?;
    let rows = stmt
        .query_map(
            params![
                start,
                end,
                LessonStatus::Completed.as_str(),
                PaymentStatus::Paid.as_str()
            ],
            |row| {
                Ok(PendingPayment {
                    lesson_id: row.get(0)?,
                    lesson_date: row.get(1)?,
                    student: row.get(2)?,
                    teacher: row.get(3)?,
                    price: row.get(4)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of paid payments inside `range`.
pub fn paid_payment_count(conn: &Connection, range: &DateRange) -> ReportResult<i64> {
    if range.is_inverted() {
        return Ok(0);
    }
    let (start, end) = range.bounds();

    let count = conn.query_row(
        "SELECT COUNT(*) FROM payments
         WHERE status = ?3 AND date(paid_at) = substr(paid_at, 1, 10)
            AND date(paid_at) BETWEEN ?1 AND ?2",
        params![start, end, PaymentStatus::Paid.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Revenue divided by the number of paid payments; `0.0` when nothing was
/// paid.
pub fn average_ticket(conn: &Connection, range: &DateRange) -> ReportResult<f64> {
    let count = paid_payment_count(conn, range)?;
    if count == 0 {
        return Ok(0.0);
    }
    Ok(total_revenue(conn, range)? / count as f64)
}

/// One line of the payment statement. `status` is the stored label.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementLine {
    pub payment_id: i64,
    pub paid_at: String,
    pub student: Option<String>,
    pub amount: f64,
    pub method: String,
    pub status: String,
}

/// Every payment inside `range` whatever its status, oldest first.
pub fn payment_statement(conn: &Connection, range: &DateRange) -> ReportResult<Vec<StatementLine>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(
        "SELECT p.id, p.paid_at, s.name, p.amount, p.method, p.status
         FROM payments p
         LEFT JOIN students s ON s.id = p.student_id
         WHERE date(p.paid_at) = substr(p.paid_at, 1, 10)
            AND date(p.paid_at) BETWEEN ?1 AND ?2
         ORDER BY p.paid_at, p.id",
    )?;
    let rows = stmt
        .query_map(params![start, end], |row| {
            Ok(StatementLine {
                payment_id: row.get(0)?,
                paid_at: row.get(1)?,
                student: row.get(2)?,
                amount: row.get(3)?,
                method: row.get(4)?,
                status: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;

    fn insert_payment(
        conn: &Connection,
        student_id: i64,
        paid_at: &str,
        amount: f64,
        status: &str,
    ) {
        conn.execute(
            "INSERT INTO payments (student_id, paid_at, amount, method, status)
             VALUES (?1, ?2, ?3, 'Pix', ?4)",
            params![student_id, paid_at, amount, status],
        )
        .unwrap();
    }

    #[test]
    fn top_n_parsing_fails_fast() {
        assert_eq!(parse_top_n("3").unwrap(), 3);
        assert_eq!(parse_top_n(" 0 ").unwrap(), 0);
        for bad in ["-1", "cinco", ""] {
            assert!(matches!(
                parse_top_n(bad),
                Err(ReportError::InvalidTopN { value }) if value == bad
            ));
        }
    }

    #[test]
    fn impossible_days_are_not_rolled_into_the_next_month() {
        let conn = open_in_memory_store().unwrap();
        insert_payment(&conn, 1, "2024-03-05", 40.0, "Pago");
        insert_payment(&conn, 1, "2024-02-30", 60.0, "Pago");
        insert_payment(&conn, 1, "2024-04-31 10:00:00", 7.0, "Pago");

        let range = DateRange::year(2024);
        assert_eq!(
            monthly_revenue(&conn, &range).unwrap(),
            vec![MonthlyRevenue {
                month: "2024-03".into(),
                total: 40.0
            }]
        );
        assert_eq!(total_revenue(&conn, &range).unwrap(), 40.0);
        assert_eq!(paid_payment_count(&conn, &range).unwrap(), 1);
        assert_eq!(payment_statement(&conn, &range).unwrap().len(), 1);
    }

    #[test]
    fn average_ticket_is_zero_without_paid_payments() {
        let conn = open_in_memory_store().unwrap();
        let range = DateRange::year(2024);
        assert_eq!(average_ticket(&conn, &range).unwrap(), 0.0);

        insert_payment(&conn, 1, "2024-05-01", 90.0, "Pendente");
        assert_eq!(average_ticket(&conn, &range).unwrap(), 0.0);

        insert_payment(&conn, 1, "2024-05-02", 100.0, "Pago");
        insert_payment(&conn, 1, "2024-05-03 09:30:00", 50.0, "Pago");
        assert_eq!(paid_payment_count(&conn, &range).unwrap(), 2);
        assert_eq!(average_ticket(&conn, &range).unwrap(), 75.0);
    }

    #[test]
    fn statement_lists_every_status_in_date_order() {
        let conn = open_in_memory_store().unwrap();
        conn.execute(
            "INSERT INTO students (id, name, registered_at) VALUES (1, 'Beatriz', '2024-01-01')",
            [],
        )
        .unwrap();
        insert_payment(&conn, 1, "2024-06-10 10:00:00", 80.0, "Estornado");
        insert_payment(&conn, 7, "2024-06-01 10:00:00", 80.0, "Pago");
        insert_payment(&conn, 1, "2023-12-31 10:00:00", 80.0, "Pago");

        let lines = payment_statement(&conn, &DateRange::year(2024)).unwrap();
        let summary: Vec<(Option<&str>, &str)> = lines
            .iter()
            .map(|line| (line.student.as_deref(), line.status.as_str()))
            .collect();
        assert_eq!(summary, [(None, "Pago"), (Some("Beatriz"), "Estornado")]);
        assert_eq!(lines[0].method, "Pix");
    }
}
