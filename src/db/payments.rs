use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{params, Connection};

use super::{expect_affected, status_column};
use crate::models::{NewPayment, Payment, PaymentStatus};

/// Record a payment as `Paid`. Without an explicit date the payment is
/// stamped with the current local time.
pub fn register_payment(conn: &Connection, payment: &NewPayment) -> Result<Payment> {
    let paid_at = payment
        .paid_at
        .clone()
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    let status = PaymentStatus::Paid;

    conn.execute(
        "INSERT INTO payments (student_id, paid_at, amount, method, lesson_id, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            payment.student_id,
            paid_at,
            payment.amount,
            payment.method,
            payment.lesson_id,
            status.as_str(),
        ],
    )
    .context("failed to insert payment")?;

    Ok(Payment {
        id: conn.last_insert_rowid(),
        student_id: payment.student_id,
        paid_at,
        amount: payment.amount,
        method: payment.method.clone(),
        lesson_id: payment.lesson_id,
        status,
        notes: String::new(),
    })
}

pub fn fetch_payments_for_student(conn: &Connection, student_id: i64) -> Result<Vec<Payment>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, student_id, paid_at, amount, method, lesson_id, status, notes
             FROM payments
             WHERE student_id = ?1
             ORDER BY paid_at, id",
        )
        .context("failed to prepare payment query")?;

    let payments = stmt
        .query_map([student_id], |row| {
            Ok(Payment {
                id: row.get(0)?,
                student_id: row.get(1)?,
                paid_at: row.get(2)?,
                amount: row.get(3)?,
                method: row.get(4)?,
                lesson_id: row.get(5)?,
                status: status_column(row, 6)?,
                notes: row.get(7)?,
            })
        })
        .context("failed to load payments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect payments")?;

    Ok(payments)
}

pub fn update_payment_status(conn: &Connection, id: i64, status: PaymentStatus) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE payments SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )
        .context("failed to update payment status")?;
    expect_affected(updated, "Payment")
}
