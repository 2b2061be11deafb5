//! Record store: schema management plus one submodule of plain
//! insert/update/delete/fetch helpers per table. Reports never go through
//! these helpers; they query the tables and views directly.

mod catalog;
mod connection;
mod enrollments;
mod lessons;
mod payments;
mod students;
mod teachers;

use std::str::FromStr;

use anyhow::{anyhow, Result};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::models::ModelError;

pub use catalog::{
    create_instrument, create_offered_class, fetch_instruments, fetch_offered_classes,
};
pub use connection::{ensure_schema, open_in_memory_store, open_store, seed_reference_data};
pub use enrollments::{create_enrollment, fetch_enrollments, update_enrollment_status};
pub use lessons::{delete_lesson, fetch_lesson, schedule_lesson, update_lesson_status};
pub use payments::{fetch_payments_for_student, register_payment, update_payment_status};
pub use students::{
    create_student, delete_student, fetch_student, fetch_students, update_student_status,
};
pub use teachers::{
    create_teacher, delete_teacher, fetch_teacher_names, fetch_teachers, update_teacher_status,
};

/// Read a status column and parse it into its enum, mapping unknown labels
/// to a rusqlite conversion error so `query_map` closures can use `?`.
pub(crate) fn status_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ModelError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

/// Shared tail of every update/delete helper: zero affected rows means the
/// target id did not exist.
pub(crate) fn expect_affected(affected: usize, what: &str) -> Result<()> {
    if affected == 0 {
        Err(anyhow!("{what} not found"))
    } else {
        Ok(())
    }
}
