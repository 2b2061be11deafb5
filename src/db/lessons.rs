use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::{expect_affected, status_column};
use crate::models::{LessonStatus, NewLesson, ScheduledLesson};

/// Book a lesson in the `Scheduled` state.
pub fn schedule_lesson(conn: &Connection, lesson: &NewLesson) -> Result<ScheduledLesson> {
    let status = LessonStatus::Scheduled;
    conn.execute(
        "INSERT INTO scheduled_lessons
             (student_id, teacher_id, instrument_id, lesson_date, start_time, end_time,
              price, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            lesson.student_id,
            lesson.teacher_id,
            lesson.instrument_id,
            lesson.lesson_date,
            lesson.start_time,
            lesson.end_time,
            lesson.price,
            status.as_str(),
        ],
    )
    .context("failed to schedule lesson")?;

    Ok(ScheduledLesson {
        id: conn.last_insert_rowid(),
        student_id: lesson.student_id,
        teacher_id: lesson.teacher_id,
        instrument_id: lesson.instrument_id,
        lesson_date: lesson.lesson_date.clone(),
        start_time: lesson.start_time.clone(),
        end_time: lesson.end_time.clone(),
        price: lesson.price,
        status,
        notes: String::new(),
    })
}

pub fn fetch_lesson(conn: &Connection, id: i64) -> Result<Option<ScheduledLesson>> {
    conn.query_row(
        "SELECT id, student_id, teacher_id, instrument_id, lesson_date, start_time, end_time,
                price, status, notes
         FROM scheduled_lessons
         WHERE id = ?1",
        params![id],
        |row| {
            Ok(ScheduledLesson {
                id: row.get(0)?,
                student_id: row.get(1)?,
                teacher_id: row.get(2)?,
                instrument_id: row.get(3)?,
                lesson_date: row.get(4)?,
                start_time: row.get(5)?,
                end_time: row.get(6)?,
                price: row.get(7)?,
                status: status_column(row, 8)?,
                notes: row.get(9)?,
            })
        },
    )
    .optional()
    .context("failed to load lesson")
}

pub fn update_lesson_status(conn: &Connection, id: i64, status: LessonStatus) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE scheduled_lessons SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )
        .context("failed to update lesson status")?;
    expect_affected(updated, "Lesson")
}

/// Delete a lesson. Payments that referenced it are kept; they drop out of
/// the per-instrument and per-teacher revenue reports.
pub fn delete_lesson(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM scheduled_lessons WHERE id = ?1", params![id])
        .context("failed to delete lesson")?;
    expect_affected(deleted, "Lesson")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;

    fn sample() -> NewLesson {
        NewLesson {
            student_id: 1,
            teacher_id: 1,
            instrument_id: 1,
            lesson_date: "2024-03-04".into(),
            start_time: "14:00".into(),
            end_time: "15:00".into(),
            price: 250.0,
        }
    }

    #[test]
    fn lesson_status_transitions_persist() {
        let conn = open_in_memory_store().unwrap();
        let lesson = schedule_lesson(&conn, &sample()).unwrap();
        assert_eq!(lesson.status, LessonStatus::Scheduled);

        update_lesson_status(&conn, lesson.id, LessonStatus::Completed).unwrap();
        let stored = fetch_lesson(&conn, lesson.id).unwrap().unwrap();
        assert_eq!(stored.status, LessonStatus::Completed);
    }

    #[test]
    fn deleting_twice_reports_missing_lesson() {
        let conn = open_in_memory_store().unwrap();
        let lesson = schedule_lesson(&conn, &sample()).unwrap();
        delete_lesson(&conn, lesson.id).unwrap();
        assert!(delete_lesson(&conn, lesson.id).is_err());
        assert_eq!(fetch_lesson(&conn, lesson.id).unwrap(), None);
    }
}
