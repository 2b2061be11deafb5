use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection};
use tracing::warn;

use super::DateRange;
use crate::error::ReportResult;
use crate::models::{LessonStatus, TeacherStatus};

/// Completed lessons and hours taught by one teacher.
#[derive(Debug, Clone, PartialEq)]
pub struct TeachingLoad {
    pub teacher: String,
    pub lessons: i64,
    /// Sum of positive durations only.
    pub hours: f64,
    /// Lessons whose end time is not after their start time, or whose times
    /// do not parse. Lessons crossing midnight land here.
    pub invalid_durations: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherInstruments {
    pub teacher: String,
    /// Distinct instrument names, alphabetical, joined with `", "`.
    pub instruments: String,
}

/// A booked slot in a teacher's agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySlot {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Duration in hours, or `None` when it cannot be trusted.
fn lesson_hours(start: &str, end: &str) -> Option<f64> {
    let (start, end) = (parse_time(start)?, parse_time(end)?);
    let seconds = (end - start).num_seconds();
    (seconds > 0).then(|| seconds as f64 / 3600.0)
}

pub fn teaching_load(conn: &Connection, range: &DateRange) -> ReportResult<Vec<TeachingLoad>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(
        "SELECT l.id, t.id, t.name, l.start_time, l.end_time
         FROM completed_lessons l
         INNER JOIN teachers t ON t.id = l.teacher_id
         WHERE date(l.lesson_date) = substr(l.lesson_date, 1, 10)
            AND date(l.lesson_date) BETWEEN ?1 AND ?2",
    )?;
    let lessons = stmt
        .query_map(params![start, end], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut per_teacher: BTreeMap<i64, TeachingLoad> = BTreeMap::new();
    for (lesson_id, teacher_id, teacher, start_time, end_time) in lessons {
        let entry = per_teacher.entry(teacher_id).or_insert_with(|| TeachingLoad {
            teacher,
            lessons: 0,
            hours: 0.0,
            invalid_durations: 0,
        });
        entry.lessons += 1;
        match lesson_hours(&start_time, &end_time) {
            Some(hours) => entry.hours += hours,
            None => {
                warn!(lesson_id, %start_time, %end_time, "excluding lesson with invalid duration");
                entry.invalid_durations += 1;
            }
        }
    }

    let mut rows: Vec<TeachingLoad> = per_teacher.into_values().collect();
    rows.sort_by(|a, b| b.lessons.cmp(&a.lessons).then_with(|| a.teacher.cmp(&b.teacher)));
    Ok(rows)
}

pub fn active_teacher_count(conn: &Connection) -> ReportResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM teachers WHERE status = ?1",
        params![TeacherStatus::Active.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Instruments each teacher has actually taught, over all completed lessons.
pub fn instruments_per_teacher(conn: &Connection) -> ReportResult<Vec<TeacherInstruments>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT t.id, t.name, i.name
         FROM completed_lessons l
         INNER JOIN teachers t ON t.id = l.teacher_id
         INNER JOIN instruments i ON i.id = l.instrument_id
         ORDER BY t.name, t.id, i.name",
    )?;
    let pairs = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows: Vec<TeacherInstruments> = Vec::new();
    let mut current: Option<i64> = None;
    for (teacher_id, teacher, instrument) in pairs {
        match rows.last_mut() {
            Some(last) if current == Some(teacher_id) => {
                last.instruments.push_str(", ");
                last.instruments.push_str(&instrument);
            }
            _ => {
                current = Some(teacher_id);
                rows.push(TeacherInstruments {
                    teacher,
                    instruments: instrument,
                });
            }
        }
    }
    Ok(rows)
}

/// Booked slots (scheduled or completed) for one teacher, in agenda order.
/// Finding the gaps is left to the caller.
pub fn teacher_availability(
    conn: &Connection,
    teacher_id: i64,
    range: &DateRange,
) -> ReportResult<Vec<AvailabilitySlot>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(
        "SELECT date(lesson_date) AS day, start_time, end_time
         FROM scheduled_lessons
         WHERE teacher_id = ?3
           AND status IN (?4, ?5)
           AND date(lesson_date) = substr(lesson_date, 1, 10)
           AND date(lesson_date) BETWEEN ?1 AND ?2
         ORDER BY day, start_time",
    )?;
    let rows = stmt
        .query_map(
            params![
                start,
                end,
                teacher_id,
                LessonStatus::Scheduled.as_str(),
                LessonStatus::Completed.as_str()
            ],
            |row| {
                Ok(AvailabilitySlot {
                    date: row.get(0)?,
                    start_time: row.get(1)?,
                    end_time: row.get(2)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
