use chrono::Weekday;
use rusqlite::{params, Connection};

use super::{DateRange, NamedCount};
use crate::error::ReportResult;
use crate::models::LessonStatus;

/// Weekday axis of the heatmap, always in this order.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Lesson count for one status label as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Lesson counts crossed by weekday and start hour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Heatmap {
    /// Distinct start hours seen in the data, ascending.
    pub hours: Vec<u32>,
    /// One row per entry of [`WEEKDAYS`], each with one cell per hour.
    pub rows: Vec<(Weekday, Vec<i64>)>,
}

impl Heatmap {
    fn empty() -> Self {
        Self {
            hours: Vec::new(),
            rows: WEEKDAYS.iter().map(|day| (*day, Vec::new())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn count(&self, day: Weekday, hour: u32) -> i64 {
        let Some(col) = self.hours.iter().position(|h| *h == hour) else {
            return 0;
        };
        self.rows
            .iter()
            .find(|(d, _)| *d == day)
            .and_then(|(_, cells)| cells.get(col).copied())
            .unwrap_or(0)
    }

    /// Largest single cell, used to scale the rendering.
    pub fn max(&self) -> i64 {
        self.rows
            .iter()
            .flat_map(|(_, cells)| cells.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// Only the statuses present in range are returned; absent ones are not
/// padded with zero.
pub fn lessons_by_status(conn: &Connection, range: &DateRange) -> ReportResult<Vec<StatusCount>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*)
         FROM scheduled_lessons
         WHERE date(lesson_date) = substr(lesson_date, 1, 10)
            AND date(lesson_date) BETWEEN ?1 AND ?2
         GROUP BY status
         ORDER BY status",
    )?;
    let rows = stmt
        .query_map(params![start, end], |row| {
            Ok(StatusCount {
                status: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Lessons per instrument, most booked first.
pub fn instrument_popularity(
    conn: &Connection,
    range: &DateRange,
) -> ReportResult<Vec<NamedCount>> {
    named_counts(
        conn,
        range,
        "SELECT i.name, COUNT(*) AS total
         FROM scheduled_lessons l
         INNER JOIN instruments i ON i.id = l.instrument_id
         WHERE date(l.lesson_date) = substr(l.lesson_date, 1, 10)
            AND date(l.lesson_date) BETWEEN ?1 AND ?2
         GROUP BY i.id
         ORDER BY total DESC, i.name",
    )
}

/// Completed lessons per teacher, busiest first.
pub fn lessons_by_teacher(conn: &Connection, range: &DateRange) -> ReportResult<Vec<NamedCount>> {
    named_counts(
        conn,
        range,
        "SELECT t.name, COUNT(*) AS total
         FROM completed_lessons l
         INNER JOIN teachers t ON t.id = l.teacher_id
         WHERE date(l.lesson_date) = substr(l.lesson_date, 1, 10)
            AND date(l.lesson_date) BETWEEN ?1 AND ?2
         GROUP BY t.id
         ORDER BY total DESC, t.name",
    )
}

fn named_counts(conn: &Connection, range: &DateRange, sql: &str) -> ReportResult<Vec<NamedCount>> {
    if range.is_inverted() {
        return Ok(Vec::new());
    }
    let (start, end) = range.bounds();

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![start, end], |row| {
            Ok(NamedCount {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Cross-tabulate lessons by weekday and start hour. Lessons whose date or
/// start time does not parse are left out.
pub fn peak_hours_heatmap(conn: &Connection, range: &DateRange) -> ReportResult<Heatmap> {
    if range.is_inverted() {
        return Ok(Heatmap::empty());
    }
    let (start, end) = range.bounds();

    // %w counts from Sunday = 0.
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%w', lesson_date) AS INTEGER) AS weekday,
                CAST(strftime('%H', start_time) AS INTEGER) AS hour,
                COUNT(*)
         FROM scheduled_lessons
         WHERE date(lesson_date) = substr(lesson_date, 1, 10)
            AND date(lesson_date) BETWEEN ?1 AND ?2
           AND strftime('%H', start_time) IS NOT NULL
         GROUP BY weekday, hour",
    )?;
    let cells = stmt
        .query_map(params![start, end], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?, row.get::<_, i64>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut hours: Vec<u32> = cells.iter().map(|(_, hour, _)| *hour).collect();
    hours.sort_unstable();
    hours.dedup();

    let mut heatmap = Heatmap::empty();
    for (_, row) in heatmap.rows.iter_mut() {
        *row = vec![0; hours.len()];
    }
    for (sunday_based, hour, count) in cells {
        let day = (sunday_based as usize + 6) % 7;
        if let Some(col) = hours.iter().position(|h| *h == hour) {
            heatmap.rows[day].1[col] += count;
        }
    }
    heatmap.hours = hours;

    Ok(heatmap)
}

/// Mean lessons per day, counting only days that had at least one lesson.
pub fn average_lessons_per_day(
    conn: &Connection,
    teacher_id: Option<i64>,
    range: &DateRange,
) -> ReportResult<f64> {
    if range.is_inverted() {
        return Ok(0.0);
    }
    let (start, end) = range.bounds();

    let average: Option<f64> = conn.query_row(
        "SELECT AVG(per_day) FROM (
             SELECT COUNT(*) AS per_day
             FROM scheduled_lessons
             WHERE date(lesson_date) = substr(lesson_date, 1, 10)
                AND date(lesson_date) BETWEEN ?1 AND ?2
               AND (?3 IS NULL OR teacher_id = ?3)
             GROUP BY date(lesson_date)
         )",
        params![start, end, teacher_id],
        |row| row.get(0),
    )?;
    Ok(average.unwrap_or(0.0))
}

pub fn completed_lesson_count(conn: &Connection, range: &DateRange) -> ReportResult<i64> {
    if range.is_inverted() {
        return Ok(0);
    }
    let (start, end) = range.bounds();

    let count = conn.query_row(
        "SELECT COUNT(*) FROM scheduled_lessons
         WHERE status = ?3 AND date(lesson_date) = substr(lesson_date, 1, 10)
            AND date(lesson_date) BETWEEN ?1 AND ?2",
        params![start, end, LessonStatus::Completed.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;

    fn insert_lesson(conn: &Connection, teacher_id: i64, date: &str, start: &str, status: &str) {
        conn.execute(
            "INSERT INTO scheduled_lessons
                 (student_id, teacher_id, instrument_id, lesson_date, start_time, end_time, status)
             VALUES (1, ?1, 1, ?2, ?3, '23:00', ?4)",
            params![teacher_id, date, start, status],
        )
        .unwrap();
    }

    #[test]
    fn status_groups_only_cover_present_statuses() {
        let conn = open_in_memory_store().unwrap();
        insert_lesson(&conn, 1, "2024-05-06", "10:00", "Concluída");
        insert_lesson(&conn, 1, "2024-05-07", "10:00", "Concluída");
        insert_lesson(&conn, 1, "2024-05-08", "10:00", "Agendada");

        let rows = lessons_by_status(&conn, &DateRange::year(2024)).unwrap();
        assert_eq!(
            rows,
            vec![
                StatusCount { status: "Agendada".into(), count: 1 },
                StatusCount { status: "Concluída".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn heatmap_keeps_monday_first_and_fills_gaps() {
        let conn = open_in_memory_store().unwrap();
        // 2024-05-06 is a Monday, 2024-05-12 a Sunday.
        insert_lesson(&conn, 1, "2024-05-06", "14:00", "Concluída");
        insert_lesson(&conn, 1, "2024-05-13", "14:30:00", "Agendada");
        insert_lesson(&conn, 1, "2024-05-12", "09:00", "Concluída");
        insert_lesson(&conn, 1, "2024-05-12", "quatro horas", "Concluída");

        let heatmap = peak_hours_heatmap(&conn, &DateRange::year(2024)).unwrap();
        assert_eq!(heatmap.hours, vec![9, 14]);
        let days: Vec<Weekday> = heatmap.rows.iter().map(|(d, _)| *d).collect();
        assert_eq!(days, WEEKDAYS.to_vec());
        assert_eq!(heatmap.count(Weekday::Mon, 14), 2);
        assert_eq!(heatmap.count(Weekday::Sun, 9), 1);
        assert_eq!(heatmap.count(Weekday::Wed, 9), 0);
        assert_eq!(heatmap.max(), 2);
    }

    #[test]
    fn empty_heatmap_still_lists_every_weekday() {
        let conn = open_in_memory_store().unwrap();
        let heatmap = peak_hours_heatmap(&conn, &DateRange::year(2024)).unwrap();
        assert!(heatmap.is_empty());
        assert_eq!(heatmap.rows.len(), 7);
    }

    #[test]
    fn average_per_day_ignores_days_without_lessons() {
        let conn = open_in_memory_store().unwrap();
        insert_lesson(&conn, 1, "2024-05-06", "10:00", "Concluída");
        insert_lesson(&conn, 1, "2024-05-06", "11:00", "Concluída");
        insert_lesson(&conn, 1, "2024-05-06", "12:00", "Concluída");
        insert_lesson(&conn, 2, "2024-05-20", "10:00", "Agendada");

        let range = DateRange::year(2024);
        assert_eq!(average_lessons_per_day(&conn, None, &range).unwrap(), 2.0);
        assert_eq!(average_lessons_per_day(&conn, Some(1), &range).unwrap(), 3.0);
        assert_eq!(average_lessons_per_day(&conn, Some(9), &range).unwrap(), 0.0);
    }

    #[test]
    fn completed_count_skips_other_statuses() {
        let conn = open_in_memory_store().unwrap();
        insert_lesson(&conn, 1, "2024-05-06", "10:00", "Concluída");
        insert_lesson(&conn, 1, "2024-05-06", "11:00", "Cancelada");
        assert_eq!(completed_lesson_count(&conn, &DateRange::year(2024)).unwrap(), 1);
    }
}
