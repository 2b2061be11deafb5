//! Reporting layer: read-only aggregation queries over the record store.
//!
//! Every date-bounded report filters through
//!
//! ```sql
//! date(column) = substr(column, 1, 10) AND date(column) BETWEEN ?1 AND ?2
//! ```
//!
//! SQLite's `date()` yields NULL for text it cannot parse and silently rolls
//! impossible days over (`2024-02-30` becomes `2024-03-01`). Comparing the
//! normalised day against the stored prefix drops both kinds of malformed row
//! from the aggregate instead of failing the whole report or counting it in
//! the wrong month. Results are plain row structs; an empty result is an
//! empty `Vec`.

pub mod finance;
pub mod lessons;
pub mod students;
pub mod teachers;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use tracing::debug;

use crate::error::{ReportError, ReportResult};
use crate::models::StudentStatus;

pub use finance::{
    average_ticket, monthly_revenue, paid_payment_count, parse_top_n, payment_statement,
    pending_payments, revenue_by_instrument, revenue_by_teacher, top_spending_students,
    total_revenue, MonthlyRevenue, NamedTotal, PendingPayment, StatementLine, DEFAULT_TOP_N,
};
pub use lessons::{
    average_lessons_per_day, completed_lesson_count, instrument_popularity, lessons_by_status,
    lessons_by_teacher, peak_hours_heatmap, Heatmap, StatusCount,
};
pub use students::{
    churn_kpis, count_all_students, count_students, new_enrollments_by_month,
    new_registrations_by_month, student_roster, ChurnKpis, RosterEntry,
};
pub use teachers::{
    active_teacher_count, instruments_per_teacher, teacher_availability, teaching_load,
    AvailabilitySlot, TeacherInstruments, TeachingLoad,
};

/// Inclusive `[start, end]` filter. A range whose start falls after its end
/// is valid input and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parse both bounds from `YYYY-MM-DD`. Anything else is rejected before
    /// a report gets to run.
    pub fn parse(start: &str, end: &str) -> ReportResult<Self> {
        Ok(Self::new(parse_iso_date(start)?, parse_iso_date(end)?))
    }

    /// January 1st through December 31st of `year`.
    pub fn year(year: i32) -> Self {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
        Self::new(start, end)
    }

    /// The calendar year containing `day`.
    pub fn year_of(day: NaiveDate) -> Self {
        Self::year(day.year())
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Bounds rendered for binding into `BETWEEN ?1 AND ?2`.
    pub(crate) fn bounds(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }
}

pub(crate) fn parse_iso_date(value: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ReportError::InvalidDate {
        value: value.to_string(),
    })
}

/// `(month, count)` bucket. `month` is `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

/// `(name, count)` row used by the popularity and per-teacher counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

/// Parameters shared by one dashboard refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub range: DateRange,
    /// Narrows the per-day average and selects whose agenda to list.
    pub teacher_id: Option<i64>,
    pub top_n: usize,
}

impl ReportRequest {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            teacher_id: None,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// The dashboard's report groups. Each one knows how to rebuild its data for
/// a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportCategory {
    Overview,
    Students,
    Lessons,
    Finance,
    Teachers,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 5] = [
        ReportCategory::Overview,
        ReportCategory::Students,
        ReportCategory::Lessons,
        ReportCategory::Finance,
        ReportCategory::Teachers,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ReportCategory::Overview => "Overview",
            ReportCategory::Students => "Students",
            ReportCategory::Lessons => "Lessons",
            ReportCategory::Finance => "Finance",
            ReportCategory::Teachers => "Teachers",
        }
    }

    /// Run every report in this group for `request`.
    pub fn refresh(&self, conn: &Connection, request: &ReportRequest) -> ReportResult<ReportData> {
        let range = &request.range;
        debug!(
            category = self.title(),
            start = %range.start,
            end = %range.end,
            "refreshing reports"
        );

        let data = match self {
            ReportCategory::Overview => ReportData::Overview(OverviewSnapshot {
                active_students: count_students(conn, StudentStatus::Active)?,
                revenue: total_revenue(conn, range)?,
                completed_lessons: completed_lesson_count(conn, range)?,
                monthly_revenue: monthly_revenue(conn, range)?,
                popularity: instrument_popularity(conn, range)?,
            }),
            ReportCategory::Students => ReportData::Students(StudentsSnapshot {
                active: count_students(conn, StudentStatus::Active)?,
                total: count_all_students(conn)?,
                churn: churn_kpis(conn)?,
                new_enrollments: new_enrollments_by_month(conn, range)?,
                new_registrations: new_registrations_by_month(conn, range)?,
                roster: student_roster(conn)?,
            }),
            ReportCategory::Lessons => ReportData::Lessons(LessonsSnapshot {
                by_status: lessons_by_status(conn, range)?,
                popularity: instrument_popularity(conn, range)?,
                by_teacher: lessons_by_teacher(conn, range)?,
                heatmap: peak_hours_heatmap(conn, range)?,
                average_per_day: average_lessons_per_day(conn, request.teacher_id, range)?,
            }),
            ReportCategory::Finance => ReportData::Finance(FinanceSnapshot {
                total: total_revenue(conn, range)?,
                paid_count: paid_payment_count(conn, range)?,
                average_ticket: average_ticket(conn, range)?,
                monthly: monthly_revenue(conn, range)?,
                by_instrument: revenue_by_instrument(conn, range)?,
                by_teacher: revenue_by_teacher(conn, range)?,
                top_students: top_spending_students(conn, request.top_n, range)?,
                pending: pending_payments(conn, range)?,
                statement: payment_statement(conn, range)?,
            }),
            ReportCategory::Teachers => ReportData::Teachers(TeachersSnapshot {
                active_teachers: active_teacher_count(conn)?,
                load: teaching_load(conn, range)?,
                instruments: instruments_per_teacher(conn)?,
                availability: match request.teacher_id {
                    Some(id) => teacher_availability(conn, id, range)?,
                    None => Vec::new(),
                },
            }),
        };

        Ok(data)
    }
}

/// Output of `ReportCategory::refresh`, one variant per category.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportData {
    Overview(OverviewSnapshot),
    Students(StudentsSnapshot),
    Lessons(LessonsSnapshot),
    Finance(FinanceSnapshot),
    Teachers(TeachersSnapshot),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverviewSnapshot {
    pub active_students: i64,
    pub revenue: f64,
    pub completed_lessons: i64,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub popularity: Vec<NamedCount>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentsSnapshot {
    pub active: i64,
    pub total: i64,
    pub churn: ChurnKpis,
    pub new_enrollments: Vec<MonthlyCount>,
    pub new_registrations: Vec<MonthlyCount>,
    pub roster: Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonsSnapshot {
    pub by_status: Vec<StatusCount>,
    pub popularity: Vec<NamedCount>,
    pub by_teacher: Vec<NamedCount>,
    pub heatmap: Heatmap,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinanceSnapshot {
    pub total: f64,
    pub paid_count: i64,
    pub average_ticket: f64,
    pub monthly: Vec<MonthlyRevenue>,
    pub by_instrument: Vec<NamedTotal>,
    pub by_teacher: Vec<NamedTotal>,
    pub top_students: Vec<NamedTotal>,
    pub pending: Vec<PendingPayment>,
    pub statement: Vec<StatementLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeachersSnapshot {
    pub active_teachers: i64,
    pub load: Vec<TeachingLoad>,
    pub instruments: Vec<TeacherInstruments>,
    pub availability: Vec<AvailabilitySlot>,
}
