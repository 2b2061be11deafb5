use academia_maestro::db::{
    create_enrollment, create_instrument, create_offered_class, create_student, create_teacher,
    open_in_memory_store, register_payment, schedule_lesson, update_lesson_status,
    update_payment_status, update_student_status,
};
use academia_maestro::models::{
    Instrument, LessonStatus, NewLesson, NewPayment, NewStudent, PaymentStatus, ScheduledLesson,
    StudentStatus, Teacher,
};
use academia_maestro::reports::*;
use academia_maestro::{ReportCategory, ReportData};
use chrono::{NaiveDate, Weekday};
use rusqlite::{params, Connection};

struct School {
    conn: Connection,
    student: i64,
    ana: Teacher,
    carlos: Teacher,
    violao: Instrument,
    teclado: Instrument,
}

fn school() -> School {
    let conn = open_in_memory_store().unwrap();
    let student = create_student(
        &conn,
        &NewStudent {
            name: "Beatriz".into(),
            ..NewStudent::default()
        },
    )
    .unwrap()
    .id;
    let ana = create_teacher(&conn, "Ana Silva", None, Some("Violão")).unwrap();
    let carlos = create_teacher(&conn, "Carlos Mendes", None, Some("Teclado")).unwrap();
    let violao = create_instrument(&conn, "Violão").unwrap();
    let teclado = create_instrument(&conn, "Teclado").unwrap();
    School {
        conn,
        student,
        ana,
        carlos,
        violao,
        teclado,
    }
}

impl School {
    fn lesson(
        &self,
        teacher: &Teacher,
        instrument: &Instrument,
        date: &str,
        start: &str,
        end: &str,
    ) -> ScheduledLesson {
        schedule_lesson(
            &self.conn,
            &NewLesson {
                student_id: self.student,
                teacher_id: teacher.id,
                instrument_id: instrument.id,
                lesson_date: date.into(),
                start_time: start.into(),
                end_time: end.into(),
                price: 100.0,
            },
        )
        .unwrap()
    }

    fn completed(&self, teacher: &Teacher, instrument: &Instrument, date: &str) -> ScheduledLesson {
        let lesson = self.lesson(teacher, instrument, date, "10:00:00", "11:00:00");
        update_lesson_status(&self.conn, lesson.id, LessonStatus::Completed).unwrap();
        lesson
    }

    fn pay(&self, amount: f64, lesson: Option<i64>, paid_at: &str) -> i64 {
        register_payment(
            &self.conn,
            &NewPayment {
                student_id: self.student,
                amount,
                method: "Pix".into(),
                lesson_id: lesson,
                paid_at: Some(paid_at.into()),
            },
        )
        .unwrap()
        .id
    }
}

fn year_2024() -> DateRange {
    DateRange::year(2024)
}

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

#[test]
fn monthly_revenue_groups_paid_payments_by_month() {
    let school = school();
    school.pay(100.0, None, "2024-01-15");
    school.pay(50.0, None, "2024-02-10");
    school.pay(75.0, None, "2024-02-20");

    let months = monthly_revenue(&school.conn, &year_2024()).unwrap();
    assert_eq!(
        months,
        vec![
            MonthlyRevenue {
                month: "2024-01".into(),
                total: 100.0
            },
            MonthlyRevenue {
                month: "2024-02".into(),
                total: 125.0
            },
        ]
    );
    assert_eq!(total_revenue(&school.conn, &year_2024()).unwrap(), 225.0);
    assert_eq!(paid_payment_count(&school.conn, &year_2024()).unwrap(), 3);
    assert_eq!(average_ticket(&school.conn, &year_2024()).unwrap(), 75.0);
}

#[test]
fn impossible_days_stay_out_of_every_month() {
    let school = school();
    school.pay(40.0, None, "2024-03-05");
    school.pay(60.0, None, "2024-02-30");
    school.pay(7.0, None, "2024-04-31 12:00:00");
    school.completed(&school.ana, &school.violao, "2024-02-30");

    let months = monthly_revenue(&school.conn, &year_2024()).unwrap();
    assert_eq!(
        months,
        vec![MonthlyRevenue {
            month: "2024-03".into(),
            total: 40.0
        }]
    );
    assert_eq!(total_revenue(&school.conn, &year_2024()).unwrap(), 40.0);
    assert!(lessons_by_status(&school.conn, &year_2024()).unwrap().is_empty());
    assert!(pending_payments(&school.conn, &year_2024()).unwrap().is_empty());
    assert!(teaching_load(&school.conn, &year_2024()).unwrap().is_empty());
}

#[test]
fn enrollments_bucket_by_start_month_within_inclusive_bounds() {
    let school = school();
    let class = create_offered_class(&school.conn, "Violão I", school.violao.id).unwrap();
    for start in [
        "2024-01-31",
        "2024-02-01",
        "2024-02-29",
        "2024-03-01",
        "2024-02-30",
        "01/02/2024",
    ] {
        create_enrollment(&school.conn, school.student, class.id, start).unwrap();
    }

    let february = DateRange::parse("2024-02-01", "2024-02-29").unwrap();
    assert_eq!(
        new_enrollments_by_month(&school.conn, &february).unwrap(),
        vec![MonthlyCount {
            month: "2024-02".into(),
            count: 2
        }]
    );

    let months = new_enrollments_by_month(&school.conn, &year_2024()).unwrap();
    let buckets: Vec<(&str, i64)> = months
        .iter()
        .map(|row| (row.month.as_str(), row.count))
        .collect();
    assert_eq!(buckets, [("2024-01", 1), ("2024-02", 2), ("2024-03", 1)]);
}

#[test]
fn revenue_by_teacher_follows_the_lesson_that_was_paid() {
    let school = school();
    let ana_first = school.completed(&school.ana, &school.violao, "2024-04-01");
    let ana_second = school.completed(&school.ana, &school.teclado, "2024-04-08");
    let carlos = school.completed(&school.carlos, &school.teclado, "2024-04-09");
    school.pay(100.0, Some(ana_first.id), "2024-04-01 12:00:00");
    school.pay(120.0, Some(ana_second.id), "2024-04-08 12:00:00");
    school.pay(150.0, Some(carlos.id), "2024-04-09 12:00:00");
    let refunded = school.pay(500.0, Some(carlos.id), "2024-04-10 12:00:00");
    update_payment_status(&school.conn, refunded, PaymentStatus::Refunded).unwrap();

    assert_eq!(
        revenue_by_teacher(&school.conn, &year_2024()).unwrap(),
        vec![
            NamedTotal {
                name: "Ana Silva".into(),
                total: 220.0
            },
            NamedTotal {
                name: "Carlos Mendes".into(),
                total: 150.0
            },
        ]
    );

    let statement = payment_statement(&school.conn, &year_2024()).unwrap();
    assert_eq!(statement.len(), 4);
    assert_eq!(statement[3].status, "Estornado");
}

#[test]
fn single_month_total_ignores_insertion_order() {
    let school = school();
    for (amount, paid_at) in [
        (30.0, "2024-03-30 10:00:00"),
        (10.0, "2024-03-01 10:00:00"),
        (20.0, "2024-03-15 10:00:00"),
    ] {
        school.pay(amount, None, paid_at);
    }

    let months = monthly_revenue(&school.conn, &year_2024()).unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].total, 60.0);
}

#[test]
fn empty_lessons_table_yields_empty_reports() {
    let school = school();
    assert!(lessons_by_status(&school.conn, &year_2024()).unwrap().is_empty());
    assert!(instrument_popularity(&school.conn, &year_2024()).unwrap().is_empty());
    assert_eq!(average_lessons_per_day(&school.conn, None, &year_2024()).unwrap(), 0.0);
    let heatmap = peak_hours_heatmap(&school.conn, &year_2024()).unwrap();
    assert!(heatmap.is_empty());
    assert_eq!(heatmap.rows.len(), 7);
}

#[test]
fn completed_unpaid_lesson_is_pending_exactly_once() {
    let school = school();
    let lesson = school.completed(&school.ana, &school.violao, "2024-04-02");
    let pending_payment = school.pay(100.0, Some(lesson.id), "2024-04-02 12:00:00");
    school
        .conn
        .execute(
            "UPDATE payments SET status = 'Pendente' WHERE id = ?1",
            params![pending_payment],
        )
        .unwrap();
    let refunded = school.pay(100.0, Some(lesson.id), "2024-04-03 12:00:00");
    school
        .conn
        .execute(
            "UPDATE payments SET status = 'Estornado' WHERE id = ?1",
            params![refunded],
        )
        .unwrap();

    let pending = pending_payments(&school.conn, &year_2024()).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].lesson_id, lesson.id);
    assert_eq!(pending[0].lesson_date, day("2024-04-02"));
    assert_eq!(pending[0].student.as_deref(), Some("Beatriz"));
    assert_eq!(pending[0].teacher.as_deref(), Some("Ana Silva"));

    school.pay(100.0, Some(lesson.id), "2024-04-04 12:00:00");
    assert!(pending_payments(&school.conn, &year_2024()).unwrap().is_empty());
}

#[test]
fn scheduled_lessons_are_never_pending() {
    let school = school();
    school.lesson(&school.ana, &school.violao, "2024-04-02", "10:00", "11:00");
    assert!(pending_payments(&school.conn, &year_2024()).unwrap().is_empty());
}

#[test]
fn pending_lesson_with_deleted_teacher_keeps_its_row() {
    let school = school();
    let lesson = school.completed(&school.carlos, &school.teclado, "2024-05-06");
    school
        .conn
        .execute("DELETE FROM teachers WHERE id = ?1", params![school.carlos.id])
        .unwrap();

    let pending = pending_payments(&school.conn, &year_2024()).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].lesson_id, lesson.id);
    assert_eq!(pending[0].teacher, None);
}

#[test]
fn active_and_inactive_add_up_to_all_students() {
    let school = school();
    let before = count_students(&school.conn, StudentStatus::Active).unwrap();
    let second = create_student(
        &school.conn,
        &NewStudent {
            name: "Diego".into(),
            ..NewStudent::default()
        },
    )
    .unwrap();
    assert_eq!(count_students(&school.conn, StudentStatus::Active).unwrap(), before + 1);

    update_student_status(&school.conn, second.id, StudentStatus::Inactive).unwrap();
    let active = count_students(&school.conn, StudentStatus::Active).unwrap();
    let inactive = count_students(&school.conn, StudentStatus::Inactive).unwrap();
    assert_eq!(active + inactive, count_all_students(&school.conn).unwrap());

    let churn = churn_kpis(&school.conn).unwrap();
    assert_eq!(churn.inactive, 1);
    assert!((churn.rate - 50.0).abs() < 1e-9);
}

#[test]
fn inverted_range_yields_empty_results_everywhere() {
    let school = school();
    let lesson = school.completed(&school.ana, &school.violao, "2024-06-10");
    school.pay(100.0, Some(lesson.id), "2024-06-10 12:00:00");
    let inverted = DateRange::parse("2024-12-31", "2024-01-01").unwrap();
    assert!(inverted.is_inverted());

    let conn = &school.conn;
    assert!(monthly_revenue(conn, &inverted).unwrap().is_empty());
    assert_eq!(total_revenue(conn, &inverted).unwrap(), 0.0);
    assert!(revenue_by_instrument(conn, &inverted).unwrap().is_empty());
    assert!(revenue_by_teacher(conn, &inverted).unwrap().is_empty());
    assert!(top_spending_students(conn, DEFAULT_TOP_N, &inverted).unwrap().is_empty());
    assert!(pending_payments(conn, &inverted).unwrap().is_empty());
    assert!(lessons_by_status(conn, &inverted).unwrap().is_empty());
    assert!(instrument_popularity(conn, &inverted).unwrap().is_empty());
    assert!(lessons_by_teacher(conn, &inverted).unwrap().is_empty());
    assert!(peak_hours_heatmap(conn, &inverted).unwrap().is_empty());
    assert_eq!(average_lessons_per_day(conn, None, &inverted).unwrap(), 0.0);
    assert_eq!(completed_lesson_count(conn, &inverted).unwrap(), 0);
    assert!(new_enrollments_by_month(conn, &inverted).unwrap().is_empty());
    assert!(new_registrations_by_month(conn, &inverted).unwrap().is_empty());
    assert!(teaching_load(conn, &inverted).unwrap().is_empty());
    assert!(teacher_availability(conn, school.ana.id, &inverted).unwrap().is_empty());
}

#[test]
fn popularity_and_revenue_rank_descending_with_name_ties() {
    let school = school();
    let guitarra = create_instrument(&school.conn, "Guitarra").unwrap();
    for _ in 0..2 {
        school.lesson(&school.ana, &school.violao, "2024-02-01", "09:00", "10:00");
    }
    school.lesson(&school.ana, &school.teclado, "2024-02-02", "09:00", "10:00");
    let guitar_lesson = school.lesson(&school.carlos, &guitarra, "2024-02-03", "09:00", "10:00");

    let popularity = instrument_popularity(&school.conn, &year_2024()).unwrap();
    let names: Vec<&str> = popularity.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, ["Violão", "Guitarra", "Teclado"]);
    assert_eq!(popularity[0].count, 2);

    let teclado_lesson =
        school.lesson(&school.ana, &school.teclado, "2024-02-04", "09:00", "10:00");
    school.pay(80.0, Some(teclado_lesson.id), "2024-02-04 12:00:00");
    school.pay(80.0, Some(guitar_lesson.id), "2024-02-05 12:00:00");
    let revenue = revenue_by_instrument(&school.conn, &year_2024()).unwrap();
    assert_eq!(
        revenue,
        vec![
            NamedTotal {
                name: "Guitarra".into(),
                total: 80.0
            },
            NamedTotal {
                name: "Teclado".into(),
                total: 80.0
            },
        ]
    );
}

#[test]
fn dangling_lesson_reference_only_counts_in_plain_revenue() {
    let school = school();
    school.pay(90.0, Some(9_999), "2024-07-01 10:00:00");
    school.pay(10.0, None, "2024-07-02 10:00:00");

    assert!(revenue_by_instrument(&school.conn, &year_2024()).unwrap().is_empty());
    assert!(revenue_by_teacher(&school.conn, &year_2024()).unwrap().is_empty());
    let months = monthly_revenue(&school.conn, &year_2024()).unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].total, 100.0);

    let top = top_spending_students(&school.conn, DEFAULT_TOP_N, &year_2024()).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].total, 100.0);
}

#[test]
fn malformed_dates_drop_out_of_date_bounded_reports() {
    let school = school();
    school.pay(40.0, None, "2024-08-01 10:00:00");
    school.pay(60.0, None, "not a date");
    school.lesson(&school.ana, &school.violao, "31/08/2024", "10:00", "11:00");
    school.lesson(&school.ana, &school.violao, "2024-08-30", "10:00", "11:00");

    assert_eq!(total_revenue(&school.conn, &year_2024()).unwrap(), 40.0);
    let statuses = lessons_by_status(&school.conn, &year_2024()).unwrap();
    assert_eq!(
        statuses,
        vec![StatusCount {
            status: "Agendada".into(),
            count: 1
        }]
    );
}

#[test]
fn top_spenders_respect_the_limit() {
    let school = school();
    for name in ["Diego", "Elisa"] {
        let id = create_student(
            &school.conn,
            &NewStudent {
                name: name.into(),
                ..NewStudent::default()
            },
        )
        .unwrap()
        .id;
        register_payment(
            &school.conn,
            &NewPayment {
                student_id: id,
                amount: 300.0,
                method: "Cartão".into(),
                lesson_id: None,
                paid_at: Some("2024-09-01 10:00:00".into()),
            },
        )
        .unwrap();
    }
    school.pay(100.0, None, "2024-09-02 10:00:00");

    let top = top_spending_students(&school.conn, 2, &year_2024()).unwrap();
    let names: Vec<&str> = top.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, ["Diego", "Elisa"]);
    assert!(top_spending_students(&school.conn, 0, &year_2024()).unwrap().is_empty());
}

#[test]
fn heatmap_places_lessons_by_weekday_and_hour() {
    let school = school();
    // 2024-01-01 is a Monday, 2024-01-07 a Sunday.
    school.lesson(&school.ana, &school.violao, "2024-01-01", "14:00", "15:00");
    school.lesson(&school.carlos, &school.teclado, "2024-01-01", "14:30", "15:30");
    school.lesson(&school.ana, &school.violao, "2024-01-07", "09:00", "10:00");

    let heatmap = peak_hours_heatmap(&school.conn, &year_2024()).unwrap();
    assert_eq!(heatmap.hours, vec![9, 14]);
    assert_eq!(heatmap.rows[0].0, Weekday::Mon);
    assert_eq!(heatmap.count(Weekday::Mon, 14), 2);
    assert_eq!(heatmap.count(Weekday::Sun, 9), 1);
    assert_eq!(heatmap.count(Weekday::Wed, 9), 0);
    assert_eq!(heatmap.max(), 2);
}

#[test]
fn average_per_day_counts_only_busy_days() {
    let school = school();
    school.lesson(&school.ana, &school.violao, "2024-03-04", "09:00", "10:00");
    school.lesson(&school.ana, &school.violao, "2024-03-04", "10:00", "11:00");
    school.lesson(&school.ana, &school.violao, "2024-03-04", "11:00", "12:00");
    school.lesson(&school.carlos, &school.teclado, "2024-03-05", "09:00", "10:00");

    let overall = average_lessons_per_day(&school.conn, None, &year_2024()).unwrap();
    assert!((overall - 2.0).abs() < 1e-9);
    let carlos =
        average_lessons_per_day(&school.conn, Some(school.carlos.id), &year_2024()).unwrap();
    assert!((carlos - 1.0).abs() < 1e-9);
}

#[test]
fn teaching_load_flags_overnight_lessons() {
    let school = school();
    school.completed(&school.ana, &school.violao, "2024-10-01");
    let overnight = school.lesson(&school.ana, &school.violao, "2024-10-02", "23:00", "01:00");
    update_lesson_status(&school.conn, overnight.id, LessonStatus::Completed).unwrap();
    let half_hour = school.lesson(&school.carlos, &school.teclado, "2024-10-03", "18:00", "18:30");
    update_lesson_status(&school.conn, half_hour.id, LessonStatus::Completed).unwrap();

    let load = teaching_load(&school.conn, &year_2024()).unwrap();
    assert_eq!(load.len(), 2);
    assert_eq!(load[0].teacher, "Ana Silva");
    assert_eq!(load[0].lessons, 2);
    assert!((load[0].hours - 1.0).abs() < 1e-9);
    assert_eq!(load[0].invalid_durations, 1);
    assert_eq!(load[1].teacher, "Carlos Mendes");
    assert!((load[1].hours - 0.5).abs() < 1e-9);
    assert_eq!(load[1].invalid_durations, 0);
}

#[test]
fn instruments_per_teacher_lists_distinct_taught_instruments() {
    let school = school();
    school.completed(&school.ana, &school.violao, "2024-02-01");
    school.completed(&school.ana, &school.violao, "2024-02-08");
    school.completed(&school.ana, &school.teclado, "2024-02-15");
    school.lesson(&school.carlos, &school.teclado, "2024-02-16", "10:00", "11:00");

    let rows = instruments_per_teacher(&school.conn).unwrap();
    assert_eq!(
        rows,
        vec![TeacherInstruments {
            teacher: "Ana Silva".into(),
            instruments: "Teclado, Violão".into(),
        }]
    );
    assert_eq!(lessons_by_teacher(&school.conn, &year_2024()).unwrap()[0].count, 3);
}

#[test]
fn availability_lists_booked_slots_in_agenda_order() {
    let school = school();
    school.lesson(&school.ana, &school.violao, "2024-05-02", "15:00", "16:00");
    school.lesson(&school.ana, &school.violao, "2024-05-01", "10:00", "11:00");
    school.completed(&school.ana, &school.violao, "2024-05-01");
    let cancelled = school.lesson(&school.ana, &school.violao, "2024-05-01", "08:00", "09:00");
    update_lesson_status(&school.conn, cancelled.id, LessonStatus::Cancelled).unwrap();
    school.lesson(&school.carlos, &school.teclado, "2024-05-01", "07:00", "08:00");

    let slots = teacher_availability(&school.conn, school.ana.id, &year_2024()).unwrap();
    let agenda: Vec<(NaiveDate, &str)> = slots
        .iter()
        .map(|slot| (slot.date, slot.start_time.as_str()))
        .collect();
    assert_eq!(
        agenda,
        vec![
            (day("2024-05-01"), "10:00"),
            (day("2024-05-01"), "10:00:00"),
            (day("2024-05-02"), "15:00"),
        ]
    );
}

#[test]
fn dashboard_categories_refresh_against_shared_filter() {
    let school = school();
    let lesson = school.completed(&school.ana, &school.violao, "2024-11-11");
    school.pay(100.0, Some(lesson.id), "2024-11-11 12:00:00");

    let request = ReportRequest {
        teacher_id: Some(school.ana.id),
        ..ReportRequest::new(year_2024())
    };
    for category in ReportCategory::ALL {
        let data = category.refresh(&school.conn, &request).unwrap();
        match data {
            ReportData::Finance(finance) => {
                assert_eq!(finance.monthly.len(), 1);
                assert!(finance.pending.is_empty());
            }
            ReportData::Teachers(teachers) => assert_eq!(teachers.load.len(), 1),
            _ => {}
        }
    }
}
