//! Command-line surface: the dashboard plus the record commands used by the
//! front desk (register people, open classes, enroll, book lessons, take
//! payments and correct statuses).

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use crate::config::Config;
use crate::db::{
    create_enrollment, create_offered_class, create_student, create_teacher, delete_lesson,
    delete_student, delete_teacher, fetch_enrollments, fetch_instruments, fetch_lesson,
    fetch_offered_classes, fetch_payments_for_student, fetch_student, fetch_students,
    open_store, register_payment, schedule_lesson, seed_reference_data,
    update_enrollment_status, update_lesson_status, update_payment_status,
    update_student_status, update_teacher_status,
};
use crate::models::{
    EnrollmentStatus, LessonStatus, NewLesson, NewPayment, NewStudent, PaymentStatus,
    StudentStatus, TeacherStatus,
};
use crate::reports::{DateRange, ReportRequest};
use crate::ui::{run_app, App};

#[derive(Debug, Parser)]
#[command(name = "academia-maestro", version, about = "Academia Maestro records and reports")]
pub struct Cli {
    /// SQLite database file.
    #[arg(long = "db", env = "MAESTRO_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Where to append log output.
    #[arg(long = "log-file", global = true)]
    pub log_path: Option<PathBuf>,

    /// Default price for newly scheduled lessons.
    #[arg(long, env = "MAESTRO_LESSON_PRICE", global = true)]
    pub lesson_price: Option<f64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the reporting dashboard (default).
    Dashboard {
        /// First day of the range, YYYY-MM-DD. Defaults to January 1st.
        #[arg(long)]
        from: Option<String>,
        /// Last day of the range, YYYY-MM-DD. Defaults to December 31st.
        #[arg(long)]
        to: Option<String>,
    },
    /// Insert the default instrument catalog into an empty database.
    Seed,
    /// Register a new active student.
    AddStudent {
        name: String,
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List every student.
    ListStudents,
    /// Show one student with enrollments and payments.
    ShowStudent { id: i64 },
    /// Change a student's status (Ativo, Inativo).
    SetStudentStatus {
        id: i64,
        #[arg(value_parser = str::parse::<StudentStatus>)]
        status: StudentStatus,
    },
    /// Delete a student and their enrollments.
    RemoveStudent { id: i64 },
    /// Register a new active teacher.
    AddTeacher {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        specialization: Option<String>,
    },
    /// Change a teacher's status (Ativo, Inativo).
    SetTeacherStatus {
        id: i64,
        #[arg(value_parser = str::parse::<TeacherStatus>)]
        status: TeacherStatus,
    },
    RemoveTeacher { id: i64 },
    /// Open a class for an instrument.
    AddClass {
        name: String,
        /// Instrument id or name.
        #[arg(long)]
        instrument: String,
    },
    ListClasses,
    /// Enroll a student into an offered class.
    Enroll {
        #[arg(long)]
        student: i64,
        #[arg(long)]
        class: i64,
        /// Start date, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Change an enrollment's status (Ativa, Suspensa, Encerrada).
    SetEnrollmentStatus {
        id: i64,
        #[arg(value_parser = str::parse::<EnrollmentStatus>)]
        status: EnrollmentStatus,
        /// Last day of the enrollment, YYYY-MM-DD.
        #[arg(long)]
        end_date: Option<String>,
    },
    /// Book an individual lesson.
    ScheduleLesson {
        #[arg(long)]
        student: i64,
        #[arg(long)]
        teacher: i64,
        /// Instrument id or name.
        #[arg(long)]
        instrument: String,
        /// YYYY-MM-DD.
        #[arg(long)]
        date: String,
        /// HH:MM.
        #[arg(long)]
        start: String,
        /// HH:MM.
        #[arg(long)]
        end: String,
        #[arg(long)]
        price: Option<f64>,
    },
    ShowLesson { id: i64 },
    /// Change a lesson's status (Agendada, Concluída, Cancelada).
    SetLessonStatus {
        id: i64,
        #[arg(value_parser = str::parse::<LessonStatus>)]
        status: LessonStatus,
    },
    RemoveLesson { id: i64 },
    /// Record a paid payment.
    RegisterPayment {
        #[arg(long)]
        student: i64,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "Dinheiro")]
        method: String,
        /// Lesson settled by this payment.
        #[arg(long)]
        lesson: Option<i64>,
        /// Payment date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS); defaults to now.
        #[arg(long)]
        date: Option<String>,
    },
    /// Change a payment's status (Pago, Pendente, Estornado).
    SetPaymentStatus {
        id: i64,
        #[arg(value_parser = str::parse::<PaymentStatus>)]
        status: PaymentStatus,
    },
}

/// Execute the parsed command against the configured store.
pub fn run(command: Command, config: &Config) -> Result<()> {
    let conn = open_store(&config.db_path)?;

    match command {
        Command::Dashboard { from, to } => {
            let range = dashboard_range(from.as_deref(), to.as_deref())?;
            info!(start = %range.start, end = %range.end, "opening dashboard");
            let mut app = App::new(conn, ReportRequest::new(range))?;
            run_app(&mut app)
        }
        command => execute(&conn, command, config),
    }
}

/// Run one record command. The dashboard owns its connection and is started
/// by `run` instead.
fn execute(conn: &Connection, command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Dashboard { .. } => Err(anyhow!("the dashboard cannot run as a record command")),
        Command::Seed => {
            let inserted = seed_reference_data(conn)?;
            println!("Seeded {inserted} instrument(s).");
            Ok(())
        }
        Command::AddStudent {
            name,
            birth_date,
            gender,
            email,
            phone,
        } => {
            if let Some(birth_date) = &birth_date {
                parse_day(birth_date)?;
            }
            let student = create_student(
                conn,
                &NewStudent {
                    name,
                    birth_date,
                    gender,
                    email,
                    phone,
                },
            )?;
            info!(id = student.id, "student registered");
            println!("Student #{} {} registered.", student.id, student.name);
            Ok(())
        }
        Command::ListStudents => {
            for student in fetch_students(conn)? {
                println!(
                    "#{:<5} {:<30} {:<10} {}",
                    student.id,
                    student.name,
                    student.status,
                    student.email.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        Command::ShowStudent { id } => {
            let student = fetch_student(conn, id)?.ok_or_else(|| anyhow!("Student not found"))?;
            println!(
                "#{} {} ({}), registered {}",
                student.id, student.name, student.status, student.registered_at
            );
            for enrollment in fetch_enrollments(conn, id)? {
                println!(
                    "  enrollment #{} class #{} from {} [{}]",
                    enrollment.id,
                    enrollment.offered_class_id,
                    enrollment.start_date,
                    enrollment.status
                );
            }
            for payment in fetch_payments_for_student(conn, id)? {
                println!(
                    "  payment #{} {} {:.2} {} [{}]",
                    payment.id, payment.paid_at, payment.amount, payment.method, payment.status
                );
            }
            Ok(())
        }
        Command::SetStudentStatus { id, status } => {
            update_student_status(conn, id, status)?;
            println!("Student #{id} is now {status}.");
            Ok(())
        }
        Command::RemoveStudent { id } => {
            delete_student(conn, id)?;
            info!(id, "student removed");
            println!("Student #{id} removed.");
            Ok(())
        }
        Command::AddTeacher {
            name,
            email,
            specialization,
        } => {
            let teacher =
                create_teacher(conn, &name, email.as_deref(), specialization.as_deref())?;
            println!("Teacher #{} {} registered.", teacher.id, teacher.name);
            Ok(())
        }
        Command::SetTeacherStatus { id, status } => {
            update_teacher_status(conn, id, status)?;
            println!("Teacher #{id} is now {status}.");
            Ok(())
        }
        Command::RemoveTeacher { id } => {
            delete_teacher(conn, id)?;
            info!(id, "teacher removed");
            println!("Teacher #{id} removed.");
            Ok(())
        }
        Command::AddClass { name, instrument } => {
            let instrument_id = resolve_instrument(conn, &instrument)?;
            let class = create_offered_class(conn, &name, instrument_id)?;
            println!("Class #{} {} opened.", class.id, class.name);
            Ok(())
        }
        Command::ListClasses => {
            for class in fetch_offered_classes(conn)? {
                println!("#{:<5} {} (instrument #{})", class.id, class.name, class.instrument_id);
            }
            Ok(())
        }
        Command::Enroll {
            student,
            class,
            date,
        } => {
            let start = match date {
                Some(date) => parse_day(&date)?,
                None => Local::now().date_naive(),
            };
            let enrollment = create_enrollment(conn, student, class, &start.to_string())?;
            info!(id = enrollment.id, student, class, "student enrolled");
            println!(
                "Enrollment #{} starts on {}.",
                enrollment.id, enrollment.start_date
            );
            Ok(())
        }
        Command::SetEnrollmentStatus {
            id,
            status,
            end_date,
        } => {
            let end_date = end_date.as_deref().map(parse_day).transpose()?;
            let end_date = end_date.map(|day| day.to_string());
            update_enrollment_status(conn, id, status, end_date.as_deref())?;
            println!("Enrollment #{id} is now {status}.");
            Ok(())
        }
        Command::ScheduleLesson {
            student,
            teacher,
            instrument,
            date,
            start,
            end,
            price,
        } => {
            let lesson_date = parse_day(&date)?;
            let (start_time, end_time) = (parse_clock(&start)?, parse_clock(&end)?);
            if end_time <= start_time {
                return Err(anyhow!("lesson must end after it starts ({start} to {end})"));
            }
            let price = price.unwrap_or(config.lesson_price);
            if !price.is_finite() || price < 0.0 {
                return Err(anyhow!("lesson price cannot be negative"));
            }

            let instrument_id = resolve_instrument(conn, &instrument)?;
            let lesson = schedule_lesson(
                conn,
                &NewLesson {
                    student_id: student,
                    teacher_id: teacher,
                    instrument_id,
                    lesson_date: lesson_date.to_string(),
                    start_time: start_time.format("%H:%M").to_string(),
                    end_time: end_time.format("%H:%M").to_string(),
                    price,
                },
            )?;
            info!(id = lesson.id, "lesson scheduled");
            println!(
                "Lesson #{} scheduled for {} at {}.",
                lesson.id, lesson.lesson_date, lesson.start_time
            );
            Ok(())
        }
        Command::ShowLesson { id } => {
            let lesson = fetch_lesson(conn, id)?.ok_or_else(|| anyhow!("Lesson not found"))?;
            println!(
                "#{} {} {}-{} student #{} teacher #{} {:.2} [{}]",
                lesson.id,
                lesson.lesson_date,
                lesson.start_time,
                lesson.end_time,
                lesson.student_id,
                lesson.teacher_id,
                lesson.price,
                lesson.status
            );
            Ok(())
        }
        Command::SetLessonStatus { id, status } => {
            update_lesson_status(conn, id, status)?;
            println!("Lesson #{id} is now {status}.");
            Ok(())
        }
        Command::RemoveLesson { id } => {
            delete_lesson(conn, id)?;
            info!(id, "lesson removed");
            println!("Lesson #{id} removed.");
            Ok(())
        }
        Command::RegisterPayment {
            student,
            amount,
            method,
            lesson,
            date,
        } => {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(anyhow!("payment amount must be positive"));
            }
            let paid_at = date.as_deref().map(parse_paid_at).transpose()?;
            let payment = register_payment(
                conn,
                &NewPayment {
                    student_id: student,
                    amount,
                    method,
                    lesson_id: lesson,
                    paid_at,
                },
            )?;
            info!(id = payment.id, amount = payment.amount, "payment registered");
            println!("Payment #{} of {:.2} registered.", payment.id, payment.amount);
            Ok(())
        }
        Command::SetPaymentStatus { id, status } => {
            update_payment_status(conn, id, status)?;
            println!("Payment #{id} is now {status}.");
            Ok(())
        }
    }
}

/// Either bound may be omitted; the missing side falls back to the edges of
/// the current year.
fn dashboard_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange> {
    let year = DateRange::year_of(Local::now().date_naive());
    let range = DateRange::parse(
        &from.map(str::to_string).unwrap_or_else(|| year.start.to_string()),
        &to.map(str::to_string).unwrap_or_else(|| year.end.to_string()),
    )
    .context("invalid dashboard range")?;
    Ok(range)
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("{value:?} is not a valid YYYY-MM-DD date"))
}

fn parse_clock(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .with_context(|| format!("{value:?} is not a valid HH:MM time"))
}

/// Accepts a bare day or a full timestamp; the stored text keeps the form
/// that was given.
fn parse_paid_at(value: &str) -> Result<String> {
    let value = value.trim();
    if NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok() {
        return Ok(value.to_string());
    }
    Ok(parse_day(value)?.to_string())
}

/// Accept an instrument id or its name, ignoring case.
fn resolve_instrument(conn: &Connection, value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(id) = value.parse::<i64>() {
        return Ok(id);
    }
    let wanted = value.to_lowercase();
    fetch_instruments(conn)?
        .into_iter()
        .find(|instrument| instrument.name.to_lowercase() == wanted)
        .map(|instrument| instrument.id)
        .ok_or_else(|| anyhow!("Instrument {value} not found"))
}
