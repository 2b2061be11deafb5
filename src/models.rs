//! Domain models that mirror the SQLite schema. They stay light-weight data
//! holders; persistence lives in `db` and aggregation in `reports`.
//!
//! Status columns are stored with the labels the school has always used in
//! its spreadsheets ("Ativo", "Concluída", ...), so every status enum maps to
//! and from that text.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Raised when a stored or user-supplied status label is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown {kind} status: {value:?}")]
    UnknownStatus { kind: &'static str, value: String },
}

/// Generates `as_str`, `Display` and `FromStr` for a status enum backed by a
/// fixed label per variant.
macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Label persisted in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $($label => Ok($name::$variant),)+
                    other => Err(ModelError::UnknownStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

status_enum!(
    /// Whether a student is still attending. Drives active counts and churn.
    StudentStatus, "student", {
        Active => "Ativo",
        Inactive => "Inativo",
    }
);

status_enum!(
    TeacherStatus, "teacher", {
        Active => "Ativo",
        Inactive => "Inativo",
    }
);

status_enum!(
    EnrollmentStatus, "enrollment", {
        Active => "Ativa",
        Suspended => "Suspensa",
        Finished => "Encerrada",
    }
);

status_enum!(
    /// Lifecycle of a scheduled lesson. Only `Completed` lessons count as
    /// teaching load.
    LessonStatus, "lesson", {
        Scheduled => "Agendada",
        Completed => "Concluída",
        Cancelled => "Cancelada",
    }
);

status_enum!(
    /// Only `Paid` payments count towards revenue.
    PaymentStatus, "payment", {
        Paid => "Pago",
        Pending => "Pendente",
        Refunded => "Estornado",
    }
);

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: i64,
    pub name: String,
    /// Raw text; rows imported from spreadsheets may hold anything here.
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS` when written by this application.
    pub registered_at: String,
    pub status: StudentStatus,
}

/// Fields required to register a new student.
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub name: String,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Teacher {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub status: TeacherStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Entry of the class catalog, always tied to one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedClass {
    pub id: i64,
    pub name: String,
    pub instrument_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub offered_class_id: i64,
    pub start_date: String,
    pub end_date: Option<String>,
    pub status: EnrollmentStatus,
}

/// Central fact table row. Dates and times are kept as stored text because
/// reports must be able to skip rows that do not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledLesson {
    pub id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub instrument_id: i64,
    pub lesson_date: String,
    pub start_time: String,
    pub end_time: String,
    pub price: f64,
    pub status: LessonStatus,
    pub notes: String,
}

/// Input for `db::schedule_lesson`.
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub student_id: i64,
    pub teacher_id: i64,
    pub instrument_id: i64,
    pub lesson_date: String,
    pub start_time: String,
    pub end_time: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub student_id: i64,
    pub paid_at: String,
    pub amount: f64,
    pub method: String,
    /// Lesson this payment settles, if any. Revenue by instrument and by
    /// teacher only sees payments that resolve through this reference.
    pub lesson_id: Option<i64>,
    pub status: PaymentStatus,
    pub notes: String,
}

/// Input for `db::register_payment`.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: i64,
    pub amount: f64,
    pub method: String,
    pub lesson_id: Option<i64>,
    /// Defaults to the current local timestamp when absent.
    pub paid_at: Option<String>,
}
