//! Rendering for each report category. Every function takes an already
//! computed snapshot; nothing here touches the database.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::reports::{
    FinanceSnapshot, Heatmap, LessonsSnapshot, MonthlyCount, MonthlyRevenue, NamedCount,
    NamedTotal, OverviewSnapshot, ReportData, StatementLine, StudentsSnapshot, TeachersSnapshot,
};

use super::helpers::{format_currency, format_percentage, text_bar};

const KPI_HEIGHT: u16 = 4;
const EMPTY_MESSAGE: &str = "No data for this range.";

pub(crate) fn draw_report(frame: &mut Frame, area: Rect, data: &ReportData) {
    match data {
        ReportData::Overview(snapshot) => draw_overview(frame, area, snapshot),
        ReportData::Students(snapshot) => draw_students(frame, area, snapshot),
        ReportData::Lessons(snapshot) => draw_lessons(frame, area, snapshot),
        ReportData::Finance(snapshot) => draw_finance(frame, area, snapshot),
        ReportData::Teachers(snapshot) => draw_teachers(frame, area, snapshot),
    }
}

fn draw_overview(frame: &mut Frame, area: Rect, snapshot: &OverviewSnapshot) {
    let [kpis, body] = split_kpis(area);
    draw_kpis(
        frame,
        kpis,
        &[
            ("Active students", snapshot.active_students.to_string()),
            ("Revenue", format_currency(snapshot.revenue)),
            ("Completed lessons", snapshot.completed_lessons.to_string()),
        ],
    );

    let columns = split_even(body, Direction::Horizontal, 2);
    draw_monthly_revenue(frame, columns[0], "Monthly revenue", &snapshot.monthly_revenue);
    draw_named_counts(
        frame,
        columns[1],
        "Lessons per instrument",
        "Instrument",
        &snapshot.popularity,
    );
}

fn draw_students(frame: &mut Frame, area: Rect, snapshot: &StudentsSnapshot) {
    let [kpis, body] = split_kpis(area);
    draw_kpis(
        frame,
        kpis,
        &[
            ("Active students", snapshot.active.to_string()),
            ("All students", snapshot.total.to_string()),
            ("Inactive (lifetime)", snapshot.churn.inactive.to_string()),
            ("Churn rate", format_percentage(snapshot.churn.rate)),
        ],
    );

    let rows = split_even(body, Direction::Vertical, 2);
    let columns = split_even(rows[0], Direction::Horizontal, 2);
    draw_monthly_counts(frame, columns[0], "New enrollments", &snapshot.new_enrollments);
    draw_monthly_counts(
        frame,
        columns[1],
        "New registrations",
        &snapshot.new_registrations,
    );
    draw_table(
        frame,
        rows[1],
        "Students",
        &["Id", "Name", "Email", "Phone", "Registered", "Status"],
        snapshot
            .roster
            .iter()
            .map(|row| {
                vec![
                    row.id.to_string(),
                    row.name.clone(),
                    row.email.clone().unwrap_or_default(),
                    row.phone.clone().unwrap_or_default(),
                    row.registered_at.clone(),
                    row.status.clone(),
                ]
            })
            .collect(),
        &[
            Constraint::Length(6),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Length(16),
            Constraint::Length(20),
            Constraint::Min(9),
        ],
    );
}

fn draw_lessons(frame: &mut Frame, area: Rect, snapshot: &LessonsSnapshot) {
    let [kpis, body] = split_kpis(area);
    let total: i64 = snapshot.by_status.iter().map(|row| row.count).sum();
    draw_kpis(
        frame,
        kpis,
        &[
            ("Lessons in range", total.to_string()),
            ("Lessons per active day", format!("{:.2}", snapshot.average_per_day)),
        ],
    );

    let rows = split_even(body, Direction::Vertical, 2);
    let top = split_even(rows[0], Direction::Horizontal, 3);
    draw_table(
        frame,
        top[0],
        "By status",
        &["Status", "Lessons"],
        snapshot
            .by_status
            .iter()
            .map(|row| vec![row.status.clone(), row.count.to_string()])
            .collect(),
        &[Constraint::Percentage(60), Constraint::Percentage(40)],
    );
    draw_named_counts(frame, top[1], "Popularity", "Instrument", &snapshot.popularity);
    draw_named_counts(frame, top[2], "Completed per teacher", "Teacher", &snapshot.by_teacher);
    draw_heatmap(frame, rows[1], &snapshot.heatmap);
}

fn draw_finance(frame: &mut Frame, area: Rect, snapshot: &FinanceSnapshot) {
    let [kpis, body] = split_kpis(area);
    let pending_total: f64 = snapshot.pending.iter().map(|row| row.price).sum();
    draw_kpis(
        frame,
        kpis,
        &[
            ("Revenue", format_currency(snapshot.total)),
            ("Paid payments", snapshot.paid_count.to_string()),
            ("Average ticket", format_currency(snapshot.average_ticket)),
            ("Lessons awaiting payment", snapshot.pending.len().to_string()),
            ("Pending value", format_currency(pending_total)),
        ],
    );

    let rows = split_even(body, Direction::Vertical, 3);
    let top = split_even(rows[0], Direction::Horizontal, 2);
    let middle = split_even(rows[1], Direction::Horizontal, 3);
    draw_monthly_revenue(frame, top[0], "Monthly revenue", &snapshot.monthly);
    draw_named_totals(
        frame,
        top[1],
        "Revenue per instrument",
        "Instrument",
        &snapshot.by_instrument,
    );
    draw_named_totals(
        frame,
        middle[0],
        "Revenue per teacher",
        "Teacher",
        &snapshot.by_teacher,
    );
    draw_named_totals(frame, middle[1], "Top students", "Student", &snapshot.top_students);
    draw_statement(frame, rows[2], &snapshot.statement);
    draw_table(
        frame,
        middle[2],
        "Pending payment",
        &["Date", "Student", "Teacher", "Price"],
        snapshot
            .pending
            .iter()
            .map(|row| {
                vec![
                    row.lesson_date.format("%d/%m/%Y").to_string(),
                    row.student.clone().unwrap_or_else(|| "?".into()),
                    row.teacher.clone().unwrap_or_else(|| "?".into()),
                    format_currency(row.price),
                ]
            })
            .collect(),
        &[
            Constraint::Length(10),
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Min(10),
        ],
    );
}

fn draw_statement(frame: &mut Frame, area: Rect, lines: &[StatementLine]) {
    draw_table(
        frame,
        area,
        "Payment statement",
        &["Id", "Paid at", "Student", "Amount", "Method", "Status"],
        lines
            .iter()
            .map(|line| {
                vec![
                    line.payment_id.to_string(),
                    line.paid_at.clone(),
                    line.student.clone().unwrap_or_else(|| "?".into()),
                    format_currency(line.amount),
                    line.method.clone(),
                    line.status.clone(),
                ]
            })
            .collect(),
        &[
            Constraint::Length(6),
            Constraint::Length(20),
            Constraint::Percentage(30),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    );
}

fn draw_teachers(frame: &mut Frame, area: Rect, snapshot: &TeachersSnapshot) {
    let [kpis, body] = split_kpis(area);
    let hours: f64 = snapshot.load.iter().map(|row| row.hours).sum();
    draw_kpis(
        frame,
        kpis,
        &[
            ("Active teachers", snapshot.active_teachers.to_string()),
            ("Hours taught", format!("{hours:.1}")),
        ],
    );

    let columns = split_even(body, Direction::Horizontal, 3);
    draw_table(
        frame,
        columns[0],
        "Teaching load",
        &["Teacher", "Lessons", "Hours", "Flagged"],
        snapshot
            .load
            .iter()
            .map(|row| {
                vec![
                    row.teacher.clone(),
                    row.lessons.to_string(),
                    format!("{:.1}", row.hours),
                    row.invalid_durations.to_string(),
                ]
            })
            .collect(),
        &[
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ],
    );
    draw_table(
        frame,
        columns[1],
        "Instruments taught",
        &["Teacher", "Instruments"],
        snapshot
            .instruments
            .iter()
            .map(|row| vec![row.teacher.clone(), row.instruments.clone()])
            .collect(),
        &[Constraint::Percentage(40), Constraint::Percentage(60)],
    );
    draw_table(
        frame,
        columns[2],
        "Booked slots ([t] picks teacher)",
        &["Date", "Start", "End"],
        snapshot
            .availability
            .iter()
            .map(|slot| {
                vec![
                    slot.date.format("%d/%m/%Y").to_string(),
                    slot.start_time.clone(),
                    slot.end_time.clone(),
                ]
            })
            .collect(),
        &[Constraint::Length(10), Constraint::Length(8), Constraint::Length(8)],
    );
}

fn draw_heatmap(frame: &mut Frame, area: Rect, heatmap: &Heatmap) {
    let block = Block::default().borders(Borders::ALL).title("Peak hours");
    if heatmap.is_empty() {
        frame.render_widget(Paragraph::new(EMPTY_MESSAGE).block(block), area);
        return;
    }

    let max = heatmap.max();
    let mut header = vec![String::new()];
    header.extend(heatmap.hours.iter().map(|hour| format!("{hour:02}h")));

    let rows = heatmap.rows.iter().map(|(day, cells)| {
        let mut row = vec![Cell::from(day.to_string())];
        row.extend(cells.iter().map(|count| {
            Cell::from(count.to_string()).style(heat_style(*count, max))
        }));
        Row::new(row)
    });

    let mut widths = vec![Constraint::Length(4)];
    widths.extend(heatmap.hours.iter().map(|_| Constraint::Length(4)));

    let table = Table::new(rows, widths)
        .header(Row::new(header).style(header_style()))
        .block(block);
    frame.render_widget(table, area);
}

/// Cooler colours for quiet slots, warmer for busy ones.
fn heat_style(count: i64, max: i64) -> Style {
    if count == 0 || max == 0 {
        return Style::default().fg(Color::DarkGray);
    }
    let ratio = count as f64 / max as f64;
    let color = if ratio > 0.75 {
        Color::Red
    } else if ratio > 0.4 {
        Color::Yellow
    } else {
        Color::Green
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn draw_monthly_revenue(frame: &mut Frame, area: Rect, title: &str, rows: &[MonthlyRevenue]) {
    let max = rows.iter().map(|row| row.total).fold(0.0, f64::max);
    draw_table(
        frame,
        area,
        title,
        &["Month", "Revenue", ""],
        rows.iter()
            .map(|row| {
                vec![
                    row.month.clone(),
                    format_currency(row.total),
                    text_bar(row.total, max),
                ]
            })
            .collect(),
        &bar_widths(),
    );
}

fn draw_monthly_counts(frame: &mut Frame, area: Rect, title: &str, rows: &[MonthlyCount]) {
    let max = rows.iter().map(|row| row.count).max().unwrap_or(0) as f64;
    draw_table(
        frame,
        area,
        title,
        &["Month", "Count", ""],
        rows.iter()
            .map(|row| {
                vec![
                    row.month.clone(),
                    row.count.to_string(),
                    text_bar(row.count as f64, max),
                ]
            })
            .collect(),
        &bar_widths(),
    );
}

fn draw_named_counts(frame: &mut Frame, area: Rect, title: &str, label: &str, rows: &[NamedCount]) {
    let max = rows.first().map(|row| row.count).unwrap_or(0) as f64;
    draw_table(
        frame,
        area,
        title,
        &[label, "Lessons", ""],
        rows.iter()
            .map(|row| {
                vec![
                    row.name.clone(),
                    row.count.to_string(),
                    text_bar(row.count as f64, max),
                ]
            })
            .collect(),
        &bar_widths(),
    );
}

fn draw_named_totals(frame: &mut Frame, area: Rect, title: &str, label: &str, rows: &[NamedTotal]) {
    let max = rows.first().map(|row| row.total).unwrap_or(0.0);
    draw_table(
        frame,
        area,
        title,
        &[label, "Total", ""],
        rows.iter()
            .map(|row| vec![row.name.clone(), format_currency(row.total), text_bar(row.total, max)])
            .collect(),
        &bar_widths(),
    );
}

fn bar_widths() -> [Constraint; 3] {
    [
        Constraint::Percentage(30),
        Constraint::Percentage(30),
        Constraint::Percentage(40),
    ]
}

fn draw_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    header: &[&str],
    rows: Vec<Vec<String>>,
    widths: &[Constraint],
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    if rows.is_empty() {
        let empty = Span::styled(EMPTY_MESSAGE, Style::default().fg(Color::DarkGray));
        let message = Paragraph::new(empty).block(block);
        frame.render_widget(message, area);
        return;
    }

    let table = Table::new(rows.into_iter().map(Row::new), widths.to_vec())
        .header(Row::new(header.iter().map(|h| h.to_string())).style(header_style()))
        .block(block);
    frame.render_widget(table, area);
}

fn draw_kpis(frame: &mut Frame, area: Rect, cards: &[(&str, String)]) {
    let slots = split_even(area, Direction::Horizontal, cards.len());
    for ((title, value), slot) in cards.iter().zip(slots.iter()) {
        let card = Paragraph::new(vec![
            Line::from(Span::styled(*title, Style::default().fg(Color::Gray))),
            Line::from(Span::styled(
                value.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ])
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(card, *slot);
    }
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

fn split_kpis(area: Rect) -> [Rect; 2] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(KPI_HEIGHT), Constraint::Min(0)])
        .split(area);
    [chunks[0], chunks[1]]
}

fn split_even(area: Rect, direction: Direction, parts: usize) -> Vec<Rect> {
    let parts = parts.max(1) as u32;
    Layout::default()
        .direction(direction)
        .constraints((0..parts).map(|_| Constraint::Ratio(1, parts)))
        .split(area)
        .to_vec()
}
