use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::{error, info};

use crate::db::fetch_teacher_names;
use crate::reports::{ReportCategory, ReportData, ReportRequest};

use super::forms::{FilterField, FilterForm};
use super::helpers::{centered_rect, surface_error};
use super::screens::draw_report;

/// Header space for the tab strip and the active filter.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// Fine-grained modes layered over the dashboard.
enum Mode {
    Normal,
    EditingFilter(FilterForm),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Dashboard state: the shared filter, the selected report category and the
/// last data computed for it.
pub struct App {
    conn: Connection,
    request: ReportRequest,
    selected: usize,
    data: Option<ReportData>,
    /// `(id, name)` pairs the teacher filter cycles through.
    teachers: Vec<(i64, String)>,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Build the dashboard and compute the first category right away.
    /// Nothing read from the store can stop the dashboard from opening;
    /// failures are reported in the footer.
    pub fn new(conn: Connection, request: ReportRequest) -> Result<Self> {
        let mut app = Self {
            conn,
            request,
            selected: 0,
            data: None,
            teachers: Vec::new(),
            mode: Mode::Normal,
            status: None,
        };
        app.reload_teachers();
        app.refresh();
        Ok(app)
    }

    fn reload_teachers(&mut self) {
        match fetch_teacher_names(&self.conn) {
            Ok(teachers) => self.teachers = teachers,
            Err(err) => {
                error!(error = %err, "teacher list failed to load");
                self.set_status(
                    format!("Failed to load teachers: {}", surface_error(&err)),
                    StatusKind::Error,
                );
            }
        }
    }

    fn category(&self) -> ReportCategory {
        ReportCategory::ALL[self.selected]
    }

    /// Re-run the reports of the visible category. Failures land in the
    /// footer; the previous data is dropped so stale numbers never show.
    fn refresh(&mut self) {
        match self.category().refresh(&self.conn, &self.request) {
            Ok(data) => self.data = Some(data),
            Err(err) => {
                error!(error = %err, category = self.category().title(), "report refresh failed");
                self.data = None;
                self.set_status(format!("Failed to load reports: {err}"), StatusKind::Error);
            }
        }
    }

    /// Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::EditingFilter(form) => self.handle_filter_key(code, form)?,
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Right | KeyCode::Tab => self.select_category(1),
            KeyCode::Left | KeyCode::BackTab => self.select_category(-1),
            KeyCode::Char(ch @ '1'..='5') => {
                self.selected = ch as usize - '1' as usize;
                self.clear_status();
                self.refresh();
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.clear_status();
                return Ok(Mode::EditingFilter(FilterForm::from_request(&self.request)));
            }
            KeyCode::Char('t') | KeyCode::Char('T') => self.cycle_teacher()?,
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.clear_status();
                self.reload_teachers();
                self.refresh();
                if self.status.is_none() {
                    self.set_status("Reports reloaded.", StatusKind::Info);
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_filter_key(&mut self, code: KeyCode, mut form: FilterForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.clear_status();
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => form.next_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                if !form.push_char(ch) {
                    form.error = Some("Only digits and '-' are allowed.".to_string());
                }
            }
            KeyCode::Enter => match form.parse_inputs(&self.request) {
                Ok(request) => {
                    self.apply_request(request);
                    return Ok(Mode::Normal);
                }
                Err(err) => form.error = Some(surface_error(&err)),
            },
            _ => {}
        }
        Ok(Mode::EditingFilter(form))
    }

    fn apply_request(&mut self, request: ReportRequest) {
        info!(
            start = %request.range.start,
            end = %request.range.end,
            top_n = request.top_n,
            "filter applied"
        );
        self.request = request;
        self.refresh();
        if self.data.is_some() {
            let message = if request.range.is_inverted() {
                "Start date is after end date; nothing matches."
            } else {
                "Filter applied."
            };
            let kind = if request.range.is_inverted() {
                StatusKind::Error
            } else {
                StatusKind::Info
            };
            self.set_status(message, kind);
        }
    }

    fn select_category(&mut self, offset: isize) {
        let count = ReportCategory::ALL.len() as isize;
        self.selected = (self.selected as isize + offset).rem_euclid(count) as usize;
        self.clear_status();
        self.refresh();
    }

    /// Step the teacher filter through every teacher and back to "all".
    fn cycle_teacher(&mut self) -> Result<()> {
        if self.teachers.is_empty() {
            self.set_status("No teachers registered.", StatusKind::Error);
            return Ok(());
        }

        let next = match self.request.teacher_id {
            None => Some(0),
            Some(id) => self
                .teachers
                .iter()
                .position(|(teacher_id, _)| *teacher_id == id)
                .map(|idx| idx + 1)
                .filter(|idx| *idx < self.teachers.len()),
        };
        self.request.teacher_id = next.map(|idx| self.teachers[idx].0);
        self.refresh();

        let label = self.teacher_label();
        self.set_status(format!("Teacher filter: {label}"), StatusKind::Info);
        Ok(())
    }

    fn teacher_label(&self) -> String {
        match self.request.teacher_id {
            None => "all teachers".to_string(),
            Some(id) => self
                .teachers
                .iter()
                .find(|(teacher_id, _)| *teacher_id == id)
                .map(|(_, name)| name.clone())
                .unwrap_or_else(|| format!("#{id}")),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        match &self.data {
            Some(data) => draw_report(frame, chunks[1], data),
            None => {
                let message = Paragraph::new("Reports unavailable. Press 'r' to retry.")
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(message, chunks[1]);
            }
        }
        self.draw_footer(frame, chunks[2]);

        if let Mode::EditingFilter(form) = &self.mode {
            self.draw_filter_form(frame, area, form);
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ReportCategory::ALL
            .iter()
            .enumerate()
            .map(|(idx, category)| Line::from(format!("{} {}", idx + 1, category.title())))
            .collect();

        let range = &self.request.range;
        let title = format!(
            " Academia Maestro | {} to {} | {} | top {} ",
            range.start.format("%d/%m/%Y"),
            range.end.format("%d/%m/%Y"),
            self.teacher_label(),
            self.request.top_n,
        );

        let tabs = Tabs::new(titles)
            .select(self.selected)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match &self.mode {
            Mode::EditingFilter(_) => Line::from(vec![
                Span::styled("[Tab]", key_style),
                Span::raw(" Next field   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Apply   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            Mode::Normal => Line::from(vec![
                Span::styled("[←→/1-5]", key_style),
                Span::raw(" Category   "),
                Span::styled("[f]", key_style),
                Span::raw(" Filter   "),
                Span::styled("[t]", key_style),
                Span::raw(" Teacher   "),
                Span::styled("[r]", key_style),
                Span::raw(" Reload   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_filter_form(&self, frame: &mut Frame, area: Rect, form: &FilterForm) {
        let popup_area = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Filter").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("From", FilterField::From),
            form.build_line("To", FilterField::To),
            form.build_line("Top N", FilterField::TopN),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Dates as YYYY-MM-DD, both ends included.",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let (prefix, row) = match form.active {
            FilterField::From => ("From: ", 0),
            FilterField::To => ("To: ", 1),
            FilterField::TopN => ("Top N: ", 2),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x, inner.y + row));
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_teacher, open_in_memory_store};
    use crate::reports::DateRange;

    fn app() -> App {
        let conn = open_in_memory_store().unwrap();
        create_teacher(&conn, "Ana Silva", None, Some("Violão")).unwrap();
        create_teacher(&conn, "Carlos Mendes", None, Some("Teclado")).unwrap();
        App::new(conn, ReportRequest::new(DateRange::year(2024))).unwrap()
    }

    #[test]
    fn categories_wrap_around() {
        let mut app = app();
        app.handle_key(KeyCode::Left).unwrap();
        assert_eq!(app.category(), ReportCategory::Teachers);
        assert!(matches!(app.data, Some(ReportData::Teachers(_))));
        app.handle_key(KeyCode::Right).unwrap();
        assert_eq!(app.category(), ReportCategory::Overview);
    }

    #[test]
    fn teacher_filter_cycles_back_to_all() {
        let mut app = app();
        let ids: Vec<i64> = app.teachers.iter().map(|(id, _)| *id).collect();
        app.handle_key(KeyCode::Char('t')).unwrap();
        assert_eq!(app.request.teacher_id, Some(ids[0]));
        app.handle_key(KeyCode::Char('t')).unwrap();
        assert_eq!(app.request.teacher_id, Some(ids[1]));
        app.handle_key(KeyCode::Char('t')).unwrap();
        assert_eq!(app.request.teacher_id, None);
    }

    #[test]
    fn invalid_filter_keeps_the_form_open() {
        let mut app = app();
        app.handle_key(KeyCode::Char('f')).unwrap();
        for _ in 0..10 {
            app.handle_key(KeyCode::Backspace).unwrap();
        }
        app.handle_key(KeyCode::Enter).unwrap();
        match &app.mode {
            Mode::EditingFilter(form) => assert!(form.error.is_some()),
            Mode::Normal => panic!("form should stay open"),
        }
        assert_eq!(app.request.range, DateRange::year(2024));
    }

    #[test]
    fn applying_a_filter_updates_the_request() {
        let mut app = app();
        app.handle_key(KeyCode::Char('f')).unwrap();
        app.handle_key(KeyCode::Tab).unwrap();
        for _ in 0..10 {
            app.handle_key(KeyCode::Backspace).unwrap();
        }
        for ch in "2024-06-30".chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
        assert!(!app.handle_key(KeyCode::Enter).unwrap());
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.request.range, DateRange::parse("2024-01-01", "2024-06-30").unwrap());
    }

    #[test]
    fn q_quits() {
        let mut app = app();
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn unknown_teacher_status_does_not_block_the_dashboard() {
        let conn = open_in_memory_store().unwrap();
        conn.execute(
            "INSERT INTO teachers (name, status) VALUES ('Ana Silva', 'ativo')",
            [],
        )
        .unwrap();

        let mut app = App::new(conn, ReportRequest::new(DateRange::year(2024))).unwrap();
        assert_eq!(app.teachers.len(), 1);
        assert!(app.data.is_some());

        assert!(!app.handle_key(KeyCode::Char('r')).unwrap());
        assert!(matches!(
            app.status,
            Some(StatusMessage { kind: StatusKind::Info, .. })
        ));
        app.handle_key(KeyCode::Char('t')).unwrap();
        assert_eq!(app.teacher_label(), "Ana Silva");
    }

    #[test]
    fn failed_reload_lands_in_the_footer() {
        let mut app = app();
        app.conn.execute("DROP TABLE teachers", []).unwrap();

        assert!(!app.handle_key(KeyCode::Char('r')).unwrap());
        assert!(matches!(
            app.status,
            Some(StatusMessage { kind: StatusKind::Error, .. })
        ));
        assert_eq!(app.teachers.len(), 2);
    }
}
