use anyhow::{anyhow, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::reports::{parse_top_n, DateRange, ReportRequest};

/// Editable copy of the dashboard filter. Values stay as text until the user
/// applies them so half-typed dates never reach the reports.
#[derive(Default, Clone)]
pub(crate) struct FilterForm {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) top_n: String,
    pub(crate) active: FilterField,
    pub(crate) error: Option<String>,
}

/// Fields available within the filter form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum FilterField {
    #[default]
    From,
    To,
    TopN,
}

impl FilterForm {
    /// Seed the form with the filter currently applied.
    pub(crate) fn from_request(request: &ReportRequest) -> Self {
        Self {
            from: request.range.start.format("%Y-%m-%d").to_string(),
            to: request.range.end.format("%Y-%m-%d").to_string(),
            top_n: request.top_n.to_string(),
            active: FilterField::From,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            FilterField::From => FilterField::To,
            FilterField::To => FilterField::TopN,
            FilterField::TopN => FilterField::From,
        };
    }

    fn field_mut(&mut self) -> &mut String {
        match self.active {
            FilterField::From => &mut self.from,
            FilterField::To => &mut self.to,
            FilterField::TopN => &mut self.top_n,
        }
    }

    /// Append a character to the active field. Dates only take digits and
    /// dashes; `top_n` also takes a leading minus so it can be rejected with
    /// a proper message instead of silently ignored.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = ch.is_ascii_digit() || ch == '-';
        if accepted {
            self.field_mut().push(ch);
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        self.field_mut().pop();
    }

    /// Validate the inputs into a new request, keeping the teacher filter of
    /// `current`.
    pub(crate) fn parse_inputs(&self, current: &ReportRequest) -> Result<ReportRequest> {
        if self.from.trim().is_empty() || self.to.trim().is_empty() {
            return Err(anyhow!("Both dates are required."));
        }
        let range = DateRange::parse(&self.from, &self.to).context("Dates must be YYYY-MM-DD.")?;
        let top_n = parse_top_n(&self.top_n).context("Top N must be a whole number.")?;
        Ok(ReportRequest {
            range,
            top_n,
            ..*current
        })
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field_name: &str, field: FilterField) -> Line<'static> {
        let value = match field {
            FilterField::From => &self.from,
            FilterField::To => &self.to,
            FilterField::TopN => &self.top_n,
        };
        let is_active = self.active == field;

        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: FilterField) -> usize {
        match field {
            FilterField::From => self.from.chars().count(),
            FilterField::To => self.to.chars().count(),
            FilterField::TopN => self.top_n.chars().count(),
        }
    }
}
