use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Width of the longest text bar drawn next to a value.
const BAR_WIDTH: usize = 24;

/// Brazilian currency notation: `R$ 1.234,50`.
pub(crate) fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "R$ 0,00".to_string();
    }
    let cents = (value.abs() * 100.0).round() as u64;
    let (units, cents) = (cents / 100, cents % 100);

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && (units > 0 || cents > 0) { "-" } else { "" };
    format!("{sign}R$ {grouped},{cents:02}")
}

pub(crate) fn format_percentage(value: f64) -> String {
    format!("{value:.2}%")
}

/// Horizontal bar proportional to `value / max`, for chart-like rows.
pub(crate) fn text_bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * BAR_WIDTH as f64).round().max(1.0) as usize;
    "█".repeat(filled.min(BAR_WIDTH))
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_uses_brazilian_separators() {
        assert_eq!(format_currency(1234.5), "R$ 1.234,50");
        assert_eq!(format_currency(1234.567), "R$ 1.234,57");
        assert_eq!(format_currency(100.0), "R$ 100,00");
        assert_eq!(format_currency(0.0), "R$ 0,00");
        assert_eq!(format_currency(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(format_currency(-75.0), "-R$ 75,00");
        assert_eq!(format_currency(f64::NAN), "R$ 0,00");
    }

    #[test]
    fn bars_scale_to_the_maximum() {
        assert_eq!(text_bar(10.0, 10.0).chars().count(), BAR_WIDTH);
        assert_eq!(text_bar(0.1, 10.0).chars().count(), 1);
        assert!(text_bar(0.0, 10.0).is_empty());
    }

    #[test]
    fn surfaced_error_is_the_root_cause() {
        let err = anyhow::anyhow!("Dates must be YYYY-MM-DD.").context("failed to apply filter");
        assert_eq!(surface_error(&err), "Dates must be YYYY-MM-DD.");
    }
}
