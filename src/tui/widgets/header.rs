use chrono::{DateTime, FixedOffset};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::challenge::TOTAL_DAYS;
use crate::tui::theme;
use crate::utils::format::{format_countdown, format_unlock};

pub struct HeaderInfo<'a> {
    pub student: &'a str,
    pub unlocked: u32,
    pub next_unlock: Option<DateTime<FixedOffset>>,
    pub seconds_until_next: Option<i64>,
}

pub fn render(frame: &mut Frame, area: Rect, info: &HeaderInfo<'_>) {
    let title_line = Line::from(vec![
        Span::styled("  100 Days of Code  ", theme::accent().add_modifier(Modifier::BOLD)),
        Span::styled(info.student, theme::dim()),
    ]);

    let day_span = if info.unlocked == 0 {
        Span::styled("Challenge has not started", theme::amber())
    } else {
        Span::styled(
            format!("Day {} of {}", info.unlocked, TOTAL_DAYS),
            theme::bold(),
        )
    };

    let countdown_spans = match (info.next_unlock, info.seconds_until_next) {
        (Some(at), Some(secs)) => vec![
            Span::styled("  ·  next unlock in ", theme::dim()),
            Span::styled(format_countdown(secs), theme::green().add_modifier(Modifier::BOLD)),
            Span::styled(format!("  ({})", format_unlock(at)), theme::dim()),
        ],
        _ => vec![Span::styled("  ·  every day is open", theme::green())],
    };

    let mut status_line = vec![day_span];
    status_line.extend(countdown_spans);

    let text = vec![title_line, Line::from(""), Line::from(status_line)];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::accent())
        .style(theme::base());

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
