use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::challenge::sync::SyncError;
use crate::tui::theme;

pub fn render(frame: &mut Frame, area: Rect, error: Option<&SyncError>) {
    if let Some(err) = error {
        let mut spans = vec![
            Span::styled("✗ ", theme::red()),
            Span::styled(err.to_string(), theme::red()),
        ];
        if err.is_retryable() {
            spans.push(Span::styled("  ·  [r] retry", theme::dim()));
        }
        let line = Line::from(spans);
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
        return;
    }

    let hints = [
        ("[Enter]", " toggle  "),
        ("[f]", " unit  "),
        ("[/]", " search  "),
        ("[c]", " calendar  "),
        ("[r]", " refresh  "),
        ("[?]", " help  "),
        ("[Esc]", " quit"),
    ];

    let mut spans = Vec::new();
    for (key, label) in &hints {
        spans.push(Span::styled(*key, theme::accent()));
        spans.push(Span::styled(*label, theme::dim()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
