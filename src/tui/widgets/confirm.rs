use ratatui::{
    Frame,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::tui::theme;

/// Centered popup asking the user to type the confirmation phrase.
pub fn render(frame: &mut Frame, expected: &str, input: &str, error: Option<&str>) {
    let area = frame.area();
    let height = if error.is_some() { 8 } else { 6 };
    let popup = Rect {
        x: area.width / 4,
        y: (area.height / 2).saturating_sub(4),
        width: area.width / 2,
        height: height.min(area.height),
    };

    frame.render_widget(Clear, popup);

    let mut text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Type ", theme::dim()),
            Span::styled(format!("\"{}\"", expected), theme::bold()),
            Span::styled(" to mark it complete", theme::dim()),
        ]),
        Line::from(vec![
            Span::styled("  > ", theme::dim()),
            Span::styled(input, theme::accent().add_modifier(Modifier::BOLD)),
            Span::styled("█", theme::amber()),
        ]),
        Line::from(Span::styled("  [Enter] confirm  ·  [Esc] cancel", theme::dim())),
    ];

    if let Some(err) = error {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(format!("  ✗ {}", err), theme::red())));
    }

    let block = Block::default()
        .title(Span::styled(" Confirm completion ", theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if error.is_some() { theme::red() } else { theme::amber() })
        .style(theme::surface());

    frame.render_widget(Paragraph::new(text).block(block), popup);
}
