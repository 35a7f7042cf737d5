use ratatui::{
    Frame,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::models::DerivedStats;
use crate::tui::theme;
use crate::utils::format::{format_percent, progress_bar};

pub fn render(frame: &mut Frame, area: Rect, stats: &DerivedStats) {
    let block = Block::default()
        .title(Span::styled(" Progress ", theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(false))
        .style(theme::surface());

    let bar = progress_bar(stats.completed_count, stats.unlocked_day_count, 20);

    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  ", theme::dim()),
            Span::styled(bar, theme::green()),
            Span::styled(
                format!("  {}", format_percent(stats.percent_complete)),
                theme::green().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Completed  ", theme::dim()),
            Span::styled(
                format!("{}/{}", stats.completed_count, stats.unlocked_day_count),
                theme::bold(),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Streak     ", theme::dim()),
            Span::styled(
                format!("{} days", stats.current_streak),
                theme::amber().add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(text).block(block), area);
}
