use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::models::CalendarGrid;
use crate::tui::theme;

const WEEKDAYS: [&str; 7] = ["   ", "Mon", "   ", "Wed", "   ", "Fri", "   "];

/// Month label row: each label starts at its column, later labels win
/// when two would overlap.
fn month_row(grid: &CalendarGrid, columns: usize) -> String {
    let mut row = vec![' '; columns * 2];
    for month in &grid.months {
        let at = month.column * 2;
        for (i, ch) in month.label.chars().enumerate() {
            if let Some(slot) = row.get_mut(at + i) {
                *slot = ch;
            }
        }
    }
    row.into_iter().collect()
}

pub fn render(frame: &mut Frame, area: Rect, grid: &CalendarGrid, title: &str) {
    let block = Block::default()
        .title(Span::styled(format!(" {} ", title), theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(false))
        .style(theme::surface());

    let weeks: Vec<_> = grid.weeks().collect();
    let mut lines = vec![Line::from(vec![
        Span::styled("     ", theme::dim()),
        Span::styled(month_row(grid, weeks.len()), theme::dim()),
    ])];

    for (weekday, label) in WEEKDAYS.iter().enumerate() {
        let mut spans = vec![Span::styled(format!(" {} ", label), theme::dim())];
        for week in &weeks {
            let span = match week.get(weekday) {
                Some(cell) if cell.in_range => Span::styled("■ ", theme::level(cell.level)),
                _ => Span::raw("  "),
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let mut legend = vec![Span::styled(
        format!(
            "     {} completions on {} days   less ",
            grid.total_in_range(),
            grid.active_days()
        ),
        theme::dim(),
    )];
    for level in 0..5u8 {
        legend.push(Span::styled("■ ", theme::level(level)));
    }
    legend.push(Span::styled("more", theme::dim()));
    lines.push(Line::from(""));
    lines.push(Line::from(legend));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
