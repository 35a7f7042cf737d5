use ratatui::{
    Frame,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::models::{DayDescriptor, DayStatus, Solution};
use crate::tui::theme;

pub struct DayRow<'a> {
    pub day: &'a DayDescriptor,
    pub status: DayStatus,
    pub completed: bool,
}

pub fn render_list(frame: &mut Frame, area: Rect, rows: &[DayRow<'_>], focused_idx: usize, title: &str) {
    let block = Block::default()
        .title(Span::styled(format!(" {} ", title), theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(true))
        .style(theme::surface());

    if rows.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled("  Nothing unlocked matches", theme::dim())))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let (icon, icon_style) = if row.completed {
                ("●", theme::green())
            } else {
                ("○", theme::dim())
            };
            let name_style = if i == focused_idx {
                theme::accent().add_modifier(Modifier::BOLD)
            } else {
                theme::bold()
            };
            let badge_style = match row.status {
                DayStatus::Today => theme::amber(),
                _ => theme::dim(),
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", icon), icon_style),
                Span::styled(format!("Day {:<4}", row.day.day), name_style),
                Span::styled(format!("{:<20}", truncate(&row.day.question2.title, 19)), theme::dim()),
                Span::styled(row.status.badge(), badge_style),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(focused_idx.min(rows.len() - 1)));
    let list = List::new(items)
        .block(block)
        .highlight_symbol("▸");
    frame.render_stateful_widget(list, area, &mut state);
}

pub fn render_detail(frame: &mut Frame, area: Rect, row: Option<&DayRow<'_>>) {
    let block = Block::default()
        .title(Span::styled(" Details ", theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(false))
        .style(theme::surface());

    let Some(row) = row else {
        frame.render_widget(block, area);
        return;
    };
    let day = row.day;

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("Day {}  ", day.day), theme::bold()),
            Span::styled(day.unit.as_str(), theme::dim()),
        ]),
        Line::from(Span::styled(day.topics.join(" · "), theme::dim())),
        Line::from(""),
        Line::from(Span::styled("Question 1", theme::accent())),
        Line::from(Span::styled(day.question1.title.as_str(), theme::bold())),
    ];
    if let Some(desc) = &day.question1.description {
        lines.push(Line::from(Span::styled(desc.as_str(), theme::dim())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Question 2", theme::accent())));
    let mut q2 = vec![Span::styled(day.question2.title.as_str(), theme::bold())];
    if let Some(difficulty) = &day.question2.difficulty {
        q2.push(Span::styled(format!("  [{}]", difficulty), theme::amber()));
    }
    lines.push(Line::from(q2));
    if let Some(link) = &day.question2.link {
        lines.push(Line::from(Span::styled(link.as_str(), theme::dim())));
    }

    if let Some(solutions) = &day.solutions {
        let count = solutions
            .question1
            .iter()
            .chain(&solutions.question2)
            .filter(|s| !matches!(s, Solution::Other))
            .count();
        if count > 0 {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("{} solution resource(s) available", count),
                theme::green(),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(if row.completed {
        Line::from(Span::styled("✓ Completed  ·  [Enter] to undo", theme::green()))
    } else {
        Line::from(Span::styled("[Enter] mark as complete", theme::dim()))
    });

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
