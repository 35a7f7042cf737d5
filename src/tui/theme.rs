use ratatui::style::{Color, Modifier, Style};

pub const BG: Color = Color::Rgb(13, 17, 23);
pub const SURFACE: Color = Color::Rgb(22, 27, 34);
pub const BORDER: Color = Color::Rgb(48, 54, 61);
pub const TEXT: Color = Color::Rgb(230, 237, 243);
pub const TEXT_DIM: Color = Color::Rgb(125, 133, 144);
pub const ACCENT: Color = Color::Rgb(88, 166, 255);
pub const GREEN: Color = Color::Rgb(63, 185, 80);
pub const AMBER: Color = Color::Rgb(210, 153, 34);
pub const RED: Color = Color::Rgb(248, 81, 73);

/// Heatmap shades, index = activity level.
pub const LEVELS: [Color; 5] = [
    Color::Rgb(33, 38, 45),
    Color::Rgb(14, 68, 41),
    Color::Rgb(0, 109, 50),
    Color::Rgb(38, 166, 65),
    Color::Rgb(57, 211, 83),
];

pub fn base() -> Style {
    Style::default().fg(TEXT).bg(BG)
}

pub fn surface() -> Style {
    Style::default().fg(TEXT).bg(SURFACE)
}

pub fn dim() -> Style {
    Style::default().fg(TEXT_DIM)
}

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn green() -> Style {
    Style::default().fg(GREEN)
}

pub fn amber() -> Style {
    Style::default().fg(AMBER)
}

pub fn red() -> Style {
    Style::default().fg(RED)
}

pub fn bold() -> Style {
    Style::default().fg(TEXT).add_modifier(Modifier::BOLD)
}

pub fn border(focused: bool) -> Style {
    if focused {
        accent()
    } else {
        Style::default().fg(BORDER)
    }
}

pub fn level(level: u8) -> Style {
    let shade = LEVELS[(level as usize).min(LEVELS.len() - 1)];
    Style::default().fg(shade)
}
