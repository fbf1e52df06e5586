use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Shortens `text` to `max` characters, keeping both ends.
pub fn truncate_middle(text: &str, max: usize) -> String {
    let len = text.chars().count();
    if len <= max || max < 5 {
        return text.chars().take(max.max(1)).collect();
    }
    let keep = max - 3;
    let head = keep.div_ceil(2);
    let tail = keep - head;
    let start = text.chars().take(head).collect::<String>();
    let end = text.chars().skip(len - tail).collect::<String>();
    format!("{start}...{end}")
}

pub fn share_style(label: &str) -> Style {
    match label {
        "HTML" => Style::default().fg(Color::LightRed),
        "CSS" => Style::default().fg(Color::LightBlue),
        "JavaScript" => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Gray),
    }
    .bg(Color::Black)
    .add_modifier(Modifier::BOLD)
}

/// Number of lines a scrollable view can move through.
pub fn max_scroll(content: &str, viewport_height: u16) -> u16 {
    let lines = content.lines().count();
    let lines = u16::try_from(lines).unwrap_or(u16::MAX);
    lines.saturating_sub(viewport_height)
}
