use crate::ui::input_metrics::{char_display_width, visible_input_window};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

pub fn render_messages(frame: &mut Frame<'_>, area: Rect, lines: &[String], scroll: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let body = lines.join("\n");
    let paragraph = Paragraph::new(body)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str, alert: bool) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let style = if alert {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let text = truncate_line(status, area.width as usize);
    frame.render_widget(Paragraph::new(text).style(style), area);
}

pub fn render_input(
    frame: &mut Frame<'_>,
    area: Rect,
    input: &str,
    cursor_byte: usize,
    enabled: bool,
    placeholder: &str,
) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    if !enabled {
        frame.render_widget(
            Paragraph::new(format!("  {placeholder}")).style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            ),
            area,
        );
        return;
    }

    let field_width = area.width.saturating_sub(2).max(1) as usize;
    let (visible, cursor_col) = visible_input_window(input, cursor_byte, field_width);
    frame.render_widget(
        Paragraph::new(format!("> {visible}")).style(Style::default().fg(Color::Gray)),
        area,
    );

    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, area.y));
}

pub fn render_confirm_modal(frame: &mut Frame<'_>, tool: &str, args_preview: &str) {
    let size = frame.area();
    let width = size.width.clamp(44, 80);
    let height = size.height.clamp(9, 14);
    let x = size.x + (size.width.saturating_sub(width)) / 2;
    let y = size.y + (size.height.saturating_sub(height)) / 2;
    let area = Rect::new(x, y, width, height);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Confirm tool run: {tool}"))
        .style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    lines.push(Line::from(
        "y/enter approve   ctrl+n cancel and start a new chat",
    ));
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "Args",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    for line in args_preview.lines().take(inner.height.saturating_sub(3) as usize) {
        lines.push(Line::from(line.to_string()));
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        inner,
    );
}

fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    let mut out = String::new();
    let mut used = 0usize;
    let mut truncated = false;

    for ch in input.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > width {
            truncated = true;
            break;
        }
        out.push(ch);
        used += ch_width;
    }

    if truncated && width >= 4 {
        while used > width - 3 {
            match out.pop() {
                Some(ch) => used -= char_display_width(ch),
                None => break,
            }
        }
        out.push_str("...");
    }
    out
}
