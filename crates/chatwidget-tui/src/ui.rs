use chatwidget_core::{Appearance, Position, Sender, Theme};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

const POPUP_WIDTH: u16 = 48;
const POPUP_HEIGHT: u16 = 26;
const BUTTON_WIDTH: u16 = 7;
const BUTTON_HEIGHT: u16 = 3;

struct Palette {
    primary: Color,
    background: Color,
    text: Color,
    muted: Color,
}

impl Palette {
    fn from_appearance(appearance: &Appearance) -> Self {
        let primary = appearance
            .primary_color
            .parse::<Color>()
            .unwrap_or(Color::Blue);
        match appearance.theme {
            Theme::Light => Self {
                primary,
                background: Color::White,
                text: Color::Black,
                muted: Color::Gray,
            },
            Theme::Dark => Self {
                primary,
                background: Color::Black,
                text: Color::White,
                muted: Color::DarkGray,
            },
        }
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::from_appearance(&app.appearance);

    render_hint(app, frame, area, &palette);

    if app.view.is_open {
        render_popup(app, frame, area, &palette);
    } else {
        render_button(app, frame, area, &palette);
    }
}

/// Anchor a box of the given size in the configured bottom corner
fn corner_rect(area: Rect, position: Position, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height.saturating_sub(1));
    let y = area.y + area.height.saturating_sub(height + 1);
    let x = match position {
        Position::BottomRight => area.x + area.width.saturating_sub(width + 1),
        Position::BottomLeft => area.x + 1u16.min(area.width.saturating_sub(width)),
    };
    Rect::new(x, y, width, height)
}

fn render_hint(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let hint = if app.view.is_open {
        "Esc: close  Enter: send  ↑/↓: scroll  Ctrl+C: quit"
    } else {
        "Esc: open chat  Ctrl+C: quit"
    };
    let hint_area = Rect::new(
        area.x,
        area.y + area.height.saturating_sub(1),
        area.width,
        1u16.min(area.height),
    );
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(palette.muted)),
        hint_area,
    );
}

fn render_button(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let button_area = corner_rect(area, app.appearance.position, BUTTON_WIDTH, BUTTON_HEIGHT);

    let button = Paragraph::new("💬")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White).bg(palette.primary))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(palette.primary)),
        );

    frame.render_widget(Clear, button_area);
    frame.render_widget(button, button_area);
}

fn render_popup(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let popup_area = corner_rect(area, app.appearance.position, POPUP_WIDTH, POPUP_HEIGHT);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.primary))
        .style(Style::default().bg(palette.background).fg(palette.text));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [header_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(3),
    ])
    .areas(inner);

    render_header(app, frame, header_area, palette);
    render_chat(app, frame, chat_area, palette);
    render_input(app, frame, input_area, palette);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let header = Text::from(vec![
        Line::from(Span::styled(
            app.appearance.title.clone(),
            Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("● {}", app.appearance.subtitle),
            Style::default().fg(palette.muted),
        )),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    app.chat_height = area.height;
    app.chat_width = area.width;
    app.update_scroll();

    let mut lines: Vec<Line> = Vec::new();

    for message in &app.view.display_messages {
        let (label, alignment, style) = match message.sender {
            Sender::User => (
                "You",
                Alignment::Right,
                Style::default().fg(palette.primary).add_modifier(Modifier::BOLD),
            ),
            Sender::Bot => (
                "Assistant",
                Alignment::Left,
                Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
            ),
        };

        lines.push(
            Line::from(vec![
                Span::styled(label, style),
                Span::styled(
                    format!(" · {}", message.format_time()),
                    Style::default().fg(palette.muted),
                ),
            ])
            .alignment(alignment),
        );
        for text_line in message.text.lines() {
            lines.push(Line::from(text_line.to_string()).alignment(alignment));
        }
        lines.push(Line::default());
    }

    if app.view.is_awaiting_reply {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        )));
        // Animated dots: cycles through "●", "● ●", "● ● ●"
        let dots = vec!["●"; (app.animation_frame as usize) + 1].join(" ");
        lines.push(Line::from(Span::styled(
            dots,
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let awaiting = app.view.is_awaiting_reply;
    let border_color = if awaiting { palette.muted } else { palette.primary };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            app.appearance.placeholder.clone(),
            Style::default().fg(palette.muted),
        ))
    } else {
        let style = if awaiting {
            Style::default().fg(palette.muted)
        } else {
            Style::default().fg(palette.text)
        };
        Paragraph::new(Span::styled(visible_input(app, area), style))
    };

    let inner = block.inner(area);
    frame.render_widget(input.block(block), area);

    let offset = input_offset(app.cursor, inner.width as usize);
    let cursor_x = (app.cursor - offset).min(inner.width as usize) as u16;
    frame.set_cursor_position((inner.x + cursor_x, inner.y));
}

/// First visible char so the cursor stays inside the input box
fn input_offset(cursor: usize, width: usize) -> usize {
    if width == 0 {
        return cursor;
    }
    cursor.saturating_sub(width.saturating_sub(1))
}

fn visible_input(app: &App, area: Rect) -> String {
    let width = area.width.saturating_sub(2) as usize;
    let offset = input_offset(app.cursor, width);
    app.input.chars().skip(offset).take(width).collect()
}
