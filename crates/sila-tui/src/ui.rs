use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use sila_core::view::EXPANDED_HEADER_TRAVEL;
use sila_core::{ChatRole, Language, ViewMode, MAX_INPUT_CHARS};
use std::time::Instant;
use crate::app::{App, InputMode};

/// Rows taken by the expanded header when fully shown.
const EXPANDED_HEADER_ROWS: f32 = 4.0;

const ACCENT: Color = Color::Rgb(0, 101, 61);

struct Labels {
    title: &'static str,
    tagline: &'static str,
    you: &'static str,
    assistant: &'static str,
    empty: &'static str,
    empty_hint: &'static str,
    typing: &'static str,
    listen: &'static str,
    stop: &'static str,
    placeholder: &'static str,
}

fn labels(language: Language) -> &'static Labels {
    static ARABIC: Labels = Labels {
        title: "صلة",
        tagline: "مساعدك الذكي",
        you: "أنت:",
        assistant: "صلة:",
        empty: "ابدأ محادثتك الآن",
        empty_hint: "اكتب سؤالك وسأساعدك",
        typing: "جاري الكتابة",
        listen: "استماع",
        stop: "إيقاف",
        placeholder: "اكتب رسالتك هنا...",
    };
    static ENGLISH: Labels = Labels {
        title: "Sila",
        tagline: "your assistant",
        you: "You:",
        assistant: "Sila:",
        empty: "Start your conversation",
        empty_hint: "Type a question and I'll help",
        typing: "Typing",
        listen: "Listen",
        stop: "Stop",
        placeholder: "Type your message here...",
    };
    match language {
        Language::Arabic => &ARABIC,
        Language::English => &ENGLISH,
    }
}

/// Terminal stand-in for opacity.
fn fade(color: Color, opacity: f32) -> Color {
    if opacity < 0.34 {
        Color::Black
    } else if opacity < 0.67 {
        Color::DarkGray
    } else {
        color
    }
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if open > 0 {
            spans.push(Span::raw(rest[..open].to_string()));
        }
        let bold = &after_open[..close];
        if bold.is_empty() {
            spans.push(Span::raw("****"));
        } else {
            spans.push(Span::styled(
                bold.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let now = Instant::now();
    let area = frame.area();

    let header_rows = match app.view.mode() {
        ViewMode::Expanded => (EXPANDED_HEADER_ROWS * app.view.header_progress(now)).round() as u16,
        ViewMode::Compact => 1,
    };

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(header_rows),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let intro = app.view.intro_opacity(now);
    match app.view.mode() {
        ViewMode::Expanded => render_expanded_header(app, frame, header_area, now, intro),
        ViewMode::Compact => render_compact_header(app, frame, header_area, now),
    }
    render_chat(app, frame, chat_area, intro);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_expanded_header(app: &App, frame: &mut Frame, area: Rect, now: Instant, intro: f32) {
    if area.height == 0 {
        return;
    }
    let labels = labels(app.language);
    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            labels.title,
            Style::default().fg(fade(ACCENT, intro)).bold(),
        )),
        Line::from(Span::styled(
            labels.tagline,
            Style::default().fg(fade(Color::Gray, intro)),
        )),
    ];
    let skip = banner_skip(app.view.expanded_header_offset(now));
    let header = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .scroll((skip, 0));
    frame.render_widget(header, area);
}

/// Banner rows scrolled out of view for a given slide offset.
fn banner_skip(offset: f32) -> u16 {
    let hidden = (-offset / EXPANDED_HEADER_TRAVEL).clamp(0.0, 1.0);
    (hidden * EXPANDED_HEADER_ROWS).round() as u16
}

fn render_compact_header(app: &App, frame: &mut Frame, area: Rect, now: Instant) {
    let labels = labels(app.language);
    let opacity = app.view.compact_header_opacity(now);
    let title = Line::from(vec![
        Span::styled(
            format!(" {} ", labels.title),
            Style::default().fg(fade(ACCENT, opacity)).bold(),
        ),
        Span::styled(
            format!("{} ", app.model),
            Style::default().fg(fade(Color::DarkGray, opacity)),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, intro: f32) {
    let labels = labels(app.language);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(fade(ACCENT, intro)))
        .title(format!(" {} ", app.model));

    let messages = app.session.messages();
    let pending = app.session.is_pending();

    if messages.is_empty() && !pending {
        let empty = Paragraph::new(Text::from(vec![
            Line::default(),
            Line::from(Span::styled(labels.empty, Style::default().fg(ACCENT).bold())),
            Line::from(Span::styled(
                labels.empty_hint,
                Style::default().fg(Color::DarkGray),
            )),
        ]))
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();

    for (index, msg) in messages.iter().enumerate() {
        let selected = app.selected == Some(index);
        let marker = if selected { "> " } else { "" };
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    format!("{marker}{}", labels.you),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(msg.content.as_str()));
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    format!("{marker}{}", labels.assistant),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                )));
                // Split response into lines and parse markdown
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }

                let (label, color) = if app.is_speaking(index) {
                    (format!("■ {}", labels.stop), Color::Red)
                } else {
                    (format!("♪ {}", labels.listen), ACCENT)
                };
                let mut style = Style::default().fg(color);
                if selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                lines.push(Line::from(Span::styled(label, style)));
            }
        }
        lines.push(Line::default());
    }

    if pending {
        lines.push(Line::from(Span::styled(
            labels.assistant,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", labels.typing, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let labels = labels(app.language);
    let editing = app.input_mode == InputMode::Editing;
    let pending = app.session.is_pending();

    let border_color = if pending {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        ACCENT
    };

    let char_count = app.input.chars().count();
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    if char_count > 0 {
        block = block.title_bottom(
            Line::from(format!(" {char_count}/{MAX_INPUT_CHARS} ")).right_aligned(),
        );
    }

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            labels.placeholder,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(block), area);

    // Show cursor when editing
    if editing && !pending {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let text = |t: &'static str| Span::styled(t, Style::default().fg(Color::DarkGray));

    let mut spans = match app.input_mode {
        InputMode::Editing => vec![
            key(" Enter"),
            text(" send  "),
            key("Ctrl+U"),
            text(" clear input  "),
            key("Esc"),
            text(" done "),
        ],
        InputMode::Normal => vec![
            key(" i"),
            text(" type  "),
            key("j/k"),
            text(" select  "),
            key("s"),
            text(" listen  "),
        ],
    };

    if app.input_mode == InputMode::Normal {
        if !app.session.messages().is_empty() {
            spans.push(key("d"));
            spans.push(text(" clear chat  "));
        }
        spans.push(key("q"));
        spans.push(text(" quit "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
