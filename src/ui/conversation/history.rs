//! Transcript display component

use crate::events::{Message, Role};
use crate::prompts::{INTRO, speaker_label};
use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Renders the visible messages, anchored to the bottom.
///
/// `scroll_offset` counts lines scrolled up from the newest message.
pub struct ConversationHistory<'a> {
    messages: Vec<&'a Message>,
    scroll_offset: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: impl Iterator<Item = &'a Message>, scroll_offset: usize) -> Self {
        Self {
            messages: messages.collect(),
            scroll_offset,
        }
    }

    /// All rendered lines for the given inner width
    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in &self.messages {
            all_lines.extend(render_message(message, width));
            all_lines.push(Line::from(""));
        }
        all_lines
    }

    /// Largest offset that still changes the view when rendered into `area`
    pub fn max_scroll_offset(&self, area: Rect) -> usize {
        let inner_area = Block::default().borders(Borders::ALL).inner(area);
        self.lines(inner_area.width)
            .len()
            .saturating_sub(inner_area.height as usize)
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL);
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() {
            let intro = Line::from(vec![Span::styled(INTRO, Style::default().fg(Color::Gray))]);
            buf.set_line(inner_area.x, inner_area.y, &intro, inner_area.width);
            return;
        }

        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let offset = self.scroll_offset.min(all_lines.len().saturating_sub(height));
        let end = all_lines.len() - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn render_message(message: &Message, width: u16) -> Vec<Line<'static>> {
    let timestamp = message.created_at().with_timezone(&Local).format("%H:%M");
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{}:", speaker_label(message.role())),
            content_style(message.role()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", timestamp), Style::default().fg(Color::DarkGray)),
    ])];

    for content_line in wrap_text(message.content(), width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, content_style(message.role())),
        ]));
    }

    lines
}

fn content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Blue),
        Role::Assistant => Style::default().fg(Color::Green),
        Role::System => Style::default().fg(Color::Yellow),
    }
}

/// Display width of a character in terminal cells
fn char_width(c: char) -> usize {
    Span::raw(c.to_string()).width()
}

/// Wrap text to `width` terminal cells.
///
/// Breaks between characters rather than words, since Japanese text has no
/// spaces to break on. Explicit newlines are kept.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for c in paragraph.chars() {
            let w = char_width(c);
            if current_width + w > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += w;
        }

        lines.push(current);
    }

    lines
}
