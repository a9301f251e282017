use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    None,
}

/// Single text area for user input.
///
/// `cursor` counts characters, not bytes, so multi-byte input edits cleanly.
#[derive(Debug, Clone, Default)]
pub struct ConversationComposer {
    content: String,
    cursor: usize,
    placeholder: String,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            ..Self::default()
        }
    }

    /// Handle key input.
    ///
    /// Enter submits and empties the composer; Shift+Enter or Alt+Enter
    /// inserts a newline. Blank content is never submitted.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.insert_char('\n');
                } else {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    if !content.trim().is_empty() {
                        return ComposerResult::Submitted(content);
                    }
                }
            }
            KeyCode::Char(c) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.insert_char(c);
                }
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    #[cfg(test)]
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("送信 (Enter)")
            .style(Style::default().fg(Color::Green));

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder, inner_area.width);
            return;
        }

        let cursor_at = self.byte_index(self.cursor);
        let mut content = self.content.clone();
        content.insert(cursor_at, '▌');

        // Scroll just far enough that the cursor line is the last one drawn
        let lines: Vec<&str> = content.split('\n').collect();
        let height = (inner_area.height as usize).max(1);
        let cursor_line = self.content[..cursor_at].matches('\n').count();
        let start = (cursor_line + 1).saturating_sub(height);
        for (i, line_text) in lines[start..].iter().take(height).enumerate() {
            let line = Line::from(vec![Span::raw(*line_text)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut composer = ConversationComposer::new("メッセージを入力");
        type_text(&mut composer, "こんにちは");

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("こんにちは".to_string())
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn blank_input_is_not_submitted() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "   ");

        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerResult::None);
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "a");
        let result = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut composer, "b");

        assert_eq!(result, ComposerResult::None);
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn editing_multibyte_text_moves_by_characters() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "嫌なこと");

        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "嫌なと");

        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Delete));
        assert_eq!(composer.content(), "なと");

        composer.handle_key(press(KeyCode::End));
        type_text(&mut composer, "!");
        assert_eq!(composer.content(), "なと!");
    }

    #[test]
    fn control_chords_are_not_typed() {
        let mut composer = ConversationComposer::new("");
        composer.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert_eq!(composer.content(), "");
    }

    fn rendered_rows(composer: &ConversationComposer, area: Rect) -> Vec<String> {
        let mut buf = Buffer::empty(area);
        composer.render(area, &mut buf);
        (0..area.height)
            .map(|y| (0..area.width).map(|x| buf.get(x, y).symbol().to_string()).collect())
            .collect()
    }

    #[test]
    fn cursor_line_stays_visible_in_a_one_row_box() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "first");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut composer, "second");
        let area = Rect::new(0, 0, 20, 3);

        let rows = rendered_rows(&composer, area);
        assert!(rows[1].contains("second▌"), "{rows:?}");

        composer.handle_key(press(KeyCode::Home));
        let rows = rendered_rows(&composer, area);
        assert!(rows[1].contains("▌first"), "{rows:?}");
        assert!(!rows.join("").contains("second"), "{rows:?}");
    }
}
