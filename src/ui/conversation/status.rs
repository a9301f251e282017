use crate::prompts::{CLEAR_LABEL, RESPONDING_LABEL};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// One-line footer: responding indicator on the left, key hints after it
#[derive(Debug, Clone, Copy)]
pub struct StatusLine {
    pub is_responding: bool,
    pub show_clear_affordance: bool,
    /// Animation frame, advanced by the UI tick
    pub frame: usize,
}

impl StatusLine {
    fn dots(&self) -> &'static str {
        match self.frame % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }

    fn spans(&self) -> Vec<Span<'static>> {
        let mut spans = Vec::new();

        if self.is_responding {
            spans.push(Span::styled(RESPONDING_LABEL, Style::default().fg(Color::Green)));
            spans.push(Span::styled(self.dots(), Style::default().fg(Color::Yellow)));
            spans.push(Span::raw("  "));
        }

        spans.push(Span::styled("Ctrl+C: 終了", Style::default().fg(Color::DarkGray)));

        if self.show_clear_affordance {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("Ctrl+X: {}", CLEAR_LABEL),
                Style::default().fg(Color::Red),
            ));
        }

        spans
    }
}

impl Widget for StatusLine {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(self.spans());
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(status: StatusLine) -> String {
        status.spans().iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn clear_hint_hidden_until_affordance_shown() {
        let hidden = StatusLine {
            is_responding: false,
            show_clear_affordance: false,
            frame: 0,
        };
        assert!(!text(hidden).contains(CLEAR_LABEL));

        let shown = StatusLine {
            show_clear_affordance: true,
            ..hidden
        };
        assert!(text(shown).contains(CLEAR_LABEL));
    }

    #[test]
    fn responding_indicator_animates() {
        let status = StatusLine {
            is_responding: true,
            show_clear_affordance: false,
            frame: 2,
        };
        assert!(text(status).starts_with(&format!("{}...", RESPONDING_LABEL)));
    }
}
