use crate::controller::{ConversationAction, ConversationController};
use crate::events::ControllerUpdate;
use crate::prompts::{INPUT_PLACEHOLDER, TITLE};
use crate::ui::conversation::{ComposerResult, ConversationComposer, ConversationHistory, StatusLine};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

const SCROLL_STEP: usize = 5;

/// Binds the controller to the chat screen: routes keys, renders state
pub struct ConversationManager {
    controller: ConversationController,
    composer: ConversationComposer,
    scroll_offset: usize,
    frame: usize,
}

impl ConversationManager {
    pub fn new(controller: ConversationController) -> Self {
        Self {
            controller,
            composer: ConversationComposer::new(INPUT_PLACEHOLDER),
            scroll_offset: 0,
            frame: 0,
        }
    }

    /// Start a new conversation
    pub fn start_conversation(&mut self) {
        self.controller.initialize();
        self.scroll_offset = 0;
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return ConversationAction::Terminate,
                KeyCode::Char('x') if self.controller.show_clear_affordance() => {
                    return self.controller.clear();
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::PageUp => {
                self.scroll_offset += SCROLL_STEP;
                ConversationAction::None
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(SCROLL_STEP);
                ConversationAction::None
            }
            _ => {
                if let ComposerResult::Submitted(text) = self.composer.handle_key(key) {
                    if self.controller.submit_user_message(&text).is_some() {
                        self.scroll_offset = 0;
                    }
                }
                ConversationAction::None
            }
        }
    }

    /// Advance animations and apply any replies that are ready
    pub fn on_tick(&mut self) -> Vec<ControllerUpdate> {
        self.frame = self.frame.wrapping_add(1);
        self.controller.poll_events()
    }

    /// Wait for the controller's next deferred update
    pub async fn next_update(&mut self) -> Option<ControllerUpdate> {
        self.controller.next_event().await
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    /// Render the chat screen, pulling the scroll offset back into range
    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title
                Constraint::Min(5),    // History
                Constraint::Length(1), // Status
                Constraint::Length(3), // Composer
            ])
            .split(area);

        let title = Line::from(vec![Span::styled(
            TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )]);
        buf.set_line(chunks[0].x, chunks[0].y, &title, chunks[0].width);

        let history = ConversationHistory::new(self.controller.transcript(), self.scroll_offset);
        self.scroll_offset = self.scroll_offset.min(history.max_scroll_offset(chunks[1]));
        history.render(chunks[1], buf);

        StatusLine {
            is_responding: self.controller.is_responding(),
            show_clear_affordance: self.controller.show_clear_affordance(),
            frame: self.frame,
        }
        .render(chunks[2], buf);

        self.composer.render(chunks[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerOptions;
    use crate::error::ReplyError;
    use crate::events::Role;
    use crate::llm::{CompletionBackend, LlmMessage};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl CompletionBackend for Echo {
        async fn complete(&self, messages: Vec<LlmMessage>) -> Result<String, ReplyError> {
            Ok(format!("echo: {}", messages.last().map(|m| m.content.as_str()).unwrap_or("")))
        }
    }

    fn manager() -> ConversationManager {
        let controller = ConversationController::new(
            Arc::new(Echo),
            ControllerOptions {
                persona: "persona".to_string(),
                min_reply_delay: Duration::ZERO,
                clear_affordance_delay: Duration::from_secs(120),
            },
        );
        let mut manager = ConversationManager::new(controller);
        manager.start_conversation();
        manager
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[tokio::test(start_paused = true)]
    async fn typing_and_enter_sends_to_controller() {
        let mut manager = manager();
        for c in "hi".chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        manager.handle_key(key(KeyCode::Enter));
        assert!(manager.controller().is_responding());

        manager.next_update().await;
        let roles: Vec<Role> = manager.controller().transcript().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(manager.controller().transcript().last().unwrap().content(), "echo: hi");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_shortcut_requires_affordance() {
        let mut manager = manager();
        manager.handle_key(key(KeyCode::Char('a')));
        manager.handle_key(key(KeyCode::Enter));

        assert_eq!(manager.handle_key(ctrl('x')), ConversationAction::None);
        assert!(!manager.controller().messages().is_empty());

        tokio::time::sleep(Duration::from_secs(121)).await;
        manager.on_tick();
        assert!(manager.controller().show_clear_affordance());

        assert_eq!(manager.handle_key(ctrl('x')), ConversationAction::Terminate);
        assert!(manager.controller().messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ctrl_c_terminates_without_clearing() {
        let mut manager = manager();
        assert_eq!(manager.handle_key(ctrl('c')), ConversationAction::Terminate);
        assert_eq!(manager.controller().messages().len(), 1);
    }

    async fn send(manager: &mut ConversationManager, text: &str) {
        for c in text.chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        manager.handle_key(key(KeyCode::Enter));
        manager.next_update().await;
    }

    fn render_rows(manager: &mut ConversationManager, area: Rect) -> Vec<String> {
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf);
        (0..area.height)
            .map(|y| (0..area.width).map(|x| buf.get(x, y).symbol().to_string()).collect())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn scrolling_past_the_top_is_clamped() {
        let mut manager = manager();
        for i in 0..6 {
            send(&mut manager, &format!("msg{i}")).await;
        }
        let area = Rect::new(0, 0, 40, 12);
        let history_area = Rect::new(0, 1, 40, 7);
        let max = ConversationHistory::new(manager.controller().transcript(), 0).max_scroll_offset(history_area);
        assert!(max > SCROLL_STEP);

        for _ in 0..20 {
            manager.handle_key(key(KeyCode::PageUp));
        }
        let top = render_rows(&mut manager, area);
        assert_eq!(manager.scroll_offset, max);

        manager.handle_key(key(KeyCode::PageDown));
        let below_top = render_rows(&mut manager, area);
        assert_eq!(manager.scroll_offset, max - SCROLL_STEP);
        assert_ne!(top, below_top);
    }

    #[tokio::test(start_paused = true)]
    async fn render_fits_small_terminal() {
        let mut manager = manager();
        let area = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf);
    }
}
