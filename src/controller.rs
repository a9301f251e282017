use crate::config::Config;
use crate::events::{ControllerEvent, ControllerUpdate, Message, Role, Ticket};
use crate::llm::{CompletionBackend, LlmMessage};
use crate::prompts::EMPTY_REPLY_FALLBACK;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Actions the host UI is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    /// End the interactive session
    Terminate,
}

/// Tunables for a controller, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub persona: String,
    pub min_reply_delay: Duration,
    pub clear_affordance_delay: Duration,
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            persona: config.persona_prompt().to_string(),
            min_reply_delay: config.min_reply_delay(),
            clear_affordance_delay: config.clear_affordance_delay(),
        }
    }
}

/// The request currently allowed to produce a reply
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    ticket: Ticket,
    started: Instant,
}

/// Owns the conversation and mediates every completion request.
///
/// Each dispatch captures a [`Ticket`]. Replies come back through an internal
/// channel and are applied only if their ticket is still the current one, so
/// a newer submission (or `clear`/`initialize`) silently supersedes any
/// request still in flight. Must be driven from inside a tokio runtime.
pub struct ConversationController {
    backend: Arc<dyn CompletionBackend>,
    options: ControllerOptions,
    messages: Vec<Message>,
    session: Uuid,
    seq: u64,
    pending: Option<PendingRequest>,
    is_responding: bool,
    show_clear_affordance: bool,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    affordance_timer: Option<JoinHandle<()>>,
}

impl ConversationController {
    pub fn new(backend: Arc<dyn CompletionBackend>, options: ControllerOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            backend,
            options,
            messages: Vec::new(),
            session: Uuid::nil(),
            seq: 0,
            pending: None,
            is_responding: false,
            show_clear_affordance: false,
            events_tx,
            events_rx,
            affordance_timer: None,
        }
    }

    /// Start a fresh session: seed the persona prompt, reset counters and
    /// flags, and arm the clear affordance timer.
    pub fn initialize(&mut self) {
        if let Some(timer) = self.affordance_timer.take() {
            timer.abort();
        }

        self.session = Uuid::new_v4();
        self.seq = 0;
        self.pending = None;
        self.is_responding = false;
        self.show_clear_affordance = false;
        self.messages = vec![Message::system(self.options.persona.clone())];

        let session = self.session;
        let delay = self.options.clear_affordance_delay;
        let tx = self.events_tx.clone();
        self.affordance_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControllerEvent::ClearAffordanceReady { session });
        }));

        info!(session = %self.session, "conversation initialized");
    }

    /// Append a user message and dispatch a completion request for the whole
    /// conversation. Blank input is ignored and returns `None`.
    pub fn submit_user_message(&mut self, text: &str) -> Option<Ticket> {
        if text.trim().is_empty() {
            return None;
        }

        self.messages.push(Message::user(text));
        self.seq += 1;
        let ticket = self.current_ticket();
        let started = Instant::now();
        self.pending = Some(PendingRequest { ticket, started });
        self.is_responding = true;

        let payload: Vec<LlmMessage> = self.messages.iter().map(LlmMessage::from).collect();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let min_delay = self.options.min_reply_delay;

        debug!(session = %ticket.session, seq = ticket.seq, messages = payload.len(), "dispatching completion request");

        tokio::spawn(async move {
            let outcome = backend.complete(payload).await;

            let wait = min_delay.saturating_sub(started.elapsed());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }

            let _ = tx.send(ControllerEvent::Reply { ticket, outcome });
        });

        Some(ticket)
    }

    /// Empty the conversation and ask the host to end the session.
    ///
    /// Every request still in flight is superseded.
    pub fn clear(&mut self) -> ConversationAction {
        self.messages.clear();
        self.seq += 1;
        self.pending = None;
        self.is_responding = false;

        info!(session = %self.session, "conversation cleared");
        ConversationAction::Terminate
    }

    /// Apply every event that is already available without waiting
    pub fn poll_events(&mut self) -> Vec<ControllerUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            updates.push(self.apply(event));
        }
        updates
    }

    /// Wait for the next deferred event and apply it
    pub async fn next_event(&mut self) -> Option<ControllerUpdate> {
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    fn apply(&mut self, event: ControllerEvent) -> ControllerUpdate {
        match event {
            ControllerEvent::Reply { ticket, outcome } => {
                if ticket != self.current_ticket() {
                    debug!(session = %ticket.session, seq = ticket.seq, current = self.seq, "discarding superseded reply");
                    return ControllerUpdate::ReplyDiscarded(ticket);
                }

                self.is_responding = false;
                if let Some(pending) = self.pending.take() {
                    debug!(seq = pending.ticket.seq, elapsed_ms = pending.started.elapsed().as_millis() as u64, "reply applied");
                }

                let content = match outcome {
                    Ok(text) if !text.is_empty() => text,
                    Ok(_) => EMPTY_REPLY_FALLBACK.to_string(),
                    Err(err) => {
                        warn!(seq = ticket.seq, error = %err, "completion request failed");
                        err.fallback_text().to_string()
                    }
                };
                self.messages.push(Message::assistant(content));

                ControllerUpdate::ReplyApplied(ticket)
            }
            ControllerEvent::ClearAffordanceReady { session } => {
                if session != self.session || self.show_clear_affordance {
                    return ControllerUpdate::Ignored;
                }

                self.show_clear_affordance = true;
                info!(session = %session, "clear affordance revealed");
                ControllerUpdate::ClearAffordanceShown
            }
        }
    }

    fn current_ticket(&self) -> Ticket {
        Ticket {
            session: self.session,
            seq: self.seq,
        }
    }

    /// Full conversation, persona prompt included
    #[cfg(test)]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages meant for display (persona prompt filtered out)
    pub fn transcript(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role() != Role::System)
    }

    pub fn is_responding(&self) -> bool {
        self.is_responding
    }

    pub fn show_clear_affordance(&self) -> bool {
        self.show_clear_affordance
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }
}

impl Drop for ConversationController {
    fn drop(&mut self) {
        if let Some(timer) = self.affordance_timer.take() {
            timer.abort();
        }
    }
}
