//! Conversation UI components for the chat screen

pub mod composer;
pub mod history;
pub mod manager;
pub mod status;

pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use manager::ConversationManager;
pub use status::StatusLine;
