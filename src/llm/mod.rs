//! Conversational model adapter: chat-completions client, prompts, and session histories.

/// OpenAI-compatible chat-completions client.
pub mod client;
mod conversation;
/// Session history storage.
pub mod history;
/// Script-based language detection.
pub mod language;
/// Prompt text and assembly.
pub mod prompt;

pub use client::{ChatCompletionClient, ChatMessage, ChatModel, ChatModelError, ChatRole};
pub use conversation::{ConversationError, ConversationalModel};
pub use history::{History, InMemorySessionStore, SessionStore, SharedHistory};
pub use language::{Language, detect_language};
