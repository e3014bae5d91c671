mod handler;
mod model;
mod provider;

pub use handler::{
    chat_page, create_conversation, delete_conversation, list_conversations, list_messages,
    send_message, update_config,
};
pub use model::{ChatConfig, ChatMessage, Conversation};
pub use provider::{ChatProvider, PlaceholderProvider};
