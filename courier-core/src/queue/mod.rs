//! Conversation queues and their registry

pub mod conversation;
pub mod registry;

pub use conversation::{ConversationQueue, QueueEntry};
pub use registry::{Registry, ReplyHandle, SharedQueue};
