//! Reply item model
//!
//! A conversation's pending work is a set of [`ReplyItem`]s: `Thinking`
//! placeholders for replies still being generated and `Sending` items holding
//! finished text. A [`ReplyGroup`] carries the bubbles of one generation turn
//! and only exists until it is expanded into a queue.

pub mod group;
pub mod item;
pub mod types;

pub use group::{ContentLookup, ContentMatch, ReplyGroup};
pub use item::{ReplyItem, SendingItem, ThinkingItem};
pub use types::{ConversationId, ItemId, Platform};
