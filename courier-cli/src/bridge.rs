//! JSON-lines bridge between a reply producer and the courier context
//!
//! Each stdin line is one command, each stdout line one response:
//!
//! ```text
//! {"op":"think","conversation":"123"}
//! {"op":"resolve","conversation":"123","item":7,"replies":[{"text":"hi"}]}
//! {"op":"abandon","conversation":"123","item":7}
//! {"op":"say","conversation":"123","replies":[{"file":"emoji/a.png","caption":"a cat"}]}
//! ```

use anyhow::{bail, Result};
use courier_core::queue::ReplyHandle;
use courier_core::reply::{ConversationId, ItemId, Platform, ReplyGroup};
use courier_scheduler::Courier;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

/// One reply bubble as sent by the producer
#[derive(Debug, Deserialize)]
pub struct ReplyPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Text carries a `file=<path>` locator
    #[serde(default)]
    pub special: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeCommand {
    Think {
        conversation: String,
    },
    Resolve {
        conversation: String,
        item: u64,
        replies: Vec<ReplyPayload>,
        #[serde(default)]
        reply_to: Option<String>,
        #[serde(default)]
        platform: Option<Platform>,
    },
    Abandon {
        conversation: String,
        item: u64,
    },
    Say {
        conversation: String,
        replies: Vec<ReplyPayload>,
        #[serde(default)]
        reply_to: Option<String>,
        #[serde(default)]
        platform: Option<Platform>,
    },
}

fn build_group(
    conversation: &str,
    platform: Platform,
    reply_to: Option<String>,
    replies: Vec<ReplyPayload>,
) -> Result<ReplyGroup> {
    let mut group = ReplyGroup::new(conversation, platform);
    if let Some(reply_to) = reply_to {
        group = group.with_reply_to(reply_to);
    }

    for reply in replies {
        match (reply.file, reply.text) {
            (Some(file), _) => {
                group.push_special(file, reply.caption);
            }
            (None, Some(text)) if reply.special => {
                group.push_legacy(text, true);
            }
            (None, Some(text)) => {
                group.push_text(text);
            }
            (None, None) => bail!("reply needs either text or file"),
        }
    }

    if group.is_empty() {
        bail!("no replies given");
    }
    Ok(group)
}

fn handle(conversation: String, item: u64) -> ReplyHandle {
    ReplyHandle {
        conversation_id: ConversationId::from(conversation),
        item_id: ItemId::from(item),
    }
}

/// Apply one command; `default_platform` tags replies that do not name one
pub fn execute(courier: &Courier, default_platform: Platform, command: BridgeCommand) -> Result<Value> {
    match command {
        BridgeCommand::Think { conversation } => {
            let handle = courier.enqueue_thinking(conversation)?;
            Ok(json!({
                "ok": true,
                "conversation": handle.conversation_id,
                "item": handle.item_id,
            }))
        }
        BridgeCommand::Resolve {
            conversation,
            item,
            replies,
            reply_to,
            platform,
        } => {
            let group = build_group(
                &conversation,
                platform.unwrap_or(default_platform),
                reply_to,
                replies,
            )?;
            let resolved = courier.resolve(&handle(conversation, item), group)?;
            Ok(json!({ "ok": true, "resolved": resolved }))
        }
        BridgeCommand::Abandon { conversation, item } => {
            let abandoned = courier.abandon(&handle(conversation, item));
            Ok(json!({ "ok": true, "abandoned": abandoned }))
        }
        BridgeCommand::Say {
            conversation,
            replies,
            reply_to,
            platform,
        } => {
            let group = build_group(
                &conversation,
                platform.unwrap_or(default_platform),
                reply_to,
                replies,
            )?;
            let items = courier.enqueue(group)?;
            Ok(json!({ "ok": true, "items": items }))
        }
    }
}

/// Parse and apply one input line, always producing a response
pub fn execute_line(courier: &Courier, default_platform: Platform, line: &str) -> Value {
    let result = serde_json::from_str::<BridgeCommand>(line)
        .map_err(anyhow::Error::from)
        .and_then(|command| execute(courier, default_platform, command));

    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Bridge command failed: {}", e);
            json!({ "ok": false, "error": e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_channels::{Dispatcher, SenderSet};
    use courier_core::config::schema::TypingConfig;
    use courier_core::queue::Registry;
    use courier_core::reply::ReplyItem;
    use std::sync::Arc;
    use std::time::Duration;

    fn courier() -> Courier {
        Courier::new(
            Arc::new(Registry::new(10, Duration::from_secs(20))),
            Arc::new(Dispatcher::new(
                Platform::Telegram,
                TypingConfig::default(),
                SenderSet::default(),
            )),
        )
    }

    #[test]
    fn test_think_then_resolve() {
        let c = courier();
        let think = execute_line(&c, Platform::Telegram, r#"{"op":"think","conversation":"42"}"#);
        assert_eq!(think["ok"], true);
        let item = think["item"].as_u64().unwrap();

        let resolve = format!(
            r#"{{"op":"resolve","conversation":"42","item":{},"reply_to":"5","replies":[{{"text":"hi"}},{{"file":"/e/a.png","caption":"cat"}}]}}"#,
            item
        );
        let result = execute_line(&c, Platform::Telegram, &resolve);
        assert_eq!(result["resolved"], true);

        let queue = c.registry().get(&ConversationId::from("42")).unwrap();
        let items = queue.lock().items();
        match (&items[0], &items[1]) {
            (ReplyItem::Sending(first), ReplyItem::Sending(second)) => {
                assert_eq!(first.text_content(), "hi");
                assert_eq!(first.reply_to_id(), Some("5"));
                assert!(second.is_special());
                assert_eq!(second.caption(), Some("cat"));
            }
            other => panic!("unexpected items: {:?}", other),
        }
    }

    #[test]
    fn test_abandon_and_errors() {
        let c = courier();
        let think = execute_line(&c, Platform::Telegram, r#"{"op":"think","conversation":"1"}"#);
        let item = think["item"].as_u64().unwrap();

        let abandon = format!(r#"{{"op":"abandon","conversation":"1","item":{}}}"#, item);
        assert_eq!(execute_line(&c, Platform::Telegram, &abandon)["abandoned"], true);
        assert_eq!(execute_line(&c, Platform::Telegram, &abandon)["abandoned"], false);

        let bad = execute_line(&c, Platform::Telegram, "not json");
        assert_eq!(bad["ok"], false);

        let empty = execute_line(
            &c,
            Platform::Telegram,
            r#"{"op":"say","conversation":"1","replies":[{}]}"#,
        );
        assert_eq!(empty["ok"], false);
    }

    #[test]
    fn test_say_uses_requested_platform() {
        let c = courier();
        let say = execute_line(
            &c,
            Platform::Telegram,
            r#"{"op":"say","conversation":"9","platform":"discord","replies":[{"text":"a"},{"text":"b"}]}"#,
        );
        assert_eq!(say["items"].as_array().unwrap().len(), 2);

        let queue = c.registry().get(&ConversationId::from("9")).unwrap();
        let items = queue.lock().items();
        assert!(items
            .iter()
            .all(|i| matches!(i, ReplyItem::Sending(s) if s.platform() == Platform::Discord)));
    }
}
