//! Compatibility shim for producers that embed file locators in text
//!
//! Older producers encode a sticker as `[CQ:image,file=<path>]`. New code sets
//! the content reference on the item directly.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static FILE_LOCATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"file=(.*?)[,\]]").expect("static regex is valid"));

/// Extract the first `file=<path>` locator terminated by `,` or `]`
pub fn extract_file_locator(text: &str) -> Option<PathBuf> {
    FILE_LOCATOR
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}
