//! Typing-delay simulation

use std::time::Duration;

use crate::config::schema::TypingConfig;

/// Whether a char falls in the CJK Unified Ideographs block
fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Simulated time a person would need to type `text`, capped at `max_delay_secs`.
///
/// Each CJK ideograph costs `cjk_char_secs`, every other char costs
/// `other_char_secs`. The result never decreases as text grows.
pub fn typing_delay(text: &str, typing: &TypingConfig) -> Duration {
    let raw: f64 = text
        .chars()
        .map(|c| {
            if is_cjk_ideograph(c) {
                typing.cjk_char_secs
            } else {
                typing.other_char_secs
            }
        })
        .sum();

    let capped = raw.min(typing.max_delay_secs).max(0.0);
    Duration::from_secs_f64(capped)
}
