//! Tiered memory: which stored messages the assistant (and a free user) may see.
//!
//! Two limits are applied in order and never merged. Retention is the product
//! tier: free accounts only keep a rolling 48-hour window. Truncation is the
//! model's input limit: at most 20 messages, whatever the tier.

use time::{Duration, OffsetDateTime};

use crate::chats::repo_types::Message;

pub const FREE_RETENTION: Duration = Duration::hours(48);
pub const CONTEXT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTier {
    Free,
    Premium,
}

/// Oldest instant a free-tier message must be newer than.
///
/// Measured from `now` at call time, so a message can drop out of view
/// between two calls without anything being written.
pub fn retention_cutoff(now: OffsetDateTime) -> OffsetDateTime {
    now - FREE_RETENTION
}

/// Drops messages outside the tier's retention. Input and output are chronological.
pub fn retain_visible(
    messages: Vec<Message>,
    tier: MemoryTier,
    now: OffsetDateTime,
) -> Vec<Message> {
    match tier {
        MemoryTier::Premium => messages,
        MemoryTier::Free => {
            let cutoff = retention_cutoff(now);
            messages
                .into_iter()
                .filter(|m| m.created_at > cutoff)
                .collect()
        }
    }
}

/// Retention filter, then the newest [`CONTEXT_LIMIT`] messages in chronological order.
pub fn context_window(
    messages: Vec<Message>,
    tier: MemoryTier,
    now: OffsetDateTime,
) -> Vec<Message> {
    let mut visible = retain_visible(messages, tier, now);
    if visible.len() > CONTEXT_LIMIT {
        visible.drain(..visible.len() - CONTEXT_LIMIT);
    }
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chats::repo_types::MessageRole;
    use uuid::Uuid;

    fn msg(content: &str, at: OffsetDateTime) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::nil(),
            user_id: Uuid::nil(),
            content: content.into(),
            role: MessageRole::User,
            reply_to: None,
            created_at: at,
        }
    }

    /// `count` messages one minute apart, the last one at `newest`.
    fn history(count: usize, newest: OffsetDateTime) -> Vec<Message> {
        (0..count)
            .map(|i| {
                let age = Duration::minutes((count - 1 - i) as i64);
                msg(&format!("m{i}"), newest - age)
            })
            .collect()
    }

    fn contents(ms: &[Message]) -> Vec<&str> {
        ms.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn free_tier_drops_everything_older_than_48h() {
        let now = OffsetDateTime::now_utc();
        let messages = vec![
            msg("ancient", now - Duration::days(3)),
            msg("edge", now - Duration::hours(48)),
            msg("yesterday", now - Duration::hours(24)),
            msg("fresh", now),
        ];
        let window = context_window(messages, MemoryTier::Free, now);
        assert_eq!(contents(&window), vec!["yesterday", "fresh"]);
        assert!(window.iter().all(|m| m.created_at > now - FREE_RETENTION));
    }

    #[test]
    fn premium_keeps_old_messages() {
        let now = OffsetDateTime::now_utc();
        let messages = vec![msg("ancient", now - Duration::days(300)), msg("fresh", now)];
        let window = context_window(messages, MemoryTier::Premium, now);
        assert_eq!(contents(&window), vec!["ancient", "fresh"]);
    }

    #[test]
    fn truncates_to_latest_twenty_in_order() {
        let now = OffsetDateTime::now_utc();
        let window = context_window(history(35, now), MemoryTier::Free, now);
        assert_eq!(window.len(), CONTEXT_LIMIT);
        assert_eq!(window.first().unwrap().content, "m15");
        assert_eq!(window.last().unwrap().content, "m34");
        assert!(window.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn premium_is_still_bounded_by_context_limit() {
        let now = OffsetDateTime::now_utc();
        let mut messages = vec![msg("ancient", now - Duration::days(30))];
        messages.extend(history(25, now));
        let window = context_window(messages, MemoryTier::Premium, now);
        assert_eq!(window.len(), CONTEXT_LIMIT);
        assert!(!contents(&window).contains(&"ancient"));
    }

    #[test]
    fn truncation_applies_after_retention() {
        // 30 stale messages must not push recent ones out of a free window.
        let now = OffsetDateTime::now_utc();
        let mut messages = history(30, now - Duration::days(4));
        messages.extend(history(5, now));
        let window = context_window(messages, MemoryTier::Free, now);
        assert_eq!(window.len(), 5);
        assert!(window.iter().all(|m| m.created_at > now - Duration::hours(1)));
    }

    #[test]
    fn only_prior_message_three_days_old_leaves_empty_context() {
        let now = OffsetDateTime::now_utc();
        let messages = vec![msg("hello from last week", now - Duration::days(3))];
        assert!(context_window(messages, MemoryTier::Free, now).is_empty());
    }

    #[test]
    fn new_message_survives_when_old_history_is_dropped() {
        let now = OffsetDateTime::now_utc();
        let messages = vec![
            msg("three days ago", now - Duration::days(3)),
            msg("just sent", now),
        ];
        let window = context_window(messages, MemoryTier::Free, now);
        assert_eq!(contents(&window), vec!["just sent"]);
    }

    #[test]
    fn rolling_window_hides_a_message_as_time_passes() {
        // Visibility follows the clock at call time, not a fixed checkpoint.
        let sent = OffsetDateTime::now_utc();
        let messages = vec![msg("hi", sent)];
        let soon = sent + Duration::hours(47);
        let later = sent + Duration::hours(49);
        assert_eq!(retain_visible(messages.clone(), MemoryTier::Free, soon).len(), 1);
        assert!(retain_visible(messages, MemoryTier::Free, later).is_empty());
    }

    #[test]
    fn listing_filter_does_not_truncate() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(retain_visible(history(40, now), MemoryTier::Free, now).len(), 40);
    }

    #[test]
    fn empty_history() {
        let now = OffsetDateTime::now_utc();
        assert!(context_window(Vec::new(), MemoryTier::Premium, now).is_empty());
    }
}
