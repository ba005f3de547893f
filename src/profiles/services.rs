use time::OffsetDateTime;

use super::repo_types::Profile;
use crate::memory::MemoryTier;

const FALLBACK_DISPLAY_NAME: &str = "User";

/// Account name first, then the email's local part, then a generic label.
pub fn derive_display_name(name: Option<&str>, email: &str) -> String {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    match email.split('@').next().map(str::trim) {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => FALLBACK_DISPLAY_NAME.to_string(),
    }
}

impl Profile {
    pub fn premium_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.premium_expires_at, Some(at) if at < now)
    }

    /// Follows the stored premium flag. A passed expiry only takes effect once
    /// check-premium-status clears the flag.
    pub fn memory_tier(&self) -> MemoryTier {
        if self.is_premium {
            MemoryTier::Premium
        } else {
            MemoryTier::Free
        }
    }
}

/// Tier for a user that may not have a profile yet.
pub fn tier_of(profile: Option<&Profile>) -> MemoryTier {
    profile.map_or(MemoryTier::Free, Profile::memory_tier)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use time::Duration;
    use uuid::Uuid;

    pub(crate) fn profile(is_premium: bool, expires: Option<OffsetDateTime>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            display_name: "pal".into(),
            avatar: None,
            is_premium,
            premium_expires_at: expires,
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn display_name_prefers_account_name() {
        assert_eq!(derive_display_name(Some("Robin"), "rob@example.com"), "Robin");
    }

    #[test]
    fn display_name_falls_back_to_email_prefix() {
        assert_eq!(derive_display_name(None, "rob@example.com"), "rob");
        assert_eq!(derive_display_name(Some("   "), "rob@example.com"), "rob");
    }

    #[test]
    fn display_name_last_resort() {
        assert_eq!(derive_display_name(None, ""), "User");
        assert_eq!(derive_display_name(None, "@example.com"), "User");
    }

    #[test]
    fn permanent_premium_never_expires() {
        let now = OffsetDateTime::now_utc();
        let p = profile(true, None);
        assert!(!p.premium_expired(now));
        assert_eq!(p.memory_tier(), MemoryTier::Premium);
    }

    #[test]
    fn lapsed_premium_keeps_full_memory_until_flag_is_cleared() {
        let now = OffsetDateTime::now_utc();
        let p = profile(true, Some(now - Duration::days(1)));
        assert!(p.premium_expired(now));
        assert_eq!(p.memory_tier(), MemoryTier::Premium);

        let old = crate::chats::repo_types::Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::nil(),
            user_id: p.user_id,
            content: "from three days ago".into(),
            role: crate::chats::repo_types::MessageRole::User,
            reply_to: None,
            created_at: now - Duration::days(3),
        };
        let window = crate::memory::context_window(vec![old], tier_of(Some(&p)), now);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn cleared_flag_is_free_tier() {
        let p = profile(false, None);
        assert_eq!(p.memory_tier(), MemoryTier::Free);
    }

    #[test]
    fn missing_profile_is_free() {
        assert_eq!(tier_of(None), MemoryTier::Free);
    }
}
