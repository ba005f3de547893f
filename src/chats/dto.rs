use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Caller-supplied title, or `Chat <date>` when absent or blank.
pub fn chat_title(requested: Option<&str>, now: OffsetDateTime) -> String {
    match requested.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => format!("Chat {}", now.date()),
    }
}
