use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument};

use super::{
    client::{ChatMessage, CompletionClient, PromptRole},
    persona::{BUDDY_PERSONA, FALLBACK_REPLY},
    worker::GenerationJob,
};
use crate::{
    chats::{
        repo as chats_repo,
        repo_types::{Message, MessageRole},
    },
    memory::context_window,
    profiles::{repo as profiles_repo, services::tier_of},
};

/// Persona first, then the window in chronological order.
pub fn assemble_prompt(window: &[Message]) -> Vec<ChatMessage> {
    let mut prompt = Vec::with_capacity(window.len() + 1);
    prompt.push(ChatMessage {
        role: PromptRole::System,
        content: BUDDY_PERSONA.to_string(),
    });
    prompt.extend(window.iter().map(|m| ChatMessage {
        role: match m.role {
            MessageRole::User => PromptRole::User,
            MessageRole::Assistant => PromptRole::Assistant,
        },
        content: m.content.clone(),
    }));
    prompt
}

/// Model output, or the canned apology when the call fails in any way.
pub async fn reply_text(client: &dyn CompletionClient, prompt: &[ChatMessage]) -> String {
    match client.complete(prompt).await {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "generation failed; storing fallback reply");
            FALLBACK_REPLY.to_string()
        }
    }
}

/// Builds the context for `job.chat_id`, asks the model, and stores the reply.
///
/// A missing chat (before or after the call) or an already answered trigger
/// message ends the job without writing anything.
#[instrument(skip(db, client, job), fields(chat_id = %job.chat_id, message_id = %job.message_id))]
pub async fn generate_reply(
    db: &PgPool,
    client: &dyn CompletionClient,
    job: GenerationJob,
) -> anyhow::Result<()> {
    let Some(chat) = chats_repo::find(db, job.chat_id).await? else {
        debug!("chat gone before generation");
        return Ok(());
    };
    if chats_repo::has_reply(db, job.message_id).await? {
        debug!("trigger message already answered");
        return Ok(());
    }

    let now = OffsetDateTime::now_utc();
    let profile = profiles_repo::find_by_user(db, chat.user_id).await?;
    let tier = tier_of(profile.as_ref());
    let history = chats_repo::list_messages(db, chat.id).await?;
    let window = context_window(history, tier, now);
    debug!(?tier, context_len = window.len(), "context built");

    let prompt = assemble_prompt(&window);
    let text = reply_text(client, &prompt).await;

    let stored = chats_repo::append_assistant_reply(
        db,
        chat.id,
        job.message_id,
        &text,
        OffsetDateTime::now_utc(),
    )
    .await?;
    match stored {
        Some(reply) => info!(reply_id = %reply.id, "assistant reply stored"),
        None => debug!("reply dropped: chat deleted or already answered"),
    }
    Ok(())
}
