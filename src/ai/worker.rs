//! In-process queue that detaches reply generation from send-message.

use std::{future::Future, sync::Arc};

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{client::CompletionClient, services::generate_reply};
use crate::chats::repo as chats_repo;

/// Unanswered user messages younger than this are re-enqueued.
const REDELIVERY_WINDOW: Duration = Duration::hours(1);
/// Messages younger than this may still have their first job in flight.
const REDELIVERY_SETTLE: Duration = Duration::minutes(5);
const REDELIVERY_EVERY: std::time::Duration = std::time::Duration::from_secs(60);

/// One user turn awaiting a reply. `(chat_id, message_id)` is the idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationJob {
    pub chat_id: Uuid,
    pub message_id: Uuid,
}

#[derive(Clone)]
pub struct GenerationQueue {
    tx: mpsc::UnboundedSender<GenerationJob>,
}

impl GenerationQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GenerationJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Never blocks and never fails the caller.
    pub fn enqueue(&self, job: GenerationJob) {
        if self.tx.send(job).is_err() {
            error!(chat_id = %job.chat_id, message_id = %job.message_id, "generation queue closed; job dropped");
        }
    }
}

/// Drains the queue, running every job as its own task.
pub fn spawn_worker<F, Fut>(mut rx: mpsc::UnboundedReceiver<GenerationJob>, handle: F) -> JoinHandle<()>
where
    F: Fn(GenerationJob) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let fut = handle(job);
            tokio::spawn(async move {
                if let Err(e) = fut.await {
                    error!(error = %e, chat_id = %job.chat_id, message_id = %job.message_id, "generation job failed");
                }
            });
        }
        info!("generation queue closed");
    })
}

pub fn spawn_generation_worker(
    rx: mpsc::UnboundedReceiver<GenerationJob>,
    db: PgPool,
    client: Arc<dyn CompletionClient>,
) -> JoinHandle<()> {
    spawn_worker(rx, move |job| {
        let db = db.clone();
        let client = client.clone();
        async move { generate_reply(&db, client.as_ref(), job).await }
    })
}

/// Re-enqueues user messages that never received a reply, skipping ones too
/// recent to have settled.
pub async fn redeliver_unanswered(
    db: &PgPool,
    queue: &GenerationQueue,
    now: OffsetDateTime,
) -> anyhow::Result<usize> {
    let pending =
        chats_repo::unanswered_between(db, now - REDELIVERY_WINDOW, now - REDELIVERY_SETTLE).await?;
    for (chat_id, message_id) in &pending {
        queue.enqueue(GenerationJob {
            chat_id: *chat_id,
            message_id: *message_id,
        });
    }
    if !pending.is_empty() {
        warn!(count = pending.len(), "re-enqueued unanswered messages");
    }
    Ok(pending.len())
}

/// Runs the redelivery scan at startup and then once a minute.
pub fn spawn_redelivery(db: PgPool, queue: GenerationQueue) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REDELIVERY_EVERY);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = redeliver_unanswered(&db, &queue, OffsetDateTime::now_utc()).await {
                warn!(error = %e, "redelivery scan failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job() -> GenerationJob {
        GenerationJob {
            chat_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn enqueue_delivers_in_order() {
        let (queue, mut rx) = GenerationQueue::channel();
        let (a, b) = (job(), job());
        queue.enqueue(a);
        queue.enqueue(b);
        assert_eq!(rx.recv().await, Some(a));
        assert_eq!(rx.recv().await, Some(b));
    }

    #[tokio::test]
    async fn enqueue_after_worker_is_gone_does_not_panic() {
        let (queue, rx) = GenerationQueue::channel();
        drop(rx);
        queue.enqueue(job());
    }

    #[tokio::test]
    async fn worker_runs_every_job_and_survives_failures() {
        let (queue, rx) = GenerationQueue::channel();
        let done = Arc::new(AtomicUsize::new(0));
        let (finished_tx, mut finished_rx) = mpsc::unbounded_channel();

        let counter = done.clone();
        let worker = spawn_worker(rx, move |j: GenerationJob| {
            let counter = counter.clone();
            let finished_tx = finished_tx.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let _ = finished_tx.send(j);
                if n == 0 {
                    anyhow::bail!("first job fails");
                }
                Ok(())
            }
        });

        for _ in 0..3 {
            queue.enqueue(job());
        }
        for _ in 0..3 {
            finished_rx.recv().await.expect("job ran");
        }
        assert_eq!(done.load(Ordering::SeqCst), 3);

        drop(queue);
        worker.await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn redelivery_picks_only_settled_unanswered_messages(db: PgPool) {
        use crate::chats::repo::tests::{seed_chat, seed_user};

        let now = OffsetDateTime::now_utc();
        let user = seed_user(&db, "late@buddy.chat").await;
        let chat = seed_chat(&db, user).await;

        let stuck = chats_repo::append_user_message(&db, &chat, "anyone there?", now - Duration::minutes(10))
            .await
            .unwrap();
        let answered = chats_repo::append_user_message(&db, &chat, "hi", now - Duration::minutes(20))
            .await
            .unwrap();
        chats_repo::append_assistant_reply(&db, chat.id, answered.id, "hey!", now - Duration::minutes(19))
            .await
            .unwrap();
        chats_repo::append_user_message(&db, &chat, "still in flight", now - Duration::seconds(30))
            .await
            .unwrap();
        chats_repo::append_user_message(&db, &chat, "too old", now - Duration::hours(3))
            .await
            .unwrap();

        let (queue, mut rx) = GenerationQueue::channel();
        let count = redeliver_unanswered(&db, &queue, now).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            GenerationJob { chat_id: chat.id, message_id: stuck.id }
        );
        assert!(rx.try_recv().is_err());
    }
}
