use std::{sync::Arc, time::Duration};

use entity_types::job::JobType;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::{
    callbacks::CallbackRegistry,
    database::EnrichmentJobs,
    llm::LlmClient,
    queue::{DEFAULT_QUEUE, QueueClient, SPONSOR_QUEUE, Task},
    quota::QuotaManager,
    youtube::YouTubeApi,
};

pub mod enrich;
pub mod sponsor;

const IDLE_POLL: Duration = Duration::from_secs(1);
const ERROR_BACKOFF: Duration = Duration::from_secs(5);
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Everything a worker needs, cloned per spawned loop.
#[derive(Clone)]
pub struct WorkerContext {
    pub database: DatabaseConnection,
    pub queue: QueueClient,
    pub quota: QuotaManager,
    pub youtube: Option<YouTubeApi>,
    pub llm: Option<LlmClient>,
    pub callbacks: Arc<CallbackRegistry>,
    pub batch_size: usize,
}

/// How a single task attempt ended, as far as the broker is concerned.
#[derive(Debug)]
pub enum TaskError {
    /// Worth redelivering while the attempt budget lasts.
    Retry(String),
    /// Retrying cannot help; the task is done and the job records why.
    Fatal(String),
}

/// One worker over the `default` queue. Video tasks are drained in batches
/// so a burst of uploads shares one `videos.list` call.
pub async fn enrichment_worker(
    shutdown: CancellationToken,
    context: WorkerContext,
    worker_index: usize,
) -> color_eyre::Result<()> {
    tracing::info!(worker_index, "enrichment worker started");

    loop {
        let reserved = tokio::select! {
            _ = shutdown.cancelled() => break,
            reserved = context.queue.reserve(DEFAULT_QUEUE) => reserved,
        };

        let task = match reserved {
            Ok(Some(task)) => task,
            Ok(None) => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(IDLE_POLL) => {},
                }
                continue;
            }
            Err(error) => {
                tracing::error!(%error, "failed to reserve from the default queue");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {},
                }
                continue;
            }
        };

        if task.job_type == JobType::VideoEnrich {
            let (batch, leftover) = drain_video_batch(&context, task).await;
            enrich::process_video_batch(&context, batch).await;
            if let Some(leftover) = leftover {
                process_default_task(&context, leftover).await;
            }
        } else {
            process_default_task(&context, task).await;
        }
    }

    tracing::info!(worker_index, "shutting down");

    Ok(())
}

/// One worker over the sponsor-detection queue.
pub async fn sponsor_worker(
    shutdown: CancellationToken,
    context: WorkerContext,
    worker_index: usize,
) -> color_eyre::Result<()> {
    tracing::info!(worker_index, "sponsor worker started");

    loop {
        let reserved = tokio::select! {
            _ = shutdown.cancelled() => break,
            reserved = context.queue.reserve(SPONSOR_QUEUE) => reserved,
        };

        let task = match reserved {
            Ok(Some(task)) => task,
            Ok(None) => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(IDLE_POLL) => {},
                }
                continue;
            }
            Err(error) => {
                tracing::error!(%error, "failed to reserve from the sponsor queue");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {},
                }
                continue;
            }
        };

        let outcome = sponsor::process(&context, &task).await;
        settle(&context, SPONSOR_QUEUE, &task, outcome).await;
    }

    tracing::info!(worker_index, "shutting down");

    Ok(())
}

/// Re-deliver tasks that out-stayed their visibility deadline, and mark the
/// jobs of tasks with no budget left as terminally failed.
pub async fn queue_reaper(
    shutdown: CancellationToken,
    database: DatabaseConnection,
    queue: QueueClient,
) -> color_eyre::Result<()> {
    let mut ticker = tokio::time::interval(REAP_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {},
        }

        for queue_name in [DEFAULT_QUEUE, SPONSOR_QUEUE] {
            let exhausted = match queue.reap(queue_name).await {
                Ok(exhausted) => exhausted,
                Err(error) => {
                    tracing::error!(%error, queue = queue_name, "queue reap failed");
                    continue;
                }
            };

            for task in exhausted {
                mark_mirrored_failed(
                    &database,
                    &task,
                    "visibility timeout exceeded and retry budget exhausted",
                )
                .await;
            }
        }
    }

    tracing::info!("shutting down");

    Ok(())
}

/// Run one non-batched task from the default queue.
async fn process_default_task(context: &WorkerContext, task: Task) {
    let outcome = match task.job_type {
        JobType::VideoEnrich => {
            enrich::process_video_batch(context, vec![task]).await;
            return;
        }
        JobType::ChannelEnrich => enrich::process_channel(context, &task).await,
        // Routed onto the wrong queue; nothing here can run it.
        JobType::SponsorDetect => Err(TaskError::Fatal(
            "sponsor detection task on the default queue".to_owned(),
        )),
    };

    settle(context, DEFAULT_QUEUE, &task, outcome).await;
}

/// Pull more ready video tasks so they share one API call. A non-video task
/// popped along the way is handed back for individual processing.
async fn drain_video_batch(context: &WorkerContext, first: Task) -> (Vec<Task>, Option<Task>) {
    let mut batch = vec![first];

    while batch.len() < context.batch_size {
        match context.queue.reserve(DEFAULT_QUEUE).await {
            Ok(Some(task)) if task.job_type == JobType::VideoEnrich => batch.push(task),
            Ok(Some(task)) => return (batch, Some(task)),
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(%error, "stopped draining the video batch early");
                break;
            }
        }
    }

    (batch, None)
}

/// Apply one attempt's outcome to the broker and the mirrored job row.
pub(crate) async fn settle(
    context: &WorkerContext,
    queue_name: &str,
    task: &Task,
    outcome: Result<(), TaskError>,
) {
    match outcome {
        Ok(()) => {
            if let Ok(Some(job)) =
                EnrichmentJobs::get_by_task_id(&context.database, &task.id.to_string()).await
            {
                if let Err(error) = EnrichmentJobs::mark_completed(&context.database, job.id).await {
                    tracing::warn!(%error, task_id = %task.id, "failed to mark job completed");
                }
            }

            if let Err(error) = context.queue.complete(queue_name, task).await {
                tracing::warn!(%error, task_id = %task.id, "failed to ack completed task");
            }
        }
        Err(TaskError::Fatal(message)) => {
            tracing::warn!(task_id = %task.id, reason = %message, "task failed permanently");
            mark_mirrored_failed(&context.database, task, &message).await;

            if let Err(error) = context.queue.fail(queue_name, task).await {
                tracing::warn!(%error, task_id = %task.id, "failed to drop failed task");
            }
        }
        Err(TaskError::Retry(message)) => {
            match context.queue.retry_later(queue_name, task).await {
                Ok(Some(next_retry_at)) => {
                    tracing::info!(task_id = %task.id, reason = %message, %next_retry_at, "task failed, retry scheduled");
                    if let Ok(Some(job)) =
                        EnrichmentJobs::get_by_task_id(&context.database, &task.id.to_string())
                            .await
                    {
                        let _ = EnrichmentJobs::mark_failed(
                            &context.database,
                            job.id,
                            &message,
                            Some(next_retry_at),
                        )
                        .await;
                        let _ = EnrichmentJobs::mark_pending_retry(
                            &context.database,
                            job.id,
                            next_retry_at,
                        )
                        .await;
                    }
                }
                Ok(None) => {
                    tracing::warn!(task_id = %task.id, reason = %message, "task failed with no retry budget left");
                    mark_mirrored_failed(&context.database, task, &message).await;
                }
                Err(error) => {
                    tracing::error!(%error, task_id = %task.id, "failed to schedule retry");
                }
            }
        }
    }
}

async fn mark_mirrored_failed(database: &DatabaseConnection, task: &Task, message: &str) {
    match EnrichmentJobs::get_by_task_id(database, &task.id.to_string()).await {
        Ok(Some(job)) => {
            if let Err(error) = EnrichmentJobs::mark_failed(database, job.id, message, None).await {
                tracing::warn!(%error, task_id = %task.id, "failed to mark job failed");
            }
        }
        Ok(None) => {
            tracing::warn!(task_id = %task.id, "no mirrored job row for failed task");
        }
        Err(error) => {
            tracing::warn!(%error, task_id = %task.id, "failed to look up mirrored job");
        }
    }
}
