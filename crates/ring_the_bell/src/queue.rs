use entity_types::job::JobType;
use jiff::Timestamp;
use redis::{AsyncCommands as _, aio::ConnectionManager};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::EnrichmentJobs;

pub const DEFAULT_QUEUE: &str = "default";
pub const SPONSOR_QUEUE: &str = "sponsor_detection";

pub const MAX_RETRIES: u32 = 3;
/// How long a reserved task may sit with a worker before the reaper hands it
/// out again.
pub const VISIBILITY_TIMEOUT_SECS: i64 = 5 * 60;

/// Each priority point pulls a task this many milliseconds ahead of its
/// enqueue time in the ready ordering.
const PRIORITY_WEIGHT_MS: i64 = 1_000;

/// Broker envelope around a job payload. The payload itself is the wire
/// format workers decode; everything else is delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub job_type: JobType,
    pub attempts: u32,
    pub max_retries: u32,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEnrichPayload {
    pub video_id: String,
    pub channel_id: String,
    pub priority: i32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEnrichPayload {
    pub channel_id: String,
    pub priority: i32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorDetectPayload {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub detection_job_id: Uuid,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

/// Redis-backed priority queue. Ready tasks live in a sorted set scored by
/// availability time (priority-weighted); reserved tasks move to a
/// processing set scored by their visibility deadline.
#[derive(Clone)]
pub struct QueueClient {
    redis: ConnectionManager,
}

impl QueueClient {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn queue_key(queue: &str) -> String {
        format!("rtb:queue:{queue}")
    }

    fn processing_key(queue: &str) -> String {
        format!("rtb:processing:{queue}")
    }

    pub async fn submit(
        &self,
        queue: &str,
        job_type: JobType,
        priority: i32,
        payload: serde_json::Value,
    ) -> Result<Task, QueueError> {
        let task = Task {
            id: Uuid::new_v4(),
            job_type,
            attempts: 0,
            max_retries: MAX_RETRIES,
            payload,
        };

        let member = serde_json::to_string(&task)?;
        let score = available_score(now_millis(), priority);

        let mut redis = self.redis.clone();
        let _: () = redis.zadd(Self::queue_key(queue), member, score).await?;

        tracing::debug!(task_id = %task.id, ?job_type, queue, priority, "task enqueued");

        Ok(task)
    }

    /// Pop the next ready task, moving it into the processing set with a
    /// visibility deadline. `None` when the queue is empty or the head is
    /// not due yet.
    pub async fn reserve(&self, queue: &str) -> Result<Option<Task>, QueueError> {
        let mut redis = self.redis.clone();

        let popped: Vec<(String, f64)> = redis.zpopmin(Self::queue_key(queue), 1).await?;
        let Some((member, score)) = popped.into_iter().next() else {
            return Ok(None);
        };

        let now = now_millis();
        if score > now as f64 {
            // Head of the queue is scheduled for later; put it back.
            let _: () = redis.zadd(Self::queue_key(queue), member, score).await?;
            return Ok(None);
        }

        let mut task = match serde_json::from_str::<Task>(&member) {
            Ok(task) => task,
            Err(error) => {
                // Nothing sane to retry; drop the member so it cannot wedge
                // the queue head forever.
                tracing::error!(%error, queue, member, "dropping undecodable task");
                return Ok(None);
            }
        };

        task.attempts += 1;

        let deadline = now + VISIBILITY_TIMEOUT_SECS * 1_000;
        let reserved = serde_json::to_string(&task)?;
        let _: () = redis
            .zadd(Self::processing_key(queue), reserved, deadline as f64)
            .await?;

        Ok(Some(task))
    }

    pub async fn complete(&self, queue: &str, task: &Task) -> Result<(), QueueError> {
        self.remove_from_processing(queue, task).await
    }

    /// Non-retryable failure: drop from processing and let the mirrored job
    /// row carry the reason.
    pub async fn fail(&self, queue: &str, task: &Task) -> Result<(), QueueError> {
        self.remove_from_processing(queue, task).await
    }

    /// Retryable failure. Returns the time of the next attempt, or `None`
    /// when the attempt budget is spent and the task is dropped.
    pub async fn retry_later(
        &self,
        queue: &str,
        task: &Task,
    ) -> Result<Option<Timestamp>, QueueError> {
        self.remove_from_processing(queue, task).await?;

        if task.attempts >= task.max_retries {
            return Ok(None);
        }

        let delay_ms = retry_backoff_secs(task.attempts) * 1_000;
        let available_at = now_millis() + delay_ms;

        let member = serde_json::to_string(task)?;
        let mut redis = self.redis.clone();
        let _: () = redis
            .zadd(Self::queue_key(queue), member, available_at as f64)
            .await?;

        Ok(Some(
            Timestamp::from_millisecond(available_at).expect("epoch millis stay in range"),
        ))
    }

    /// Re-deliver tasks whose visibility deadline passed. Tasks with budget
    /// left go back on the queue; the exhausted ones are returned so the
    /// caller can mark their mirrored jobs as terminally failed.
    pub async fn reap(&self, queue: &str) -> Result<Vec<Task>, QueueError> {
        let mut redis = self.redis.clone();
        let now = now_millis() as f64;

        let expired: Vec<String> = redis
            .zrangebyscore_limit(Self::processing_key(queue), "-inf", now, 0, 64)
            .await?;

        let mut exhausted = Vec::new();

        for member in expired {
            // Only one reaper wins the removal; the losers skip the member.
            let removed: i64 = redis.zrem(Self::processing_key(queue), &member).await?;
            if removed == 0 {
                continue;
            }

            let task = match serde_json::from_str::<Task>(&member) {
                Ok(task) => task,
                Err(error) => {
                    tracing::error!(%error, queue, member, "dropping undecodable expired task");
                    continue;
                }
            };

            if task.attempts >= task.max_retries {
                tracing::warn!(task_id = %task.id, queue, attempts = task.attempts, "task expired with no retry budget left");
                exhausted.push(task);
            } else {
                tracing::debug!(task_id = %task.id, queue, "re-delivering expired task");
                let _: () = redis
                    .zadd(Self::queue_key(queue), &member, now_millis() as f64)
                    .await?;
            }
        }

        Ok(exhausted)
    }

    async fn remove_from_processing(&self, queue: &str, task: &Task) -> Result<(), QueueError> {
        let member = serde_json::to_string(task)?;
        let mut redis = self.redis.clone();
        let _: () = redis.zrem(Self::processing_key(queue), member).await?;

        Ok(())
    }
}

/// Submit a video-enrichment task and mirror it into the job table. The
/// mirror write is best-effort: a failure there is logged and the broker
/// submission stands, since the worker can still reconcile by task id.
pub async fn enqueue_video_enrichment(
    database: &DatabaseConnection,
    queue: &QueueClient,
    video_id: &str,
    channel_id: &str,
    priority: i32,
) -> Result<Task, QueueError> {
    let payload = VideoEnrichPayload {
        video_id: video_id.to_owned(),
        channel_id: channel_id.to_owned(),
        priority,
        metadata: serde_json::json!({}),
    };

    let task = queue
        .submit(
            DEFAULT_QUEUE,
            JobType::VideoEnrich,
            priority,
            serde_json::to_value(&payload)?,
        )
        .await?;

    if let Err(error) = EnrichmentJobs::create(
        database,
        &task.id.to_string(),
        JobType::VideoEnrich,
        Some(video_id),
        Some(channel_id),
        priority,
        MAX_RETRIES as i32,
        payload.metadata,
    )
    .await
    {
        tracing::warn!(%error, task_id = %task.id, "failed to mirror task into the job table");
    }

    Ok(task)
}

pub async fn enqueue_channel_enrichment(
    database: &DatabaseConnection,
    queue: &QueueClient,
    channel_id: &str,
    priority: i32,
) -> Result<Task, QueueError> {
    let payload = ChannelEnrichPayload {
        channel_id: channel_id.to_owned(),
        priority,
        metadata: serde_json::json!({}),
    };

    let task = queue
        .submit(
            DEFAULT_QUEUE,
            JobType::ChannelEnrich,
            priority,
            serde_json::to_value(&payload)?,
        )
        .await?;

    if let Err(error) = EnrichmentJobs::create(
        database,
        &task.id.to_string(),
        JobType::ChannelEnrich,
        None,
        Some(channel_id),
        priority,
        MAX_RETRIES as i32,
        payload.metadata,
    )
    .await
    {
        tracing::warn!(%error, task_id = %task.id, "failed to mirror task into the job table");
    }

    Ok(task)
}

pub async fn enqueue_sponsor_detection(
    database: &DatabaseConnection,
    queue: &QueueClient,
    payload: SponsorDetectPayload,
) -> Result<Task, QueueError> {
    let video_id = payload.video_id.clone();
    let metadata = payload.metadata.clone();

    let task = queue
        .submit(
            SPONSOR_QUEUE,
            JobType::SponsorDetect,
            0,
            serde_json::to_value(&payload)?,
        )
        .await?;

    if let Err(error) = EnrichmentJobs::create(
        database,
        &task.id.to_string(),
        JobType::SponsorDetect,
        Some(&video_id),
        None,
        0,
        MAX_RETRIES as i32,
        metadata,
    )
    .await
    {
        tracing::warn!(%error, task_id = %task.id, "failed to mirror task into the job table");
    }

    Ok(task)
}

fn now_millis() -> i64 {
    Timestamp::now().as_millisecond()
}

fn available_score(now_ms: i64, priority: i32) -> f64 {
    (now_ms - priority as i64 * PRIORITY_WEIGHT_MS) as f64
}

/// 30s, 60s, 120s, ...
fn retry_backoff_secs(attempts: u32) -> i64 {
    30 * 2i64.saturating_pow(attempts.saturating_sub(1).min(8))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn video_payload_matches_wire_format() {
        let payload = VideoEnrichPayload {
            video_id: "dQw4w9WgXcQ".to_owned(),
            channel_id: "UCuAXFkgsw1L7xaCfnd5JJOw".to_owned(),
            priority: 5,
            metadata: serde_json::json!({}),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "video_id": "dQw4w9WgXcQ",
                "channel_id": "UCuAXFkgsw1L7xaCfnd5JJOw",
                "priority": 5,
                "metadata": {},
            })
        );
    }

    #[test]
    fn channel_payload_matches_wire_format() {
        let payload = ChannelEnrichPayload {
            channel_id: "UCuAXFkgsw1L7xaCfnd5JJOw".to_owned(),
            priority: 0,
            metadata: serde_json::json!({}),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "channel_id": "UCuAXFkgsw1L7xaCfnd5JJOw",
                "priority": 0,
                "metadata": {},
            })
        );
    }

    #[test]
    fn sponsor_payload_roundtrips() {
        let detection_job_id = Uuid::new_v4();
        let payload = SponsorDetectPayload {
            video_id: "vid1".to_owned(),
            title: "Ex".to_owned(),
            description: "Thanks to Acme for sponsoring".to_owned(),
            detection_job_id,
            metadata: serde_json::json!({}),
        };

        let decoded: SponsorDetectPayload =
            serde_json::from_value(serde_json::to_value(&payload).unwrap()).unwrap();
        assert_eq!(decoded.detection_job_id, detection_job_id);
        assert_eq!(decoded.description, payload.description);
    }

    #[test]
    fn higher_priority_sorts_ahead_at_equal_enqueue_time() {
        let now = 1_700_000_000_000;
        assert!(available_score(now, 10) < available_score(now, 0));
    }

    #[test]
    fn earlier_enqueue_wins_at_equal_priority() {
        assert!(available_score(1_000, 5) < available_score(2_000, 5));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(retry_backoff_secs(1), 30);
        assert_eq!(retry_backoff_secs(2), 60);
        assert_eq!(retry_backoff_secs(3), 120);
    }

    #[test]
    fn task_envelope_roundtrips() {
        let task = Task {
            id: Uuid::new_v4(),
            job_type: JobType::VideoEnrich,
            attempts: 1,
            max_retries: MAX_RETRIES,
            payload: serde_json::json!({"video_id": "vid1"}),
        };

        let decoded: Task = serde_json::from_str(&serde_json::to_string(&task).unwrap()).unwrap();
        assert_eq!(decoded.id, task.id);
        assert_eq!(decoded.attempts, 1);
    }
}
