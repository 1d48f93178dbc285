use entity::enrichment_jobs;
use entity_types::{
    jiff_compat::JiffTimestampMilliseconds,
    job::{JobStatus, JobType},
};
use jiff::Timestamp;
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::{NotSet, Set},
    ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _, QueryOrder as _,
    QuerySelect as _,
};

use super::{RepoError, now_ms};

pub struct EnrichmentJobs;

impl EnrichmentJobs {
    /// Mirror a freshly submitted broker task. The broker remains the source
    /// of truth for delivery; this row is the operator's view.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        external_task_id: &str,
        job_type: JobType,
        video_id: Option<&str>,
        channel_id: Option<&str>,
        priority: i32,
        max_attempts: i32,
        metadata: serde_json::Value,
    ) -> Result<i64, RepoError> {
        let result = enrichment_jobs::Entity::insert(enrichment_jobs::ActiveModel {
            id: NotSet,
            external_task_id: Set(Some(external_task_id.to_owned())),
            job_type: Set(job_type),
            video_id: Set(video_id.map(str::to_owned)),
            channel_id: Set(channel_id.map(str::to_owned)),
            status: Set(JobStatus::Pending),
            priority: Set(priority),
            scheduled_at: Set(now_ms()),
            started_at: Set(None),
            completed_at: Set(None),
            attempts: Set(0),
            max_attempts: Set(max_attempts),
            next_retry_at: Set(None),
            error_message: Set(None),
            metadata: Set(metadata),
        })
        .exec(db)
        .await?;

        Ok(result.last_insert_id)
    }

    pub async fn get_by_task_id<C: ConnectionTrait>(
        db: &C,
        external_task_id: &str,
    ) -> Result<Option<enrichment_jobs::Model>, RepoError> {
        Ok(enrichment_jobs::Entity::find()
            .filter(enrichment_jobs::Column::ExternalTaskId.eq(external_task_id))
            .one(db)
            .await?)
    }

    pub async fn mark_processing<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<(), RepoError> {
        let job = enrichment_jobs::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(RepoError::NotFound)?;

        let attempts = job.attempts + 1;

        let mut job: enrichment_jobs::ActiveModel = job.into();
        job.status = Set(JobStatus::Processing);
        job.started_at = Set(Some(now_ms()));
        job.attempts = Set(attempts);
        job.update(db).await?;

        Ok(())
    }

    pub async fn mark_completed<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), RepoError> {
        enrichment_jobs::ActiveModel {
            id: Set(id),
            status: Set(JobStatus::Completed),
            completed_at: Set(Some(now_ms())),
            error_message: Set(None),
            next_retry_at: Set(None),
            ..Default::default()
        }
        .update(db)
        .await?;

        Ok(())
    }

    pub async fn mark_failed<C: ConnectionTrait>(
        db: &C,
        id: i64,
        message: &str,
        next_retry_at: Option<Timestamp>,
    ) -> Result<(), RepoError> {
        enrichment_jobs::ActiveModel {
            id: Set(id),
            status: Set(JobStatus::Failed),
            completed_at: Set(Some(now_ms())),
            error_message: Set(Some(message.to_owned())),
            next_retry_at: Set(next_retry_at.map(JiffTimestampMilliseconds)),
            ..Default::default()
        }
        .update(db)
        .await?;

        Ok(())
    }

    /// A failed job going back onto the broker re-enters pending.
    pub async fn mark_pending_retry<C: ConnectionTrait>(
        db: &C,
        id: i64,
        next_retry_at: Timestamp,
    ) -> Result<(), RepoError> {
        enrichment_jobs::ActiveModel {
            id: Set(id),
            status: Set(JobStatus::Pending),
            next_retry_at: Set(Some(JiffTimestampMilliseconds(next_retry_at))),
            ..Default::default()
        }
        .update(db)
        .await?;

        Ok(())
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        status: Option<JobStatus>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<enrichment_jobs::Model>, RepoError> {
        let mut query = enrichment_jobs::Entity::find();
        if let Some(status) = status {
            query = query.filter(enrichment_jobs::Column::Status.eq(status));
        }

        Ok(query
            .order_by_desc(enrichment_jobs::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await?)
    }
}
