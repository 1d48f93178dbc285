use entity::{sponsor_detection_jobs, sponsor_detection_results, sponsor_findings, sponsor_prompts};
use entity_types::sponsor::DetectionStatus;
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::{NotSet, Set},
    ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _, TransactionTrait,
};
use sha2::{Digest as _, Sha256};

use super::{RepoError, now_ms};

/// One detected sponsor, ready to be written.
#[derive(Debug, Clone)]
pub struct FindingRecord {
    pub name: String,
    pub confidence: f64,
    pub evidence_text: String,
}

pub struct SponsorDetection;

impl SponsorDetection {
    /// Look the prompt up by its text hash, inserting it on first use so
    /// every stored result can point back at the exact wording.
    pub async fn get_or_create_prompt<C: ConnectionTrait>(
        db: &C,
        prompt_text: &str,
    ) -> Result<sponsor_prompts::Model, RepoError> {
        let text_hash = hex::encode(Sha256::digest(prompt_text.as_bytes()));

        if let Some(prompt) = sponsor_prompts::Entity::find()
            .filter(sponsor_prompts::Column::TextHash.eq(&text_hash))
            .one(db)
            .await?
        {
            return Ok(prompt);
        }

        let inserted = sponsor_prompts::Entity::insert(sponsor_prompts::ActiveModel {
            id: NotSet,
            text_hash: Set(text_hash.clone()),
            prompt_text: Set(prompt_text.to_owned()),
            created_at: Set(now_ms()),
        })
        .exec(db)
        .await;

        match inserted.map_err(RepoError::from) {
            Ok(result) => sponsor_prompts::Entity::find_by_id(result.last_insert_id)
                .one(db)
                .await?
                .ok_or(RepoError::NotFound),
            // Lost the insert race; the other writer's row is just as good.
            Err(RepoError::DuplicateKey) => sponsor_prompts::Entity::find()
                .filter(sponsor_prompts::Column::TextHash.eq(&text_hash))
                .one(db)
                .await?
                .ok_or(RepoError::NotFound),
            Err(error) => Err(error),
        }
    }

    pub async fn create_job<C: ConnectionTrait>(
        db: &C,
        id: &str,
        video_id: &str,
    ) -> Result<sponsor_detection_jobs::Model, RepoError> {
        sponsor_detection_jobs::Entity::insert(sponsor_detection_jobs::ActiveModel {
            id: Set(id.to_owned()),
            video_id: Set(video_id.to_owned()),
            status: Set(DetectionStatus::Pending),
            error_message: Set(None),
            created_at: Set(now_ms()),
            completed_at: Set(None),
        })
        .exec(db)
        .await?;

        sponsor_detection_jobs::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(RepoError::NotFound)
    }

    pub async fn get_job<C: ConnectionTrait>(
        db: &C,
        id: &str,
    ) -> Result<Option<sponsor_detection_jobs::Model>, RepoError> {
        Ok(sponsor_detection_jobs::Entity::find_by_id(id).one(db).await?)
    }

    pub async fn mark_job<C: ConnectionTrait>(
        db: &C,
        id: &str,
        status: DetectionStatus,
        error_message: Option<String>,
    ) -> Result<(), RepoError> {
        let completed_at = match status {
            DetectionStatus::Completed | DetectionStatus::Failed | DetectionStatus::Skipped => {
                Some(now_ms())
            }
            DetectionStatus::Pending | DetectionStatus::Processing => None,
        };

        sponsor_detection_jobs::ActiveModel {
            id: Set(id.to_owned()),
            status: Set(status),
            error_message: Set(error_message),
            completed_at: Set(completed_at),
            ..Default::default()
        }
        .update(db)
        .await?;

        Ok(())
    }

    /// Findings, the result row, and the job transition land in one
    /// transaction. A redelivered task hits the unique detection-job index
    /// and is treated as already saved.
    pub async fn save_results<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        detection_job_id: &str,
        video_id: &str,
        prompt_id: i64,
        findings: &[FindingRecord],
        raw_llm_body: &str,
        duration_ms: i64,
    ) -> Result<(), RepoError> {
        let txn = db.begin().await?;

        let inserted = sponsor_detection_results::Entity::insert(
            sponsor_detection_results::ActiveModel {
                id: NotSet,
                detection_job_id: Set(detection_job_id.to_owned()),
                video_id: Set(video_id.to_owned()),
                prompt_id: Set(prompt_id),
                raw_llm_body: Set(raw_llm_body.to_owned()),
                duration_ms: Set(duration_ms),
                created_at: Set(now_ms()),
            },
        )
        .exec(&txn)
        .await;

        if let Err(error) = inserted {
            return match RepoError::from(error) {
                RepoError::DuplicateKey => Ok(()),
                error => Err(error),
            };
        }

        for finding in findings {
            sponsor_findings::Entity::insert(sponsor_findings::ActiveModel {
                id: NotSet,
                detection_job_id: Set(detection_job_id.to_owned()),
                name: Set(finding.name.clone()),
                confidence: Set(finding.confidence),
                evidence_text: Set(finding.evidence_text.clone()),
            })
            .exec(&txn)
            .await?;
        }

        sponsor_detection_jobs::ActiveModel {
            id: Set(detection_job_id.to_owned()),
            status: Set(DetectionStatus::Completed),
            completed_at: Set(Some(now_ms())),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        txn.commit().await?;

        Ok(())
    }
}
