use entity_types::{
    jiff_compat::JiffTimestampMilliseconds,
    job::{JobStatus, JobType},
};
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// Durable mirror of a broker task. The broker owns delivery; this row gives
/// operators a query surface for lifecycle, attempts, and errors.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "enrichment_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub external_task_id: Option<String>,
    pub job_type: JobType,
    pub video_id: Option<String>,
    pub channel_id: Option<String>,
    pub status: JobStatus,
    pub priority: i32,
    pub scheduled_at: JiffTimestampMilliseconds,
    pub started_at: Option<JiffTimestampMilliseconds>,
    pub completed_at: Option<JiffTimestampMilliseconds>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_retry_at: Option<JiffTimestampMilliseconds>,
    pub error_message: Option<String>,
    pub metadata: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
