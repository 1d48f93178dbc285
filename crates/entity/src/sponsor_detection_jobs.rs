use entity_types::{jiff_compat::JiffTimestampMilliseconds, sponsor::DetectionStatus};
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "sponsor_detection_jobs")]
pub struct Model {
    /// UUID assigned at enqueue time; doubles as the idempotency key for
    /// result writes.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub video_id: String,
    pub status: DetectionStatus,
    pub error_message: Option<String>,
    pub created_at: JiffTimestampMilliseconds,
    pub completed_at: Option<JiffTimestampMilliseconds>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
