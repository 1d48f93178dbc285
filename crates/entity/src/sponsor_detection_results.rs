use entity_types::jiff_compat::JiffTimestampMilliseconds;
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "sponsor_detection_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub detection_job_id: String,
    pub video_id: String,
    pub prompt_id: i64,
    pub raw_llm_body: String,
    pub duration_ms: i64,
    pub created_at: JiffTimestampMilliseconds,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sponsor_detection_jobs::Entity",
        from = "Column::DetectionJobId",
        to = "super::sponsor_detection_jobs::Column::Id"
    )]
    DetectionJob,
}

impl Related<super::sponsor_detection_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DetectionJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
