use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// One detected sponsor per row, attached to a detection job.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "sponsor_findings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub detection_job_id: String,
    pub name: String,
    /// Clamped to [0, 1] before the write.
    pub confidence: f64,
    pub evidence_text: String,
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
