use entity_types::jiff_compat::{JiffCivilDate, JiffTimestampMilliseconds};
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// One row per UTC calendar day of API spending. `quota_used` only ever goes
/// up within a day.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "quota_days")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: JiffCivilDate,
    pub quota_used: i64,
    pub quota_limit: i64,
    pub operations_count: i64,
    /// Map of operation kind (`videos.list`, ...) to call count.
    pub per_operation_counts: Json,
    pub updated_at: JiffTimestampMilliseconds,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
