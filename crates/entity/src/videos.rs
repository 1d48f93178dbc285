use entity_types::jiff_compat::JiffTimestampMilliseconds;
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// Current state of a video. `published_at` keeps its first-seen value for
/// the life of the row; `title` tracks whatever the latest notification said.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "videos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub video_url: String,
    pub published_at: JiffTimestampMilliseconds,
    pub last_updated_at: JiffTimestampMilliseconds,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::channels::Entity",
        from = "Column::ChannelId",
        to = "super::channels::Column::ChannelId"
    )]
    Channel,
}

impl Related<super::channels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Channel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
