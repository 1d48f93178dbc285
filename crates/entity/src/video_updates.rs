use entity_types::{jiff_compat::JiffTimestampMilliseconds, update::UpdateKind};
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// Append-only history of what each notification did to a video, in commit
/// order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "video_updates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub webhook_event_id: i64,
    pub video_id: String,
    pub channel_id: String,
    pub title_at_event: String,
    pub published_at: JiffTimestampMilliseconds,
    pub updated_at: JiffTimestampMilliseconds,
    pub update_kind: UpdateKind,
    pub created_at: JiffTimestampMilliseconds,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::webhook_events::Entity",
        from = "Column::WebhookEventId",
        to = "super::webhook_events::Column::Id"
    )]
    WebhookEvent,
}

impl Related<super::webhook_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebhookEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
