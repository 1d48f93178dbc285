use entity_types::jiff_compat::JiffTimestampMilliseconds;
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// One row per notification the hub delivered, raw bytes included, kept
/// forever. Only the processing-status columns may ever change after insert;
/// the schema enforces this with triggers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub raw_payload: String,
    /// SHA-256 hex over `raw_payload`; globally unique, which is what makes
    /// replays collapse into a single row.
    #[sea_orm(unique)]
    pub content_hash: String,
    pub video_id: Option<String>,
    pub channel_id: Option<String>,
    pub received_at: JiffTimestampMilliseconds,
    pub processed: bool,
    pub processed_at: Option<JiffTimestampMilliseconds>,
    pub processing_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
