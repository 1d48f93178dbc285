use entity_types::jiff_compat::JiffTimestampMilliseconds;
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// Data API payload for a video, one row per video, replaced wholesale on
/// re-enrichment. Absent API fields stay NULL; the empty-string/NULL
/// distinction matters to downstream consumers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "video_enrichments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub video_id: String,
    pub description: Option<String>,
    pub tags: Option<Json>,
    pub duration: Option<String>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub thumbnails: Option<Json>,
    pub privacy_status: Option<String>,
    pub upload_status: Option<String>,
    pub embeddable: Option<bool>,
    pub live_scheduled_start: Option<JiffTimestampMilliseconds>,
    pub live_actual_start: Option<JiffTimestampMilliseconds>,
    pub live_actual_end: Option<JiffTimestampMilliseconds>,
    pub location_latitude: Option<f64>,
    pub location_longitude: Option<f64>,
    pub location_description: Option<String>,
    pub content_rating: Option<Json>,
    pub raw_api_body: Json,
    pub requested_parts: String,
    pub quota_cost: i32,
    pub enriched_at: JiffTimestampMilliseconds,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
