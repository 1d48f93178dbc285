use entity_types::{jiff_compat::JiffTimestampMilliseconds, subscription::SubscriptionStatus};
use sea_orm::entity::prelude::*;
use serde_derive::Serialize;

/// One hub subscription per channel. `topic_url` is derived from the channel
/// id, so the pair is redundant but both are kept for operator queries.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub channel_id: String,
    pub topic_url: String,
    pub callback_url: String,
    pub hub_url: String,
    pub secret: String,
    pub lease_seconds: i64,
    pub expires_at: Option<JiffTimestampMilliseconds>,
    pub status: SubscriptionStatus,
    pub renewal_attempts: i32,
    /// Backoff gate for the sweeper; a failed renewal pushes this forward.
    pub next_renewal_at: Option<JiffTimestampMilliseconds>,
    pub last_renewal_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
