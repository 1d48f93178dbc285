use sea_orm::{DeriveActiveEnum, EnumIter};
use serde_derive::{Deserialize, Serialize};

/// What a queued task asks a worker to do. Also the discriminator on the
/// mirrored job row, so operators can filter without decoding payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[sea_orm(string_value = "video_enrich")]
    VideoEnrich,
    #[sea_orm(string_value = "channel_enrich")]
    ChannelEnrich,
    #[sea_orm(string_value = "sponsor_detect")]
    SponsorDetect,
}

/// Lifecycle of a mirrored job row.
///
/// pending -> processing -> completed | failed; a failed job re-enters
/// pending (broker redelivery) while its attempt budget lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}
