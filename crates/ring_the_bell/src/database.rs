use entity_types::jiff_compat::JiffTimestampMilliseconds;
use jiff::Timestamp;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

pub mod blocked_videos;
pub mod channels;
pub mod enrichment_jobs;
pub mod enrichments;
pub mod quota_days;
pub mod sponsor_detection;
pub mod subscriptions;
pub mod video_updates;
pub mod videos;
pub mod webhook_events;

pub use blocked_videos::BlockedVideoSet;
pub use channels::Channels;
pub use enrichment_jobs::EnrichmentJobs;
pub use enrichments::{ChannelEnrichments, VideoEnrichments};
pub use quota_days::QuotaDays;
pub use sponsor_detection::SponsorDetection;
pub use subscriptions::Subscriptions;
pub use video_updates::VideoUpdates;
pub use videos::Videos;
pub use webhook_events::WebhookEvents;

/// Database failures classified along the lines callers branch on. Anything
/// not worth a dedicated arm stays wrapped as [`RepoError::Db`].
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate key")]
    DuplicateKey,
    #[error("foreign key violation")]
    ForeignKeyViolation,
    #[error("attempted to change an immutable record")]
    ImmutableRecord,
    #[error(transparent)]
    Db(DbErr),
}

impl From<DbErr> for RepoError {
    fn from(error: DbErr) -> Self {
        // The append-only triggers surface as a plain execution error with
        // our RAISE(ABORT) message in it.
        if error.to_string().contains("immutable") {
            return RepoError::ImmutableRecord;
        }

        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => RepoError::DuplicateKey,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => RepoError::ForeignKeyViolation,
            _ => match error {
                DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
                error => RepoError::Db(error),
            },
        }
    }
}

pub(crate) fn now_ms() -> JiffTimestampMilliseconds {
    JiffTimestampMilliseconds(Timestamp::now())
}
