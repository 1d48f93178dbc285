use sea_orm::{DeriveActiveEnum, EnumIter};
use serde_derive::{Deserialize, Serialize};

/// Classification of a single push notification relative to the video row it
/// landed on, decided before the projection writes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    #[sea_orm(string_value = "new_video")]
    NewVideo,
    #[sea_orm(string_value = "title_update")]
    TitleUpdate,
    #[sea_orm(string_value = "unknown")]
    Unknown,
}
