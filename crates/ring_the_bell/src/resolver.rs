use sea_orm::DatabaseConnection;
use thiserror::Error;
use url::Url;

use crate::{
    database::{ChannelEnrichments, Channels, RepoError},
    error::YoutubeApiError,
    quota::{QuotaManager, cost, op},
    subscription::SubscriptionManager,
    youtube::{YouTubeApi, channel_enrichment_row},
};

/// How a free-form channel URL names its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `/@handle`
    Handle(String),
    /// `/channel/UC…`, no lookup needed
    Id(String),
    /// `/c/<vanity>`, only findable through search
    Custom(String),
    /// `/user/<legacy name>`
    Username(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("not a recognizable youtube channel url: {0}")]
    UnsupportedUrlForm(String),
    #[error("no channel matched {0:?}")]
    NotFound(String),
    #[error("daily api budget exhausted")]
    QuotaExhausted,
    #[error(transparent)]
    Api(#[from] YoutubeApiError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug)]
pub struct ResolvedChannel {
    pub channel_id: String,
    pub enrichment: entity::channel_enrichments::Model,
    pub quota_cost: i64,
}

/// Decide which lookup a URL calls for, without touching the network.
pub fn classify_channel_url(input: &str) -> Result<ChannelRef, ResolveError> {
    let unsupported = || ResolveError::UnsupportedUrlForm(input.to_owned());

    let url = Url::parse(input).map_err(|_| unsupported())?;

    let host = url.host_str().ok_or_else(unsupported)?.to_ascii_lowercase();
    if !host.contains("youtube.com") && !host.contains("youtu.be") {
        return Err(unsupported());
    }

    let mut segments = url.path_segments().ok_or_else(unsupported)?;
    let first = segments.next().filter(|segment| !segment.is_empty());

    match first {
        Some(handle) if handle.starts_with('@') => {
            Ok(ChannelRef::Handle(handle.to_owned()))
        }
        Some("channel") => {
            let id = segments.next().ok_or_else(unsupported)?;
            // UC followed by the 22-character suffix.
            if id.len() == 24 && id.starts_with("UC") {
                Ok(ChannelRef::Id(id.to_owned()))
            } else {
                Err(unsupported())
            }
        }
        Some("c") => {
            let custom = segments.next().filter(|s| !s.is_empty()).ok_or_else(unsupported)?;
            Ok(ChannelRef::Custom(custom.to_owned()))
        }
        Some("user") => {
            let username = segments.next().filter(|s| !s.is_empty()).ok_or_else(unsupported)?;
            Ok(ChannelRef::Username(username.to_owned()))
        }
        _ => Err(unsupported()),
    }
}

/// Resolve a URL to its canonical channel id, then pull and persist the full
/// channel details. Quota is checked up front for the whole planned spend
/// and recorded per operation afterwards.
pub async fn resolve_channel_url(
    database: &DatabaseConnection,
    api: &YouTubeApi,
    quota: &QuotaManager,
    input: &str,
) -> Result<ResolvedChannel, ResolveError> {
    let channel_ref = classify_channel_url(input)?;

    let lookup_cost = match &channel_ref {
        ChannelRef::Id(_) => 0,
        ChannelRef::Handle(_) | ChannelRef::Username(_) => cost::CHANNELS_LIST,
        ChannelRef::Custom(_) => cost::SEARCH_LIST,
    };
    let planned_cost = lookup_cost + cost::CHANNEL_DETAILS;

    let (allowed, info) = quota.check_available(planned_cost).await?;
    if !allowed {
        tracing::warn!(
            used = info.used,
            threshold = info.threshold,
            planned_cost,
            "refusing channel resolution, quota exhausted"
        );
        return Err(ResolveError::QuotaExhausted);
    }

    let channel_id = match &channel_ref {
        ChannelRef::Id(id) => id.clone(),
        ChannelRef::Handle(handle) => {
            let response = api.channel_by_handle(handle).await?;
            quota.record_usage(cost::CHANNELS_LIST, op::CHANNELS_LIST).await?;
            first_channel_id(response.items).ok_or_else(|| ResolveError::NotFound(input.to_owned()))?
        }
        ChannelRef::Username(username) => {
            let response = api.channel_by_username(username).await?;
            quota.record_usage(cost::CHANNELS_LIST, op::CHANNELS_LIST).await?;
            first_channel_id(response.items).ok_or_else(|| ResolveError::NotFound(input.to_owned()))?
        }
        ChannelRef::Custom(custom) => {
            let response = api.search_channel(custom).await?;
            quota.record_usage(cost::SEARCH_LIST, op::SEARCH_LIST).await?;
            response
                .items
                .and_then(|items| items.into_iter().next())
                .and_then(|result| result.id)
                .and_then(|id| id.channel_id)
                .ok_or_else(|| ResolveError::NotFound(input.to_owned()))?
        }
    };

    let response = api.channel_details(&channel_id).await?;
    quota.record_usage(cost::CHANNEL_DETAILS, op::CHANNELS_LIST).await?;

    let channel = response
        .items
        .and_then(|items| items.into_iter().next())
        .ok_or_else(|| ResolveError::NotFound(channel_id.clone()))?;

    let enrichment = channel_enrichment_row(&channel, planned_cost as i32)
        .ok_or_else(|| ResolveError::NotFound(channel_id.clone()))?;

    // Make sure the channel row exists before the enrichment references it,
    // and let the API's canonical title win.
    let title = enrichment.title.clone().unwrap_or_else(|| channel_id.clone());
    let channel_url = format!("https://www.youtube.com/channel/{channel_id}");
    Channels::upsert(database, &channel_id, &title, &channel_url).await?;
    ChannelEnrichments::upsert(database, enrichment.clone()).await?;

    Ok(ResolvedChannel {
        channel_id,
        enrichment,
        quota_cost: planned_cost,
    })
}

/// Resolve a URL and bring the channel under subscription. Intended as the
/// one call an operator-facing surface needs for "start watching this
/// channel". A hub refusal is logged on the subscription row but does not
/// undo the resolution.
pub async fn onboard_channel_url(
    database: &DatabaseConnection,
    api: &YouTubeApi,
    quota: &QuotaManager,
    subscriptions: &SubscriptionManager,
    input: &str,
) -> Result<ResolvedChannel, ResolveError> {
    let resolved = resolve_channel_url(database, api, quota, input).await?;

    if let Err(error) = subscriptions.subscribe_channel(&resolved.channel_id).await {
        tracing::warn!(
            channel_id = resolved.channel_id,
            %error,
            "resolved channel could not be subscribed yet"
        );
    }

    Ok(resolved)
}

fn first_channel_id(items: Option<Vec<google_youtube3::api::Channel>>) -> Option<String> {
    items?.into_iter().next()?.id
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn handle_urls_classify() {
        assert_eq!(
            classify_channel_url("https://www.youtube.com/@Example").unwrap(),
            ChannelRef::Handle("@Example".to_owned()),
        );
        assert_eq!(
            classify_channel_url("https://YOUTUBE.com/@Example/videos").unwrap(),
            ChannelRef::Handle("@Example".to_owned()),
        );
    }

    #[test]
    fn direct_channel_ids_classify() {
        assert_eq!(
            classify_channel_url("https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw")
                .unwrap(),
            ChannelRef::Id("UCuAXFkgsw1L7xaCfnd5JJOw".to_owned()),
        );
    }

    #[test]
    fn malformed_channel_ids_are_unsupported() {
        assert!(matches!(
            classify_channel_url("https://www.youtube.com/channel/notanid"),
            Err(ResolveError::UnsupportedUrlForm(_)),
        ));
    }

    #[test]
    fn custom_and_legacy_urls_classify() {
        assert_eq!(
            classify_channel_url("https://youtube.com/c/SomeVanityName").unwrap(),
            ChannelRef::Custom("SomeVanityName".to_owned()),
        );
        assert_eq!(
            classify_channel_url("https://www.youtube.com/user/legacyname/featured").unwrap(),
            ChannelRef::Username("legacyname".to_owned()),
        );
    }

    #[test]
    fn other_hosts_are_unsupported() {
        assert!(matches!(
            classify_channel_url("https://vimeo.com/@Example"),
            Err(ResolveError::UnsupportedUrlForm(_)),
        ));
    }

    #[test]
    fn other_paths_are_unsupported() {
        assert!(matches!(
            classify_channel_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Err(ResolveError::UnsupportedUrlForm(_)),
        ));
    }
}
