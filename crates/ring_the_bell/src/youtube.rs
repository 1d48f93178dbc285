use entity_types::jiff_compat::JiffTimestampMilliseconds;
use google_youtube3::api::{Channel, ChannelListResponse, SearchListResponse, Video, VideoListResponse};
use serde::de::DeserializeOwned;

use crate::{database::now_ms, error::YoutubeApiError};

/// Part sets requested on every call; they are recorded next to each
/// enrichment row so consumers know which absent fields were never asked
/// for.
pub const VIDEO_PARTS: &str =
    "snippet,contentDetails,statistics,status,liveStreamingDetails,recordingDetails";
pub const CHANNEL_PARTS: &str =
    "snippet,contentDetails,statistics,brandingSettings,status,topicDetails";

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Thin API-key client for the Data API. Responses decode straight into the
/// `google_youtube3` types.
#[derive(Clone)]
pub struct YouTubeApi {
    client: reqwest::Client,
    api_key: String,
}

impl YouTubeApi {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, YoutubeApiError> {
        let response = self
            .client
            .get(format!("{API_BASE}{path}"))
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// `videos.list` for up to 50 ids in one call.
    pub async fn list_videos(&self, video_ids: &[String]) -> Result<VideoListResponse, YoutubeApiError> {
        self.get_json(
            "/videos",
            &[("part", VIDEO_PARTS), ("id", &video_ids.join(","))],
        )
        .await
    }

    pub async fn channel_by_handle(&self, handle: &str) -> Result<ChannelListResponse, YoutubeApiError> {
        self.get_json("/channels", &[("part", "id"), ("forHandle", handle)])
            .await
    }

    pub async fn channel_by_username(
        &self,
        username: &str,
    ) -> Result<ChannelListResponse, YoutubeApiError> {
        self.get_json("/channels", &[("part", "id"), ("forUsername", username)])
            .await
    }

    pub async fn channel_details(&self, channel_id: &str) -> Result<ChannelListResponse, YoutubeApiError> {
        self.get_json("/channels", &[("part", CHANNEL_PARTS), ("id", channel_id)])
            .await
    }

    /// Top search hit restricted to channels; the fallback for vanity `/c/`
    /// URLs that have no direct lookup.
    pub async fn search_channel(&self, query: &str) -> Result<SearchListResponse, YoutubeApiError> {
        self.get_json(
            "/search",
            &[
                ("part", "snippet"),
                ("type", "channel"),
                ("maxResults", "1"),
                ("q", query),
            ],
        )
        .await
    }
}

/// Flatten a `videos.list` item into the enrichment row shape. Fields the
/// API left out stay `None`.
pub fn video_enrichment_row(
    video: &Video,
    quota_cost: i32,
) -> Option<entity::video_enrichments::Model> {
    let video_id = video.id.clone()?;

    let snippet = video.snippet.as_ref();
    let content_details = video.content_details.as_ref();
    let statistics = video.statistics.as_ref();
    let status = video.status.as_ref();
    let live = video.live_streaming_details.as_ref();
    let recording = video.recording_details.as_ref();
    let location = recording.and_then(|recording| recording.location.as_ref());

    Some(entity::video_enrichments::Model {
        video_id,
        description: snippet.and_then(|snippet| snippet.description.clone()),
        tags: snippet
            .and_then(|snippet| snippet.tags.as_ref())
            .and_then(|tags| serde_json::to_value(tags).ok()),
        duration: content_details.and_then(|details| details.duration.clone()),
        view_count: statistics.and_then(|stats| stats.view_count.map(|count| count as i64)),
        like_count: statistics.and_then(|stats| stats.like_count.map(|count| count as i64)),
        comment_count: statistics.and_then(|stats| stats.comment_count.map(|count| count as i64)),
        thumbnails: snippet
            .and_then(|snippet| snippet.thumbnails.as_ref())
            .and_then(|thumbnails| serde_json::to_value(thumbnails).ok()),
        privacy_status: status.and_then(|status| status.privacy_status.clone()),
        upload_status: status.and_then(|status| status.upload_status.clone()),
        embeddable: status.and_then(|status| status.embeddable),
        live_scheduled_start: live
            .and_then(|live| live.scheduled_start_time.as_ref())
            .and_then(|time| timestamp_from_millis(time.timestamp_millis())),
        live_actual_start: live
            .and_then(|live| live.actual_start_time.as_ref())
            .and_then(|time| timestamp_from_millis(time.timestamp_millis())),
        live_actual_end: live
            .and_then(|live| live.actual_end_time.as_ref())
            .and_then(|time| timestamp_from_millis(time.timestamp_millis())),
        location_latitude: location.and_then(|location| location.latitude),
        location_longitude: location.and_then(|location| location.longitude),
        location_description: recording.and_then(|recording| recording.location_description.clone()),
        content_rating: content_details
            .and_then(|details| details.content_rating.as_ref())
            .and_then(|rating| serde_json::to_value(rating).ok()),
        raw_api_body: serde_json::to_value(video).unwrap_or(serde_json::Value::Null),
        requested_parts: VIDEO_PARTS.to_owned(),
        quota_cost,
        enriched_at: now_ms(),
    })
}

/// Flatten a `channels.list` item into the enrichment row shape.
pub fn channel_enrichment_row(
    channel: &Channel,
    quota_cost: i32,
) -> Option<entity::channel_enrichments::Model> {
    let channel_id = channel.id.clone()?;

    let snippet = channel.snippet.as_ref();
    let statistics = channel.statistics.as_ref();
    let branding = channel
        .branding_settings
        .as_ref()
        .and_then(|branding| branding.channel.as_ref());

    Some(entity::channel_enrichments::Model {
        channel_id,
        title: snippet.and_then(|snippet| snippet.title.clone()),
        description: snippet.and_then(|snippet| snippet.description.clone()),
        custom_url: snippet.and_then(|snippet| snippet.custom_url.clone()),
        country: snippet.and_then(|snippet| snippet.country.clone()),
        subscriber_count: statistics
            .and_then(|stats| stats.subscriber_count.map(|count| count as i64)),
        video_count: statistics.and_then(|stats| stats.video_count.map(|count| count as i64)),
        view_count: statistics.and_then(|stats| stats.view_count.map(|count| count as i64)),
        thumbnails: snippet
            .and_then(|snippet| snippet.thumbnails.as_ref())
            .and_then(|thumbnails| serde_json::to_value(thumbnails).ok()),
        keywords: branding.and_then(|branding| branding.keywords.clone()),
        topic_categories: channel
            .topic_details
            .as_ref()
            .and_then(|topics| topics.topic_categories.as_ref())
            .and_then(|categories| serde_json::to_value(categories).ok()),
        privacy_status: channel
            .status
            .as_ref()
            .and_then(|status| status.privacy_status.clone()),
        raw_api_body: serde_json::to_value(channel).unwrap_or(serde_json::Value::Null),
        requested_parts: CHANNEL_PARTS.to_owned(),
        quota_cost,
        enriched_at: now_ms(),
    })
}

fn timestamp_from_millis(milliseconds: i64) -> Option<JiffTimestampMilliseconds> {
    jiff::Timestamp::from_millisecond(milliseconds)
        .ok()
        .map(JiffTimestampMilliseconds)
}
