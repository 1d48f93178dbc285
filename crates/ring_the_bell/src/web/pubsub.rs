use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderMap,
};
use entity_types::update::UpdateKind;
use mime::Mime;
use reqwest::{StatusCode, header};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    database::{RepoError, Subscriptions, WebhookEvents},
    feed::{self, Notification},
    projection,
    queue::enqueue_video_enrichment,
    signature,
};

use super::WebState;

const NEW_VIDEO_PRIORITY: i32 = 0;

#[derive(Debug, Deserialize)]
#[serde(tag = "hub.mode")]
pub enum HubChallenge {
    #[serde(rename = "subscribe")]
    Subscribe(HubSubscribeChallenge),
    #[serde(rename = "unsubscribe")]
    Unsubscribe(HubUnsubscribeChallenge),
}

#[derive(Debug, Deserialize)]
pub struct HubSubscribeChallenge {
    #[serde(rename = "hub.topic")]
    topic: String,
    #[serde(rename = "hub.challenge")]
    challenge: String,
    #[serde(rename = "hub.lease_seconds")]
    lease_seconds: String, // I think integers are special cased when at the root
}

#[derive(Debug, Deserialize)]
pub struct HubUnsubscribeChallenge {
    #[serde(rename = "hub.topic")]
    topic: String,
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

/// Verification GET from the hub. The challenge is echoed back verbatim only
/// when the topic matches a subscription we actually asked for.
pub async fn pubsub_verification(
    query: Result<Query<HubChallenge>, QueryRejection>,
    State(state): State<WebState>,
) -> Result<String, StatusCode> {
    match query {
        Ok(Query(HubChallenge::Subscribe(query))) => {
            let Ok(lease_seconds) = query.lease_seconds.parse::<i64>() else {
                warn!(lease_seconds = query.lease_seconds, "unparsable lease on verification");
                return Err(StatusCode::BAD_REQUEST);
            };

            match Subscriptions::get_by_topic(&state.database, &query.topic).await {
                Ok(Some(subscription)) => {
                    match Subscriptions::mark_active(
                        &state.database,
                        &subscription.channel_id,
                        lease_seconds,
                    )
                    .await
                    {
                        Ok(()) => Ok(query.challenge),
                        Err(error) => {
                            error!(%error, "failed to activate verified subscription");
                            Err(StatusCode::INTERNAL_SERVER_ERROR)
                        }
                    }
                }
                Ok(None) => {
                    warn!(topic = query.topic, "verification for an unknown topic");
                    Err(StatusCode::NOT_FOUND)
                }
                Err(error) => {
                    error!(%error, "failed to look up subscription for verification");
                    Err(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        Ok(Query(HubChallenge::Unsubscribe(query))) => {
            match Subscriptions::get_by_topic(&state.database, &query.topic).await {
                Ok(Some(subscription)) => {
                    match Subscriptions::mark_expired(&state.database, &subscription.channel_id)
                        .await
                    {
                        Ok(()) => Ok(query.challenge),
                        Err(error) => {
                            error!(%error, "failed to expire unsubscribed subscription");
                            Err(StatusCode::INTERNAL_SERVER_ERROR)
                        }
                    }
                }
                Ok(None) => Err(StatusCode::NOT_FOUND),
                Err(error) => {
                    error!(%error, "failed to look up subscription for verification");
                    Err(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        Err(error) => {
            warn!(%error, "recieved bad request to pubsub route");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// Push notification from the hub. The raw event is persisted before any
/// projection runs, and a replayed body is acknowledged without touching
/// anything else.
pub async fn pubsub_notification(
    State(state): State<WebState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> StatusCode {
    let signature_header = headers
        .get("X-Hub-Signature")
        .and_then(|value| value.to_str().ok());
    if let Err(error) = signature::verify(&state.webhook_secret, &body, signature_header) {
        warn!(%error, "rejecting notification with a bad signature");
        return StatusCode::UNAUTHORIZED;
    }

    let atom = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())
        .is_some_and(|mime| mime.essence_str() == "application/atom+xml");
    if !atom {
        warn!("rejecting notification without an atom content type");
        return StatusCode::BAD_REQUEST;
    }

    let Ok(body) = std::str::from_utf8(&body) else {
        warn!("rejecting notification with a non-utf8 body");
        return StatusCode::BAD_REQUEST;
    };

    let notification = match feed::parse_notification(body) {
        Ok(notification) => notification,
        Err(error) => {
            warn!(%error, %body, "unable to parse incoming feed item");
            return StatusCode::BAD_REQUEST;
        }
    };

    // Tombstones store an event with no projected ids.
    let (video_id, channel_id) = match &notification {
        Notification::Video(video) => {
            (Some(video.video_id.as_str()), Some(video.channel_id.as_str()))
        }
        Notification::Tombstone(_) => (None, None),
    };

    let event_id = match WebhookEvents::insert(&state.database, body, video_id, channel_id).await {
        Ok(event_id) => event_id,
        Err(RepoError::DuplicateKey) => {
            info!(
                content_hash = WebhookEvents::content_hash(body.as_bytes()),
                "duplicate notification replayed"
            );
            return StatusCode::OK;
        }
        Err(error) => {
            error!(%error, "failed to store webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let video = match notification {
        Notification::Tombstone(tombstone) => {
            info!(r#ref = tombstone.r#ref, event_id, "tombstone recorded");
            return mark_processed(&state, event_id, None).await;
        }
        Notification::Video(video) => video,
    };

    if state.blocklist.is_blocked(&video.video_id) {
        info!(video_id = video.video_id, event_id, "blocked video, projection skipped");
        return mark_processed(&state, event_id, None).await;
    }

    match projection::project(&state.database, event_id, &video).await {
        Ok(update_kind) => {
            let status = mark_processed(&state, event_id, None).await;

            if update_kind == UpdateKind::NewVideo && state.enrichment_enabled {
                if let Err(error) = enqueue_video_enrichment(
                    &state.database,
                    &state.queue,
                    &video.video_id,
                    &video.channel_id,
                    NEW_VIDEO_PRIORITY,
                )
                .await
                {
                    // A 500 here would only provoke a redelivery that dedups
                    // into a no-op, so the failure is logged and the event
                    // acknowledged.
                    error!(%error, video_id = video.video_id, "failed to enqueue enrichment");
                }
            }

            status
        }
        Err(error) => {
            error!(%error, event_id, "projection failed");
            let _ = mark_processed(&state, event_id, Some(error.to_string())).await;
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn mark_processed(state: &WebState, event_id: i64, error: Option<String>) -> StatusCode {
    match WebhookEvents::mark_processed(&state.database, event_id, error).await {
        Ok(()) => StatusCode::OK,
        Err(error) => {
            error!(%error, event_id, "failed to mark event processed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
