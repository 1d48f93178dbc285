use reqwest::StatusCode;
use serde::Serialize;

use crate::error::HubError;

#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Serialize, Clone, Copy)]
pub enum Verify {
    #[serde(rename = "async")]
    Asynchronous,
    #[serde(rename = "sync")]
    Synchronous,
}

#[derive(Debug, Serialize)]
struct HubRequest<'s> {
    #[serde(rename = "hub.mode")]
    mode: Mode,
    #[serde(rename = "hub.topic")]
    topic: &'s str,
    #[serde(rename = "hub.callback")]
    callback: &'s str,
    #[serde(rename = "hub.verify")]
    verify: Verify,
    #[serde(rename = "hub.lease_seconds", skip_serializing_if = "Option::is_none")]
    lease_seconds: Option<i64>,
    #[serde(rename = "hub.secret", skip_serializing_if = "Option::is_none")]
    secret: Option<&'s str>,
}

/// Deterministic topic URL for a channel's push feed.
pub fn topic_for(channel_id: &str) -> String {
    format!("https://www.youtube.com/xml/feeds/videos.xml?channel_id={channel_id}")
}

pub fn channel_id_from_topic(topic: &str) -> &str {
    topic.trim_start_matches("https://www.youtube.com/xml/feeds/videos.xml?channel_id=")
}

/// Form-posting client for the hub's subscribe endpoint. The hub answers
/// 202 (verification to follow) or 204 (verified synchronously); both count
/// as accepted here.
#[derive(Clone)]
pub struct HubClient {
    client: reqwest::Client,
    hub_url: String,
    callback_url: String,
}

impl HubClient {
    pub fn new(client: reqwest::Client, hub_url: String, callback_url: String) -> Self {
        Self {
            client,
            hub_url,
            callback_url,
        }
    }

    pub async fn subscribe(
        &self,
        channel_id: &str,
        lease_seconds: i64,
        secret: &str,
    ) -> Result<(), HubError> {
        self.send(Mode::Subscribe, channel_id, Some(lease_seconds), Some(secret))
            .await
    }

    pub async fn unsubscribe(&self, channel_id: &str) -> Result<(), HubError> {
        self.send(Mode::Unsubscribe, channel_id, None, None).await
    }

    async fn send(
        &self,
        mode: Mode,
        channel_id: &str,
        lease_seconds: Option<i64>,
        secret: Option<&str>,
    ) -> Result<(), HubError> {
        let topic = topic_for(channel_id);

        let response = self
            .client
            .post(&self.hub_url)
            .form(&HubRequest {
                mode,
                topic: &topic,
                callback: &self.callback_url,
                verify: Verify::Asynchronous,
                lease_seconds,
                secret,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
                tracing::debug!(?mode, channel_id, %status, body, "hub accepted request");
                Ok(())
            }
            StatusCode::BAD_REQUEST => Err(HubError::BadRequest { body }),
            StatusCode::NOT_FOUND => Err(HubError::NotFound { body }),
            status => Err(HubError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn topic_roundtrips_channel_id() {
        let topic = topic_for("UCuAXFkgsw1L7xaCfnd5JJOw");
        assert_eq!(
            topic,
            "https://www.youtube.com/xml/feeds/videos.xml?channel_id=UCuAXFkgsw1L7xaCfnd5JJOw"
        );
        assert_eq!(channel_id_from_topic(&topic), "UCuAXFkgsw1L7xaCfnd5JJOw");
    }

    #[test]
    fn form_encoding_uses_hub_keys() {
        let encoded = serde_urlencoded::to_string(HubRequest {
            mode: Mode::Subscribe,
            topic: "https://example.com/topic",
            callback: "https://example.com/pubsub",
            verify: Verify::Asynchronous,
            lease_seconds: Some(432_000),
            secret: None,
        })
        .unwrap();

        assert!(encoded.contains("hub.mode=subscribe"));
        assert!(encoded.contains("hub.lease_seconds=432000"));
        assert!(!encoded.contains("hub.secret"));
    }
}
