use jiff::Timestamp;
use monostate::MustBe;
use serde::Deserialize;
use thiserror::Error;

/// A push notification body from the hub: an Atom feed carrying either one
/// `entry` (video published or changed) or one `yt:deleted-entry`
/// (tombstone).
#[derive(Debug, Deserialize)]
pub struct Feed {
    #[serde(rename = "@xmlns")]
    _namespace: MustBe!("http://www.w3.org/2005/Atom"),
    #[serde(rename = "@xmlns:yt")]
    _namespace_yt: Option<MustBe!("http://www.youtube.com/xml/schemas/2015")>,
    pub entry: Option<Entry>,
    #[serde(rename = "yt:deleted-entry")]
    #[serde(alias = "deleted-entry")] // quick_xml ignores namespace prefixes with serde
    pub deleted_entry: Option<DeletedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(rename = "yt:videoId")]
    #[serde(alias = "videoId")] // quick_xml ignores namespace prefixes with serde
    pub video_id: String,
    #[serde(rename = "yt:channelId")]
    #[serde(alias = "channelId")]
    pub channel_id: String,
    pub title: String,
    pub link: Option<Link>,
    pub author: Option<Author>,
    pub published: Timestamp,
    pub updated: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct Author {
    pub name: String,
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    #[serde(rename = "@rel")]
    pub rel: String,
    #[serde(rename = "@href")]
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletedEntry {
    #[serde(rename = "@ref")]
    pub r#ref: String,
    #[serde(rename = "@when")]
    pub when: Option<Timestamp>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unable to parse feed item: {0}")]
    Malformed(#[from] quick_xml::DeError),
    #[error("feed carries neither an entry nor a deleted-entry")]
    Empty,
    #[error("feed carries both an entry and a deleted-entry")]
    Ambiguous,
}

/// A feed normalized to what the pipeline acts on.
#[derive(Debug, Clone)]
pub enum Notification {
    Video(VideoNotification),
    Tombstone(Tombstone),
}

#[derive(Debug, Clone)]
pub struct VideoNotification {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub video_url: String,
    /// Channel name as the feed reported it (the entry author).
    pub channel_title: Option<String>,
    pub channel_url: String,
    pub published_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct Tombstone {
    /// Verbatim `ref` attribute, e.g. `yt:video:dQw4w9WgXcQ`.
    pub r#ref: String,
    pub when: Option<Timestamp>,
}

impl Tombstone {
    pub fn video_id(&self) -> Option<&str> {
        self.r#ref.strip_prefix("yt:video:")
    }
}

pub fn parse_notification(body: &str) -> Result<Notification, FeedError> {
    let feed = quick_xml::de::from_str::<Feed>(body)?;

    match (feed.entry, feed.deleted_entry) {
        (Some(entry), None) => {
            let video_url = match entry.link {
                Some(link) if link.rel == "alternate" => link.href,
                _ => format!("https://www.youtube.com/watch?v={}", entry.video_id),
            };

            let (channel_title, channel_url) = match entry.author {
                Some(author) => (Some(author.name), author.uri),
                None => (None, None),
            };
            let channel_url = channel_url.unwrap_or_else(|| {
                format!("https://www.youtube.com/channel/{}", entry.channel_id)
            });

            Ok(Notification::Video(VideoNotification {
                video_id: entry.video_id,
                channel_id: entry.channel_id,
                title: entry.title,
                video_url,
                channel_title,
                channel_url,
                published_at: entry.published,
                updated_at: entry.updated,
            }))
        }
        (None, Some(deleted)) => Ok(Notification::Tombstone(Tombstone {
            r#ref: deleted.r#ref,
            when: deleted.when,
        })),
        (None, None) => Err(FeedError::Empty),
        (Some(_), Some(_)) => Err(FeedError::Ambiguous),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_sample_video() {
        let sample_video = include_str!("../test_data/sample_video.xml");

        let Notification::Video(notification) = parse_notification(sample_video).unwrap() else {
            panic!("sample video should parse as an active entry");
        };

        assert_eq!(notification.video_id, "dQw4w9WgXcQ");
        assert_eq!(notification.channel_id, "UCuAXFkgsw1L7xaCfnd5JJOw");
        assert_eq!(notification.title, "Ex");
        assert_eq!(
            notification.video_url,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            notification.published_at,
            "2025-10-07T12:00:00Z".parse::<Timestamp>().unwrap()
        );
    }

    #[test]
    fn parse_sample_tombstone() {
        let sample_tombstone = include_str!("../test_data/sample_tombstone.xml");

        let Notification::Tombstone(tombstone) = parse_notification(sample_tombstone).unwrap()
        else {
            panic!("sample tombstone should parse as a deleted-entry");
        };

        assert_eq!(tombstone.r#ref, "yt:video:del1");
        assert_eq!(tombstone.video_id(), Some("del1"));
    }

    #[test]
    fn missing_video_id_is_malformed() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://www.youtube.com/xml/schemas/2015">
              <entry>
                <id>yt:video:broken</id>
                <yt:channelId>UCuAXFkgsw1L7xaCfnd5JJOw</yt:channelId>
                <title>No video id</title>
                <published>2025-10-07T12:00:00+00:00</published>
                <updated>2025-10-07T12:00:00+00:00</updated>
              </entry>
            </feed>"#;

        assert!(matches!(
            parse_notification(body),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn bad_timestamp_is_malformed() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://www.youtube.com/xml/schemas/2015">
              <entry>
                <id>yt:video:dQw4w9WgXcQ</id>
                <yt:videoId>dQw4w9WgXcQ</yt:videoId>
                <yt:channelId>UCuAXFkgsw1L7xaCfnd5JJOw</yt:channelId>
                <title>Ex</title>
                <published>not-a-timestamp</published>
                <updated>2025-10-07T12:00:00+00:00</updated>
              </entry>
            </feed>"#;

        assert!(matches!(
            parse_notification(body),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn feed_without_entries_is_rejected() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;

        assert!(matches!(parse_notification(body), Err(FeedError::Empty)));
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://www.youtube.com/xml/schemas/2015">
              <title>YouTube video feed</title>
              <updated>2025-10-07T12:00:05+00:00</updated>
              <entry>
                <id>yt:video:dQw4w9WgXcQ</id>
                <yt:videoId>dQw4w9WgXcQ</yt:videoId>
                <yt:channelId>UCuAXFkgsw1L7xaCfnd5JJOw</yt:channelId>
                <title>Ex</title>
                <author><name>Example</name><uri>https://www.youtube.com/@Example</uri></author>
                <published>2025-10-07T12:00:00+00:00</published>
                <updated>2025-10-07T12:00:05+00:00</updated>
              </entry>
            </feed>"#;

        assert!(matches!(
            parse_notification(body),
            Ok(Notification::Video(_))
        ));
    }
}
