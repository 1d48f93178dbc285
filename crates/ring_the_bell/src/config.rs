use std::net::SocketAddr;

use color_eyre::eyre::{Context as _, eyre};

use crate::redis_url::RedisUrl;

/// Everything the service reads from its environment, resolved once at
/// startup. Missing required values abort before any socket is bound.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: RedisUrl,
    pub listen_addr: SocketAddr,

    /// Public URL the hub calls back on, e.g. `https://host/pubsub`.
    pub callback_url: String,
    pub hub_url: String,
    pub webhook_secret: String,
    pub lease_seconds: i64,
    pub renewal_margin_seconds: i64,

    pub youtube_api_key: Option<String>,
    pub llm: Option<LlmConfig>,

    pub daily_quota_limit: i64,
    pub quota_threshold_percent: i64,

    pub enrichment_workers: usize,
    pub sponsor_workers: usize,
    pub enrich_batch_size: usize,
    pub enrichment_enabled: bool,
    pub sponsor_detection_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> color_eyre::Result<Self> {
        let config = Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?
                .parse()
                .wrap_err("REDIS_URL is not a usable redis url")?,
            listen_addr: optional("LISTEN_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8080".to_owned())
                .parse()
                .wrap_err("LISTEN_ADDR is not a socket address")?,

            callback_url: required("PUBSUB_CALLBACK_URL")?,
            hub_url: optional("PUBSUB_HUB_URL")
                .unwrap_or_else(|| "https://pubsubhubbub.appspot.com/subscribe".to_owned()),
            webhook_secret: required("WEBHOOK_SECRET")?,
            lease_seconds: parsed("LEASE_SECONDS", 432_000)?,
            renewal_margin_seconds: parsed("RENEWAL_MARGIN_SECONDS", 24 * 60 * 60)?,

            youtube_api_key: optional("YOUTUBE_API_KEY"),
            llm: match optional("LLM_BASE_URL") {
                Some(base_url) => Some(LlmConfig {
                    base_url,
                    model: required("LLM_MODEL")?,
                    api_key: optional("LLM_API_KEY"),
                }),
                None => None,
            },

            daily_quota_limit: parsed("DAILY_QUOTA_LIMIT", 10_000)?,
            quota_threshold_percent: parsed("QUOTA_THRESHOLD_PERCENT", 90)?,

            enrichment_workers: parsed("ENRICHMENT_WORKERS", 2)?,
            sponsor_workers: parsed("SPONSOR_WORKERS", 1)?,
            enrich_batch_size: parsed("ENRICH_BATCH_SIZE", 50)?,
            enrichment_enabled: flag("ENABLE_ENRICHMENT", true)?,
            sponsor_detection_enabled: flag("ENABLE_SPONSOR_DETECTION", false)?,
        };

        if config.enrichment_enabled && config.youtube_api_key.is_none() {
            return Err(eyre!(
                "ENABLE_ENRICHMENT is set but YOUTUBE_API_KEY is missing"
            ));
        }

        if config.sponsor_detection_enabled && config.llm.is_none() {
            return Err(eyre!(
                "ENABLE_SPONSOR_DETECTION is set but LLM_BASE_URL is missing"
            ));
        }

        if !(1..=100).contains(&config.quota_threshold_percent) {
            return Err(eyre!(
                "QUOTA_THRESHOLD_PERCENT must be between 1 and 100, got {}",
                config.quota_threshold_percent
            ));
        }

        Ok(config)
    }
}

fn required(name: &str) -> color_eyre::Result<String> {
    std::env::var(name).wrap_err_with(|| format!("unable to read {name} env var"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> color_eyre::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(name) {
        Some(value) => value
            .parse()
            .wrap_err_with(|| format!("unable to parse {name} env var")),
        None => Ok(default),
    }
}

fn flag(name: &str, default: bool) -> color_eyre::Result<bool> {
    match optional(name).as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some(other) => Err(eyre!("unrecognized boolean {other:?} for {name}")),
        None => Ok(default),
    }
}
