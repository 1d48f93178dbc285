use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{config::LlmConfig, error::LlmError};

/// A sponsor the model claims to have found. Confidence arrives as whatever
/// the model wrote; the caller clamps it before persisting.
#[derive(Debug, Clone, Deserialize)]
pub struct SponsorFinding {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub evidence_text: String,
}

#[derive(Debug, Deserialize)]
struct DetectionDocument {
    #[serde(default)]
    sponsors: Vec<SponsorFinding>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'s> {
    model: &'s str,
    messages: Vec<ChatMessage<'s>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'s> {
    role: &'static str,
    content: &'s str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug)]
pub struct DetectionOutcome {
    pub findings: Vec<SponsorFinding>,
    /// Verbatim model output, kept for the audit row.
    pub raw_body: String,
    pub duration_ms: i64,
}

/// Chat-completions client for the sponsor-detection step. Speaks the
/// OpenAI-compatible surface so the endpoint is swappable by URL.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    pub async fn detect_sponsors(
        &self,
        prompt: &str,
        title: &str,
        description: &str,
    ) -> Result<DetectionOutcome, LlmError> {
        let user_message = format!("Video title: {title}\n\nVideo description:\n{description}");

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            temperature: 0.2,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut builder = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.json::<ChatResponse>().await?;
        let duration_ms = started.elapsed().as_millis() as i64;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::BadPayload("response carried no choices".to_owned()))?;

        let document = serde_json::from_str::<DetectionDocument>(&content)
            .map_err(|error| LlmError::BadPayload(error.to_string()))?;

        Ok(DetectionOutcome {
            findings: document.sponsors,
            raw_body: content,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detection_document_parses_model_output() {
        let content = r#"{
            "sponsors": [
                {"name": "Acme VPN", "confidence": 0.92, "evidence_text": "This video is sponsored by Acme VPN"},
                {"name": "Squarewave", "confidence": 1.4, "evidence_text": "code SQUAREWAVE for 10% off"}
            ]
        }"#;

        let document: DetectionDocument = serde_json::from_str(content).unwrap();
        assert_eq!(document.sponsors.len(), 2);
        assert_eq!(document.sponsors[0].name, "Acme VPN");
        // Out-of-range confidences survive parsing; clamping happens at the
        // persistence boundary.
        assert!(document.sponsors[1].confidence > 1.0);
    }

    #[test]
    fn empty_document_means_no_sponsors() {
        let document: DetectionDocument = serde_json::from_str("{}").unwrap();
        assert!(document.sponsors.is_empty());
    }
}
