use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

const FEEDBACK_SYSTEM_PROMPT: &str = r#"You are a Senior Hiring Manager reviewing a completed interview.
Write honest, specific, constructive feedback for the candidate based only on the metrics and answers provided.
Respond with a single JSON object and nothing else, using exactly this shape:
{
  "overallPerformance": "<2-3 sentence summary>",
  "strengths": ["<strength>", "..."],
  "improvements": ["<area to improve>", "..."],
  "sectionFeedback": [
    {"section": "<Behavioral|Multiple choice|Coding>", "feedback": "<assessment>", "recommendation": "<next step>"}
  ]
}
Include one sectionFeedback entry for every section listed in the metrics."#;

/// External text generation step. Output is untrusted and may not be JSON.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct AIService {
    client: Client,
    api_key: Option<String>,
    model: String,
    request_timeout: Duration,
}

impl AIService {
    pub fn new(api_key: Option<String>, model: String, client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            model,
            request_timeout,
        }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Generator("OpenAI API key is not configured".to_string()))?;

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(api_key)
            .json(&payload)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Generator(format!("OpenAI API Error {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Generator("Invalid OpenAI response format".to_string()))
    }
}

#[async_trait]
impl FeedbackGenerator for AIService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": FEEDBACK_SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.4
        });

        self.chat_openai(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_a_generator_error() {
        let service = AIService::new(None, "gpt-4o".into(), Client::new(), Duration::from_secs(1));
        let err = service.generate("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Generator(_)));
    }
}
