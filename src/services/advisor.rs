use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;

const ADVISOR_SYSTEM_PROMPT: &str = "You are an academic advisor. Given a student's \
completed courses and a list of candidate courses, write a short, encouraging note \
explaining why the suggested courses fit. Keep it under 120 words.";

/// Templated advisory lines returned when the external completion API is
/// unavailable. The external call failing must never fail the request.
const FALLBACK_LINES: &[&str] = &[
    "Intro to Computer Science - Based on your interest in technology",
    "Calculus I - Required for your degree program",
    "Academic Writing - Helps develop essential communication skills",
];

#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct AdvisoryText {
    pub(crate) content: String,
    pub(crate) is_fallback: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AiAdvisorClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AiAdvisorClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
        })
    }

    /// Produces the supplementary advisory note. Falls back to the fixed
    /// template list on any failure, including a missing API key.
    pub(crate) async fn advisory_text(
        &self,
        student_name: &str,
        completed_courses: &[String],
        suggested_courses: &[String],
    ) -> AdvisoryText {
        if self.api_key.is_empty() {
            return fallback_text();
        }

        match self.request_completion(student_name, completed_courses, suggested_courses).await {
            Ok(content) => AdvisoryText { content, is_fallback: false },
            Err(err) => {
                tracing::warn!(error = %err, "Advisory text generation failed, using fallback");
                fallback_text()
            }
        }
    }

    async fn request_completion(
        &self,
        student_name: &str,
        completed_courses: &[String],
        suggested_courses: &[String],
    ) -> Result<String> {
        let user_prompt = format!(
            "Student: {student_name}\nCompleted courses: {}\nSuggested courses: {}",
            completed_courses.join(", "),
            suggested_courses.join(", "),
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": ADVISOR_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call completion API")?;

        let status = response.status();
        let body: Value = response.json().await.context("Invalid completion API response")?;

        if !status.is_success() {
            anyhow::bail!("completion API error: {body}");
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing completion content")?;

        Ok(content.trim().to_string())
    }
}

fn fallback_text() -> AdvisoryText {
    AdvisoryText { content: FALLBACK_LINES.join("\n"), is_fallback: true }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_uses_fallback() {
        let client = AiAdvisorClient {
            client: Client::new(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 100,
        };

        let text = client.advisory_text("Ada", &[], &[]).await;
        assert!(text.is_fallback);
        assert!(text.content.contains("Calculus I"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_uses_fallback() {
        let client = AiAdvisorClient {
            client: Client::builder()
                .timeout(Duration::from_millis(200))
                .build()
                .expect("client"),
            api_key: "test-key".to_string(),
            // Reserved TEST-NET-1 address, nothing listens there.
            base_url: "http://192.0.2.1:9".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 100,
        };

        let text = client.advisory_text("Ada", &["CS101".to_string()], &[]).await;
        assert!(text.is_fallback);
    }
}
