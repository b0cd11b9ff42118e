use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::core::config::Settings;

const MAX_RETRIES: u32 = 3;

const STUDY_BUDDY_PROMPT: &str = "You are an AI study buddy for students. Be helpful, encouraging and clear. \
Answer primarily from the study material below. If a question is unrelated to it, guide the student back \
to the topic, or answer generally when it is a general education question.

STUDY MATERIAL:
Topic: Introduction to Photosynthesis
Photosynthesis converts light energy into chemical energy stored in carbohydrates such as sugars and \
starches, synthesized from carbon dioxide and water. The overall equation is \
6CO2 + 6H2O + light energy -> C6H12O6 + 6O2. It runs in two stages: the light-dependent reactions and \
the Calvin cycle.";

pub const CHAT_FALLBACK: &str = "I'm having trouble connecting to the study servers right now. Please check your connection or API key.";
pub const CHAT_EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response.";
pub const SUMMARY_FALLBACK: &str = "Failed to generate summary due to an AI service error.";
pub const SUMMARY_EMPTY_REPLY: &str = "Could not generate a summary for this video.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Percentages in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub attendance: f64,
    pub assignments_completed: f64,
    pub average_grade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub risk_level: RiskLevel,
    pub reason: String,
    pub recommendations: Vec<String>,
}

impl RiskAnalysis {
    pub fn unavailable() -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            reason: "AI Analysis unavailable. Defaulting to medium caution.".to_string(),
            recommendations: vec!["Review manual records".to_string(), "Talk to student".to_string()],
        }
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Every public call is fail-soft: errors are logged and replaced by a fixed fallback.
#[derive(Debug, Clone)]
pub struct AiCompletionService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    retries: u32,
}

impl AiCompletionService {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().api_key.clone(),
            base_url: settings.ai().base_url.trim_end_matches('/').to_string(),
            model: settings.ai().model.clone(),
            max_tokens: settings.ai().max_tokens,
            retries: MAX_RETRIES,
        })
    }

    #[cfg(test)]
    fn without_retries(mut self) -> Self {
        self.retries = 0;
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }

    /// Study-buddy chat reply to `message` given the prior conversation.
    pub async fn complete(&self, history: &[ChatTurn], message: &str) -> String {
        let mut messages = vec![json!({"role": "system", "content": STUDY_BUDDY_PROMPT})];
        messages.extend(
            history.iter().map(|turn| json!({"role": turn.role, "content": turn.text})),
        );
        messages.push(json!({"role": "user", "content": message}));

        match self.chat(Value::Array(messages), false, self.max_tokens, None).await {
            Ok(text) if text.trim().is_empty() => CHAT_EMPTY_REPLY.to_string(),
            Ok(text) => text,
            Err(err) => {
                record_fallback("chat", &err);
                CHAT_FALLBACK.to_string()
            }
        }
    }

    /// Asks for a JSON object and decodes it into `T`, or returns `fallback`.
    pub async fn structured_complete<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        prompt: &str,
        fallback: T,
    ) -> T {
        let messages = json!([{"role": "user", "content": prompt}]);
        let decoded = self
            .chat(messages, true, self.max_tokens, None)
            .await
            .and_then(|text| serde_json::from_str::<T>(&text).context("Failed to parse AI JSON"));

        match decoded {
            Ok(value) => value,
            Err(err) => {
                record_fallback(kind, &err);
                fallback
            }
        }
    }

    pub async fn risk_analysis(&self, stats: &StudentStats, recent_scores: &[f64]) -> RiskAnalysis {
        let scores = recent_scores
            .iter()
            .map(|score| score.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "Analyze the following student performance data and determine if they are at risk of failing or dropping out.\n\n\
             Data:\n\
             Attendance Rate: {}%\n\
             Assignments Completed: {}%\n\
             Average Grade: {}%\n\
             Recent Test Scores: {scores}\n\n\
             Return a JSON object with:\n\
             - riskLevel: \"LOW\", \"MEDIUM\", or \"HIGH\"\n\
             - reason: A short summary of why.\n\
             - recommendations: A list of 3 actionable steps for the teacher/student.",
            stats.attendance, stats.assignments_completed, stats.average_grade
        );

        self.structured_complete("risk_analysis", &prompt, RiskAnalysis::unavailable()).await
    }

    pub async fn video_summary(&self, key_points: &str) -> String {
        let prompt = format!(
            "Please provide a concise and informative summary of the following video content.\n\
             The summary should capture the main topics and key takeaways, suitable for quick review by students.\n\n\
             Video Content Key Points:\n{key_points}"
        );
        let messages = json!([{"role": "user", "content": prompt}]);

        match self.chat(messages, false, 200, Some(0.7)).await {
            Ok(text) if text.trim().is_empty() => SUMMARY_EMPTY_REPLY.to_string(),
            Ok(text) => text,
            Err(err) => {
                record_fallback("video_summary", &err);
                SUMMARY_FALLBACK.to_string()
            }
        }
    }

    async fn chat(
        &self,
        messages: Value,
        json_mode: bool,
        max_tokens: u32,
        temperature: Option<f64>,
    ) -> Result<String> {
        if !self.is_configured() {
            return Err(anyhow!("AI completion is not configured"));
        }

        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "max_completion_tokens": max_tokens,
        });
        if json_mode {
            payload["response_format"] = json!({"type": "json_object"});
        }
        if let Some(temperature) = temperature {
            payload["temperature"] = json!(temperature);
        }

        let url = format!("{}/chat/completions", self.base_url);
        let timer = Instant::now();
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=self.retries {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow!("AI API error ({status}): {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow!(err).context("Failed to call AI API"));
                }
            }

            if attempt < self.retries {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = extract_content(&body)?;
        tracing::debug!(
            model = %self.model,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = body.pointer("/usage/total_tokens").and_then(serde_json::Value::as_u64),
            "AI completion received"
        );
        Ok(content)
    }
}

fn extract_content(body: &Value) -> Result<String> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .context("Missing AI response content")
}

fn record_fallback(kind: &'static str, err: &anyhow::Error) {
    metrics::counter!("ai_completion_fallbacks_total", "kind" => kind).increment(1);
    tracing::warn!(kind, error = %err, "AI completion failed; using fallback");
}
