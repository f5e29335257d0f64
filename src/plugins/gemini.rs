//! Gemini text-analysis client
//!
//! Asks the model to classify a curhatan into mood labels and returns the raw
//! answer. Mapping the labels to audio features happens in the core.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{excerpt, AnalyzerError, RawMood, TextAnalyzer};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Shape the model is instructed to answer with
#[derive(Debug, Deserialize)]
struct MoodAnswer {
    primary_mood: String,
    #[serde(default)]
    secondary_mood: Option<String>,
    #[serde(default = "default_intensity")]
    mood_intensity: f64,
    #[serde(default)]
    mood_description: String,
    #[serde(default)]
    keywords: Vec<String>,
}

fn default_intensity() -> f64 {
    0.5
}

/// Gemini-backed mood classifier
pub struct GeminiAnalyzer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    labels: Vec<String>,
}

impl GeminiAnalyzer {
    /// `labels` is the mood vocabulary the model should pick from
    pub fn new(
        api_key: String,
        model: String,
        labels: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: GEMINI_API_URL.to_string(),
            api_key,
            model,
            labels,
        })
    }

    fn prompt(&self, text: &str) -> String {
        format!(
            "You analyse journal entries (often in Indonesian) and describe the writer's mood.\n\
             Answer with a single JSON object and nothing else, using these keys:\n\
             primary_mood (one of: {labels}), secondary_mood (one of the same labels, or null),\n\
             mood_intensity (number from 0.0 to 1.0), mood_description (one or two sentences,\n\
             same language as the entry), keywords (up to five short strings).\n\n\
             Journal entry:\n{text}",
            labels = self.labels.join(", "),
            text = text
        )
    }

    /// The key travels in a header so it never shows up in a URL
    fn request(&self, text: &str) -> reqwest::Result<reqwest::Request> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: self.prompt(text),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        };

        self.client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .build()
    }
}

#[async_trait]
impl TextAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, text: &str) -> Result<RawMood, AnalyzerError> {
        if self.api_key.is_empty() {
            return Err(AnalyzerError::NotConfigured);
        }

        let request = self
            .request(text)
            .map_err(|e| AnalyzerError::Connection(e.without_url().to_string()))?;

        debug!(model = %self.model, chars = text.chars().count(), "Requesting mood analysis");

        let resp = self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                AnalyzerError::Timeout
            } else {
                AnalyzerError::Connection(e.without_url().to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Analysis API error body");
            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AnalyzerError::InvalidResponse(e.without_url().to_string()))?;

        let answer = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .ok_or_else(|| AnalyzerError::InvalidResponse("empty candidate list".to_string()))?;

        parse_answer(&answer)
    }
}

/// Parse the model's JSON answer, tolerating a markdown code fence around it
fn parse_answer(answer: &str) -> Result<RawMood, AnalyzerError> {
    let trimmed = answer.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let parsed: MoodAnswer = serde_json::from_str(json)
        .map_err(|e| AnalyzerError::InvalidResponse(format!("unparseable mood answer: {}", e)))?;

    if parsed.primary_mood.trim().is_empty() {
        return Err(AnalyzerError::InvalidResponse(
            "answer without primary_mood".to_string(),
        ));
    }

    Ok(RawMood {
        primary_mood: parsed.primary_mood,
        secondary_mood: parsed.secondary_mood.filter(|m| !m.trim().is_empty()),
        intensity: parsed.mood_intensity,
        description: parsed.mood_description,
        keywords: parsed.keywords,
    })
}
