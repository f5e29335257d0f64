//! Mood analysis: text-analysis capability plus the mood table

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::moodmap::{normalize_label, MoodTable};
use super::services::EmotionService;
use crate::errors::{AppError, Result};
use crate::models::EmotionalAnalysis;
use crate::plugins::{RawMood, TextAnalyzer};

/// Keywords kept from an analyzer answer
const MAX_KEYWORDS: usize = 5;

pub struct MoodAnalyzer {
    analyzer: Arc<dyn TextAnalyzer>,
    table: Arc<MoodTable>,
    timeout: Duration,
}

impl MoodAnalyzer {
    pub fn new(analyzer: Arc<dyn TextAnalyzer>, table: Arc<MoodTable>, timeout: Duration) -> Self {
        Self {
            analyzer,
            table,
            timeout,
        }
    }

    fn to_analysis(&self, raw: RawMood) -> EmotionalAnalysis {
        let intensity = if raw.intensity.is_finite() {
            raw.intensity.clamp(0.0, 1.0)
        } else {
            0.5
        };

        let primary = match self.table.resolve(&raw.primary_mood) {
            Some(label) => label.to_string(),
            None => {
                warn!(
                    label = %raw.primary_mood,
                    "Unknown mood label, using neutral audio features"
                );
                normalize_label(&raw.primary_mood)
            }
        };
        let secondary = raw.secondary_mood.as_deref().map(|label| {
            self.table
                .resolve(label)
                .map(str::to_string)
                .unwrap_or_else(|| normalize_label(label))
        });

        let audio_features = self
            .table
            .map(&primary, intensity, secondary.as_deref());

        let keywords = raw
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .take(MAX_KEYWORDS)
            .collect();

        EmotionalAnalysis {
            primary_mood: primary,
            secondary_mood: secondary,
            mood_intensity: intensity,
            mood_description: raw.description.trim().to_string(),
            keywords,
            audio_features,
        }
    }
}

#[async_trait]
impl EmotionService for MoodAnalyzer {
    async fn analyze_text(&self, text: &str) -> Result<EmotionalAnalysis> {
        let raw = match tokio::time::timeout(self.timeout, self.analyzer.analyze(text)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "Mood analysis failed");
                return Err(AppError::AnalysisUnavailable(
                    "analysis service failed, try again later".to_string(),
                ));
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Mood analysis timed out");
                return Err(AppError::AnalysisUnavailable(
                    "analysis timed out".to_string(),
                ));
            }
        };

        let analysis = self.to_analysis(raw);
        debug!(
            mood = %analysis.primary_mood,
            intensity = analysis.mood_intensity,
            "Curhatan analysed"
        );
        Ok(analysis)
    }
}
