//! Emotional analysis model

use serde::{Deserialize, Serialize};

/// Lowest tempo (BPM) a feature vector may target
pub const MIN_TEMPO: f64 = 40.0;
/// Highest tempo (BPM) a feature vector may target
pub const MAX_TEMPO: f64 = 220.0;

/// Target audio characteristics used for track selection.
///
/// Every field lies in `[0.0, 1.0]` except `tempo`, which is a BPM value
/// in `[MIN_TEMPO, MAX_TEMPO]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Musical positiveness
    pub valence: f64,
    pub energy: f64,
    /// Estimated tempo in BPM
    pub tempo: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
}

impl AudioFeatures {
    /// Baseline used whenever a mood label has no mapping
    pub const NEUTRAL: AudioFeatures = AudioFeatures {
        valence: 0.5,
        energy: 0.5,
        tempo: 100.0,
        danceability: 0.5,
        acousticness: 0.5,
        instrumentalness: 0.3,
    };

    /// Clamp every component into its declared range
    pub fn clamped(self) -> Self {
        Self {
            valence: unit(self.valence),
            energy: unit(self.energy),
            tempo: if self.tempo.is_finite() {
                self.tempo.clamp(MIN_TEMPO, MAX_TEMPO)
            } else {
                Self::NEUTRAL.tempo
            },
            danceability: unit(self.danceability),
            acousticness: unit(self.acousticness),
            instrumentalness: unit(self.instrumentalness),
        }
    }

    /// Check that every component is within its range
    pub fn is_bounded(&self) -> bool {
        let units = [
            self.valence,
            self.energy,
            self.danceability,
            self.acousticness,
            self.instrumentalness,
        ];
        units.iter().all(|v| (0.0..=1.0).contains(v))
            && (MIN_TEMPO..=MAX_TEMPO).contains(&self.tempo)
    }

    /// Component-wise `self + (other - self) * t`
    pub fn lerp(&self, other: &AudioFeatures, t: f64) -> AudioFeatures {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        AudioFeatures {
            valence: mix(self.valence, other.valence),
            energy: mix(self.energy, other.energy),
            tempo: mix(self.tempo, other.tempo),
            danceability: mix(self.danceability, other.danceability),
            acousticness: mix(self.acousticness, other.acousticness),
            instrumentalness: mix(self.instrumentalness, other.instrumentalness),
        }
    }
}

impl Default for AudioFeatures {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Emotional profile inferred from a curhatan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalAnalysis {
    pub primary_mood: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_mood: Option<String>,
    /// 0.0 to 1.0
    pub mood_intensity: f64,
    pub mood_description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    pub audio_features: AudioFeatures,
}
