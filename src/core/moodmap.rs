//! Mood label to audio-feature policy table
//!
//! Each known mood has an anchor `AudioFeatures` and a list of provider seed
//! genres. Labels coming from the analyzer are normalized and resolved
//! through an alias map before lookup, so Indonesian labels such as `sedih`
//! land on the same entry as `sad`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::models::AudioFeatures;

/// Weight of the secondary mood in the final vector
const SECONDARY_BLEND: f64 = 0.25;

/// One row of the table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoodEntry {
    pub features: AudioFeatures,
    #[serde(default)]
    pub seed_genres: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// On-disk override format: `{"moods": {"<label>": MoodEntry, ...}}`
#[derive(Debug, Deserialize)]
struct MoodTableFile {
    moods: HashMap<String, MoodEntry>,
}

/// Configurable mapping from mood labels to audio features
#[derive(Debug, Clone)]
pub struct MoodTable {
    /// Canonical label -> entry
    entries: BTreeMap<String, MoodEntry>,
    /// Alias -> canonical label
    aliases: HashMap<String, String>,
}

/// Trim and lowercase a label
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

#[allow(clippy::too_many_arguments)]
fn entry(
    valence: f64,
    energy: f64,
    tempo: f64,
    danceability: f64,
    acousticness: f64,
    instrumentalness: f64,
    seed_genres: &[&str],
    aliases: &[&str],
) -> MoodEntry {
    MoodEntry {
        features: AudioFeatures {
            valence,
            energy,
            tempo,
            danceability,
            acousticness,
            instrumentalness,
        },
        seed_genres: seed_genres.iter().map(|s| s.to_string()).collect(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
    }
}

impl Default for MoodTable {
    fn default() -> Self {
        let n = AudioFeatures::NEUTRAL;
        #[rustfmt::skip]
        let defaults = vec![
            ("happy", entry(0.9, 0.8, 124.0, 0.8, 0.2, 0.1, &["pop", "happy", "dance"], &["senang", "bahagia", "gembira", "joyful"])),
            ("sad", entry(0.1, 0.25, 75.0, 0.3, 0.8, 0.2, &["sad", "acoustic", "indie"], &["sedih", "depressed", "melancholy"])),
            ("angry", entry(0.2, 0.95, 150.0, 0.5, 0.05, 0.2, &["rock", "metal", "hard-rock"], &["marah", "kesal", "frustrated"])),
            ("anxious", entry(0.3, 0.6, 110.0, 0.4, 0.4, 0.4, &["ambient", "chill", "indie"], &["cemas", "khawatir", "gelisah", "worried"])),
            ("calm", entry(0.6, 0.2, 80.0, 0.4, 0.85, 0.5, &["chill", "ambient", "acoustic"], &["tenang", "damai", "peaceful", "relaxed"])),
            ("excited", entry(0.85, 0.95, 135.0, 0.85, 0.1, 0.05, &["edm", "dance", "party"], &["semangat", "antusias", "energetic"])),
            ("romantic", entry(0.7, 0.4, 95.0, 0.55, 0.6, 0.1, &["romance", "r-n-b", "soul"], &["romantis", "jatuh cinta", "in love"])),
            ("nostalgic", entry(0.45, 0.35, 90.0, 0.45, 0.65, 0.2, &["singer-songwriter", "folk", "indie"], &["rindu", "kangen", "nostalgia"])),
            ("lonely", entry(0.2, 0.2, 72.0, 0.3, 0.8, 0.3, &["sad", "acoustic", "piano"], &["kesepian", "sepi", "sendiri"])),
            ("tired", entry(0.35, 0.15, 70.0, 0.3, 0.8, 0.45, &["chill", "sleep", "piano"], &["lelah", "capek", "exhausted"])),
            ("hopeful", entry(0.7, 0.6, 112.0, 0.6, 0.4, 0.1, &["indie-pop", "pop", "folk"], &["berharap", "optimis", "optimistic"])),
            ("stressed", entry(0.3, 0.7, 120.0, 0.45, 0.3, 0.3, &["alternative", "rock", "chill"], &["stres", "tertekan", "overwhelmed"])),
            ("neutral", entry(n.valence, n.energy, n.tempo, n.danceability, n.acousticness, n.instrumentalness, &["pop", "indie"], &["biasa", "netral"])),
        ];

        let mut table = MoodTable {
            entries: BTreeMap::new(),
            aliases: HashMap::new(),
        };
        for (label, e) in defaults {
            table.insert(label, e);
        }
        table
    }
}

impl MoodTable {
    /// Built-in table with the entries of the JSON file at `path` merged over it.
    ///
    /// A label present in the file replaces the built-in entry of that label.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mood table {}", path.display()))?;
        let file: MoodTableFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse mood table {}", path.display()))?;

        let mut table = Self::default();
        for (label, e) in file.moods {
            if normalize_label(&label).is_empty() {
                anyhow::bail!("Mood table {} has an empty label", path.display());
            }
            if !e.features.is_bounded() {
                anyhow::bail!(
                    "Mood '{}' in {} has audio features out of range",
                    label,
                    path.display()
                );
            }
            table.insert(&label, e);
        }
        Ok(table)
    }

    fn insert(&mut self, label: &str, entry: MoodEntry) {
        let label = normalize_label(label);
        for alias in &entry.aliases {
            let alias = normalize_label(alias);
            if !alias.is_empty() {
                self.aliases.insert(alias, label.clone());
            }
        }
        // a canonical label always resolves to itself, even if an alias claimed it
        self.aliases.remove(&label);
        self.entries.insert(label, entry);
    }

    /// Canonical labels, sorted
    pub fn labels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Resolve a raw label to its canonical form, if the table knows it
    pub fn resolve(&self, label: &str) -> Option<&str> {
        let label = normalize_label(label);
        if let Some((canonical, _)) = self.entries.get_key_value(&label) {
            return Some(canonical.as_str());
        }
        self.aliases.get(&label).map(String::as_str)
    }

    fn lookup(&self, label: &str) -> Option<&MoodEntry> {
        self.resolve(label).and_then(|l| self.entries.get(l))
    }

    /// Map a mood to target audio features.
    ///
    /// Unknown primary labels yield `AudioFeatures::NEUTRAL` unchanged. For a
    /// known label the vector moves from neutral towards the anchor by
    /// `0.5 + 0.5 * intensity`; a known secondary mood pulls the result a
    /// quarter of the way towards its own weighted anchor.
    pub fn map(&self, primary: &str, intensity: f64, secondary: Option<&str>) -> AudioFeatures {
        let Some(primary) = self.lookup(primary) else {
            return AudioFeatures::NEUTRAL;
        };

        let intensity = if intensity.is_finite() {
            intensity.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let weight = 0.5 + 0.5 * intensity;
        let neutral = AudioFeatures::NEUTRAL;

        let mut features = neutral.lerp(&primary.features, weight);
        if let Some(secondary) = secondary.and_then(|s| self.lookup(s)) {
            let pull = neutral.lerp(&secondary.features, weight);
            features = features.lerp(&pull, SECONDARY_BLEND);
        }
        features.clamped()
    }

    /// Seed genres for a mood, primary first, without duplicates
    pub fn seed_genres(&self, primary: &str, secondary: Option<&str>) -> Vec<String> {
        let mut genres: Vec<String> = Vec::new();
        let sources = std::iter::once(primary).chain(secondary);
        for entry in sources.filter_map(|l| self.lookup(l)) {
            for genre in &entry.seed_genres {
                if !genres.contains(genre) {
                    genres.push(genre.clone());
                }
            }
        }
        genres
    }
}
