// Style profile: the tone, grammar, rhetoric and punctuation settings that
// govern generated prose.
//
// A `StyleProfile` is always fully populated. Partial input (from the style
// analyzer or from a preset) arrives as a `RawStyleProfile` and is resolved
// field by field over a base profile.

use std::fmt;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Marker written into descriptive fields when style analysis fails.
pub const ERROR_MARKER: &str = "Error";

/// Neutral midpoint used for every percentage in the error profile.
pub const NEUTRAL_PERCENT: Percent = Percent(50);

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// A whole-number percentage in `0..=100`.
///
/// Deserializes from integers, floats (rounded) and strings such as `"72%"`;
/// out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    pub fn new(value: u8) -> Self {
        Percent(value.min(100))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Percent(value.round().clamp(0.0, 100.0) as u8))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;
        let parsed = match &value {
            serde_json::Value::Number(n) => n.as_f64().and_then(Percent::from_f64),
            serde_json::Value::String(s) => s
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Percent::from_f64),
            _ => None,
        };
        parsed.ok_or_else(|| D::Error::custom(format!("invalid percentage: {value}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    American,
    British,
    Canadian,
    Australian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentenceLength {
    Short,
    Medium,
    Long,
    #[default]
    Varied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOfView {
    FirstPerson,
    SecondPerson,
    #[default]
    ThirdPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CitationStyle {
    #[default]
    Apa,
    Mla,
    Chicago,
    Ieee,
}

// ---------------------------------------------------------------------------
// StyleProfile
// ---------------------------------------------------------------------------

/// The fully-populated style profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    // Tone
    pub tone: String,
    pub voice: String,
    pub audience: String,
    pub formality: Percent,
    pub hedging: Percent,
    pub point_of_view: PointOfView,

    // Grammar
    pub dialect: Dialect,
    pub active_voice: Percent,
    pub sentence_length: SentenceLength,
    pub vocabulary: Percent,
    pub allow_split_infinitives: bool,
    pub allow_final_prepositions: bool,
    pub allow_initial_conjunctions: bool,
    pub allow_contractions: bool,

    // Rhetoric
    pub rhetorical_devices: Vec<String>,
    pub transition_words: Vec<String>,
    pub banned_words: Vec<String>,

    // Punctuation and references
    pub oxford_comma: bool,
    pub allowed_punctuation: Vec<String>,
    pub citation_style: CitationStyle,
}

/// Documented per-field defaults used to fill gaps in partial input.
///
/// Grammar-pedantry flags default to permissive (`true`); list fields default
/// to empty or to a small seed list.
impl Default for StyleProfile {
    fn default() -> Self {
        StyleProfile {
            tone: "Neutral".to_string(),
            voice: "Clear and direct".to_string(),
            audience: "General readers".to_string(),
            formality: Percent(50),
            hedging: Percent(30),
            point_of_view: PointOfView::ThirdPerson,

            dialect: Dialect::American,
            active_voice: Percent(80),
            sentence_length: SentenceLength::Varied,
            vocabulary: Percent(50),
            allow_split_infinitives: true,
            allow_final_prepositions: true,
            allow_initial_conjunctions: true,
            allow_contractions: true,

            rhetorical_devices: Vec::new(),
            transition_words: strings(&["however", "moreover", "therefore"]),
            banned_words: Vec::new(),

            oxford_comma: true,
            allowed_punctuation: strings(&[".", ",", ";", ":", "?", "!"]),
            citation_style: CitationStyle::Apa,
        }
    }
}

impl StyleProfile {
    /// Fill every missing field of `raw` with its documented default.
    pub fn from_raw(raw: RawStyleProfile) -> Self {
        raw.resolve_over(&StyleProfile::default())
    }

    /// The profile reported when style analysis itself fails: descriptive
    /// fields carry the `"Error"` marker, percentages sit at the neutral
    /// midpoint, everything else keeps its default.
    pub fn error_sentinel() -> Self {
        StyleProfile {
            tone: ERROR_MARKER.to_string(),
            voice: ERROR_MARKER.to_string(),
            audience: ERROR_MARKER.to_string(),
            formality: NEUTRAL_PERCENT,
            hedging: NEUTRAL_PERCENT,
            active_voice: NEUTRAL_PERCENT,
            vocabulary: NEUTRAL_PERCENT,
            ..StyleProfile::default()
        }
    }

    pub fn is_error_sentinel(&self) -> bool {
        self.tone == ERROR_MARKER && self.voice == ERROR_MARKER
    }
}

// ---------------------------------------------------------------------------
// RawStyleProfile
// ---------------------------------------------------------------------------

/// A partial style profile: every field optional.
///
/// Used both for analyzer output and for preset patches. Deserialization is
/// lenient per field: `null`, a wrong type or an unknown variant yields
/// `None` for that field instead of failing the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStyleProfile {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub formality: Option<Percent>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub hedging: Option<Percent>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub point_of_view: Option<PointOfView>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub active_voice: Option<Percent>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sentence_length: Option<SentenceLength>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Percent>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub allow_split_infinitives: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub allow_final_prepositions: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub allow_initial_conjunctions: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub allow_contractions: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rhetorical_devices: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub transition_words: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub banned_words: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub oxford_comma: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub allowed_punctuation: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub citation_style: Option<CitationStyle>,
}

impl RawStyleProfile {
    /// Field-by-field coalesce: take each value present here, otherwise keep
    /// the value from `base`. Flat, no recursion.
    pub fn resolve_over(self, base: &StyleProfile) -> StyleProfile {
        let base = base.clone();
        StyleProfile {
            tone: self.tone.unwrap_or(base.tone),
            voice: self.voice.unwrap_or(base.voice),
            audience: self.audience.unwrap_or(base.audience),
            formality: self.formality.unwrap_or(base.formality),
            hedging: self.hedging.unwrap_or(base.hedging),
            point_of_view: self.point_of_view.unwrap_or(base.point_of_view),
            dialect: self.dialect.unwrap_or(base.dialect),
            active_voice: self.active_voice.unwrap_or(base.active_voice),
            sentence_length: self.sentence_length.unwrap_or(base.sentence_length),
            vocabulary: self.vocabulary.unwrap_or(base.vocabulary),
            allow_split_infinitives: self
                .allow_split_infinitives
                .unwrap_or(base.allow_split_infinitives),
            allow_final_prepositions: self
                .allow_final_prepositions
                .unwrap_or(base.allow_final_prepositions),
            allow_initial_conjunctions: self
                .allow_initial_conjunctions
                .unwrap_or(base.allow_initial_conjunctions),
            allow_contractions: self.allow_contractions.unwrap_or(base.allow_contractions),
            rhetorical_devices: self.rhetorical_devices.unwrap_or(base.rhetorical_devices),
            transition_words: self.transition_words.unwrap_or(base.transition_words),
            banned_words: self.banned_words.unwrap_or(base.banned_words),
            oxford_comma: self.oxford_comma.unwrap_or(base.oxford_comma),
            allowed_punctuation: self.allowed_punctuation.unwrap_or(base.allowed_punctuation),
            citation_style: self.citation_style.unwrap_or(base.citation_style),
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
