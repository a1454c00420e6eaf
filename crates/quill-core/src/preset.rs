// Named style presets. Each is a static partial profile applied over the
// profile currently being edited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::{
    CitationStyle, Percent, PointOfView, RawStyleProfile, SentenceLength, StyleProfile,
};

#[derive(Debug, Error, PartialEq)]
#[error("unknown preset `{0}` (expected one of: scientific, academic, journalistic, conversational)")]
pub struct UnknownPreset(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Scientific,
    Academic,
    Journalistic,
    Conversational,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Scientific,
        Preset::Academic,
        Preset::Journalistic,
        Preset::Conversational,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Scientific => "Scientific",
            Preset::Academic => "Academic",
            Preset::Journalistic => "Journalistic",
            Preset::Conversational => "Conversational",
        }
    }

    /// The fixed subset of fields this preset overwrites.
    pub fn patch(self) -> RawStyleProfile {
        match self {
            Preset::Scientific => RawStyleProfile {
                tone: Some("Objective".into()),
                voice: Some("Precise and measured".into()),
                formality: Some(Percent::new(90)),
                hedging: Some(Percent::new(60)),
                active_voice: Some(Percent::new(50)),
                point_of_view: Some(PointOfView::ThirdPerson),
                allow_contractions: Some(false),
                oxford_comma: Some(true),
                citation_style: Some(CitationStyle::Apa),
                banned_words: Some(vec!["very".into(), "really".into(), "amazing".into()]),
                ..RawStyleProfile::default()
            },
            Preset::Academic => RawStyleProfile {
                tone: Some("Scholarly".into()),
                formality: Some(Percent::new(85)),
                vocabulary: Some(Percent::new(80)),
                sentence_length: Some(SentenceLength::Long),
                allow_contractions: Some(false),
                allow_initial_conjunctions: Some(false),
                citation_style: Some(CitationStyle::Chicago),
                transition_words: Some(vec![
                    "furthermore".into(),
                    "consequently".into(),
                    "nevertheless".into(),
                ]),
                ..RawStyleProfile::default()
            },
            Preset::Journalistic => RawStyleProfile {
                tone: Some("Direct".into()),
                audience: Some("General public".into()),
                formality: Some(Percent::new(55)),
                active_voice: Some(Percent::new(90)),
                sentence_length: Some(SentenceLength::Short),
                oxford_comma: Some(false),
                ..RawStyleProfile::default()
            },
            Preset::Conversational => RawStyleProfile {
                tone: Some("Friendly".into()),
                voice: Some("Warm and informal".into()),
                formality: Some(Percent::new(20)),
                hedging: Some(Percent::new(20)),
                point_of_view: Some(PointOfView::SecondPerson),
                allow_contractions: Some(true),
                allow_initial_conjunctions: Some(true),
                ..RawStyleProfile::default()
            },
        }
    }

    /// Apply this preset over `profile`, leaving unmentioned fields untouched.
    pub fn apply(self, profile: &StyleProfile) -> StyleProfile {
        self.patch().resolve_over(profile)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}
