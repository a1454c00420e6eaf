// Integration tests for the core domain types: profile fallback, presets
// and the research library, exercised through the public API only.

use quill_core::profile::{CitationStyle, Dialect, Percent, PointOfView, SentenceLength};
use quill_core::snippet::format_citation;
use quill_core::{Bibliography, Preset, RawStyleProfile, ResearchSnippet, StyleProfile};

fn raw(json: &str) -> RawStyleProfile {
    serde_json::from_str(json).expect("analyzer JSON should parse leniently")
}

// ===========================================================================
// Profile fallback
// ===========================================================================

#[test]
fn analyzer_output_with_only_tone_keeps_other_defaults() {
    let profile = StyleProfile::from_raw(raw(r#"{"tone": "Formal"}"#));
    let defaults = StyleProfile::default();

    assert_eq!(profile.tone, "Formal");
    assert_eq!(profile.voice, defaults.voice);
    assert_eq!(profile.formality, Percent::new(50));
    assert_eq!(profile.dialect, Dialect::American);
    assert_eq!(profile.transition_words, defaults.transition_words);
    assert_eq!(profile.citation_style, CitationStyle::Apa);
}

#[test]
fn malformed_fields_fall_back_individually() {
    let profile = StyleProfile::from_raw(raw(
        r#"{
            "tone": null,
            "formality": "72%",
            "hedging": "lots",
            "sentence_length": "short",
            "point_of_view": "first_person",
            "dialect": "Klingon",
            "oxford_comma": "yes",
            "banned_words": ["utilize"],
            "citation_style": "MLA",
            "unexpected": 1
        }"#,
    ));

    assert_eq!(profile.tone, "Neutral");
    assert_eq!(profile.formality, Percent::new(72));
    assert_eq!(profile.hedging, Percent::new(30));
    assert_eq!(profile.sentence_length, SentenceLength::Short);
    assert_eq!(profile.point_of_view, PointOfView::FirstPerson);
    assert_eq!(profile.dialect, Dialect::American);
    assert!(profile.oxford_comma);
    assert_eq!(profile.banned_words, vec!["utilize".to_string()]);
    assert_eq!(profile.citation_style, CitationStyle::Mla);
}

#[test]
fn empty_analysis_equals_defaults() {
    assert_eq!(StyleProfile::from_raw(raw("{}")), StyleProfile::default());
}

#[test]
fn error_profile_is_marked_and_neutral() {
    let sentinel = StyleProfile::error_sentinel();
    assert!(sentinel.is_error_sentinel());
    assert_eq!(sentinel.audience, "Error");
    for p in [sentinel.formality, sentinel.hedging, sentinel.active_voice, sentinel.vocabulary] {
        assert_eq!(p.get(), 50);
    }
    assert!(!StyleProfile::default().is_error_sentinel());
}

// ===========================================================================
// Presets
// ===========================================================================

#[test]
fn presets_preserve_unmentioned_fields() {
    let mut current = StyleProfile::default();
    current.audience = "Grant reviewers".into();
    current.rhetorical_devices = vec!["anaphora".into()];

    for preset in Preset::ALL {
        let applied = preset.apply(&current);
        let patch = preset.patch();
        if patch.audience.is_none() {
            assert_eq!(applied.audience, "Grant reviewers", "{preset} touched audience");
        }
        assert_eq!(applied.rhetorical_devices, current.rhetorical_devices);
    }
}

#[test]
fn preset_application_is_idempotent() {
    for preset in Preset::ALL {
        let once = preset.apply(&StyleProfile::default());
        assert_eq!(preset.apply(&once), once);
    }
}

#[test]
fn preset_names_parse_case_insensitively() {
    assert_eq!("ACADEMIC".parse::<Preset>(), Ok(Preset::Academic));
    assert!("poetic".parse::<Preset>().is_err());
}

// ===========================================================================
// Library
// ===========================================================================

#[test]
fn uploads_merge_and_become_searchable() {
    let mut bib = Bibliography::seeded();
    let upload = ResearchSnippet::from_upload("Field Notes.md", "Observed tidal pools.", 1000);

    assert_eq!(bib.merge([upload.clone(), upload.clone()]), 1);
    assert_eq!(bib.len(), 6);

    let hits = bib.match_keywords(&["TIDAL".to_string()]);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, upload.id);
    assert!(format_citation(hits[0]).starts_with("Uploaded document ("));
}

#[test]
fn blank_keywords_match_nothing() {
    let bib = Bibliography::seeded();
    assert!(bib.match_keywords(&[]).is_empty());
    assert!(bib.match_keywords(&["  ".to_string(), String::new()]).is_empty());
}
