// Core data model for the writing assistant: research snippets, the local
// bibliography with keyword matching, and the style profile with its
// merge-with-fallback and preset rules.

pub mod bibliography;
pub mod preset;
pub mod profile;
pub mod snippet;

pub use bibliography::Bibliography;
pub use preset::Preset;
pub use profile::{RawStyleProfile, StyleProfile};
pub use snippet::ResearchSnippet;
