// Citation resolution: surface local research first, top up with generated
// citations when the library falls short.

use quill_core::snippet::{fresh_id_excluding, truncate_chars};
use quill_core::{Bibliography, ResearchSnippet};
use quill_llm::Oracle;
use tracing::{debug, info, warn};

use crate::config::ResolverSettings;

/// Citations returned per resolution.
pub const MAX_CITATIONS: usize = 3;

/// The outcome of one resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Local matches first, then synthetic ones. Never more than `MAX_CITATIONS`.
    pub citations: Vec<ResearchSnippet>,
    /// The generated entries, which the caller must admit to its bibliography.
    pub synthetic: Vec<ResearchSnippet>,
}

impl Resolution {
    /// Admit the synthetic entries to `bibliography`. Returns how many were new.
    pub fn merge_into(&self, bibliography: &mut Bibliography) -> usize {
        bibliography.merge(self.synthetic.iter().cloned())
    }
}

/// Keywords for `text`, or none when the text is too short or the oracle
/// fails. Never an error.
pub async fn extract_keywords(oracle: &dyn Oracle, text: &str, min_chars: usize) -> Vec<String> {
    let len = text.trim().chars().count();
    if len < min_chars {
        debug!("Skipping keyword extraction: {} chars < {}", len, min_chars);
        return Vec::new();
    }

    match oracle.extract_keywords(text).await {
        Ok(keywords) => keywords,
        Err(e) => {
            warn!("Keyword extraction failed, continuing without keywords: {}", e);
            Vec::new()
        }
    }
}

/// Resolve supporting citations for `excerpt` against `bibliography`.
///
/// Up to `MAX_CITATIONS` keyword matches are taken in library order. If that
/// fills the quota no generation is attempted; otherwise exactly the
/// shortfall is requested from the generator, and each generated entry gets
/// a fresh id absent from `bibliography`. A failed generation leaves only the
/// local matches.
pub async fn resolve_citations(
    oracle: &dyn Oracle,
    excerpt: &str,
    bibliography: &Bibliography,
    settings: &ResolverSettings,
) -> Resolution {
    let keywords = extract_keywords(oracle, excerpt, settings.min_keyword_chars).await;

    let mut citations: Vec<ResearchSnippet> = bibliography
        .match_keywords(&keywords)
        .into_iter()
        .take(MAX_CITATIONS)
        .cloned()
        .collect();

    if citations.len() >= MAX_CITATIONS {
        debug!("Resolved {} local citations, no generation needed", citations.len());
        return Resolution {
            citations,
            synthetic: Vec::new(),
        };
    }

    let shortfall = MAX_CITATIONS - citations.len();
    let context = truncate_chars(excerpt.trim(), settings.context_chars);

    let synthetic = match oracle.generate_citations(&context, shortfall).await {
        Ok(drafts) => {
            let mut taken = bibliography.ids();
            drafts
                .into_iter()
                .take(shortfall)
                .map(|draft| {
                    let id = fresh_id_excluding(&taken);
                    taken.insert(id.clone());
                    draft.into_snippet(id)
                })
                .collect()
        }
        Err(e) => {
            warn!("Citation generation failed, returning local matches only: {}", e);
            Vec::new()
        }
    };

    info!(
        "Resolved {} local + {} generated citations (requested {})",
        citations.len(),
        synthetic.len(),
        shortfall
    );

    citations.extend(synthetic.iter().cloned());
    Resolution {
        citations,
        synthetic,
    }
}

/// Resolve and immediately admit generated entries to `bibliography`.
pub async fn resolve_and_merge(
    oracle: &dyn Oracle,
    excerpt: &str,
    bibliography: &mut Bibliography,
    settings: &ResolverSettings,
) -> Vec<ResearchSnippet> {
    let resolution = resolve_citations(oracle, excerpt, bibliography, settings).await;
    resolution.merge_into(bibliography);
    resolution.citations
}
