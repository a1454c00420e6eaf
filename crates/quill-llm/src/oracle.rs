// Oracle capability: the four external text-understanding operations.

use async_trait::async_trait;
use quill_core::profile::{RawStyleProfile, StyleProfile};
use quill_core::ResearchSnippet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an oracle call produced no usable answer. Callers decide the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("LLM not configured")]
    NotConfigured,

    #[error("{0}")]
    Transport(String),

    #[error("response contained no content")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A synthetic bibliography record produced by the citation generator.
/// It has no id until it is admitted to a bibliography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationDraft {
    pub title: String,
    pub year: i32,
    pub author: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl CitationDraft {
    pub fn into_snippet(self, id: String) -> ResearchSnippet {
        ResearchSnippet {
            id,
            source: self.title,
            year: self.year,
            author: self.author,
            content: self.content,
            tags: self.tags,
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle trait
// ---------------------------------------------------------------------------

/// External black-box language services.
///
/// Implementations report failures as `OracleError`; none of them retry.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Up to five lowercase keywords describing `text`.
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, OracleError>;

    /// `count` synthetic citations supporting `excerpt`.
    async fn generate_citations(
        &self,
        excerpt: &str,
        count: usize,
    ) -> Result<Vec<CitationDraft>, OracleError>;

    /// A possibly-partial style profile inferred from `sample`.
    async fn analyze_style(&self, sample: &str) -> Result<RawStyleProfile, OracleError>;

    /// A short passage written according to `profile`.
    async fn generate_style_sample(&self, profile: &StyleProfile) -> Result<String, OracleError>;
}
