// Research snippets: one bibliography entry each.

use std::collections::HashSet;
use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Author recorded on snippets built from uploaded documents.
pub const UPLOAD_AUTHOR: &str = "Uploaded document";

/// Tag every uploaded snippet carries.
pub const UPLOAD_TAG: &str = "upload";

// ---------------------------------------------------------------------------
// ResearchSnippet
// ---------------------------------------------------------------------------

/// A single bibliography entry.
///
/// Identity is the `id` alone. Two snippets with identical content but
/// different ids are distinct entries and are never collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSnippet {
    pub id: String,
    pub source: String,
    pub year: i32,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ResearchSnippet {
    /// Build a snippet from an uploaded document.
    ///
    /// The title is the file name without its extension, the content is the
    /// first `preview_chars` characters of `body` (with `...` appended when
    /// cut), and the tags are `upload` plus the lowercased extension if any.
    pub fn from_upload(file_name: &str, body: &str, preview_chars: usize) -> Self {
        let path = Path::new(file_name);
        let source = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(file_name)
            .to_string();

        let mut tags = vec![UPLOAD_TAG.to_string()];
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            tags.push(ext.to_lowercase());
        }

        ResearchSnippet {
            id: new_snippet_id(),
            source,
            year: chrono::Utc::now().year(),
            author: UPLOAD_AUTHOR.to_string(),
            content: truncate_chars(body.trim(), preview_chars),
            tags,
        }
    }

    /// Case-insensitive check: does `keyword` occur in the content or in any
    /// tag? `keyword` must already be lowercase.
    pub fn mentions(&self, keyword: &str) -> bool {
        if keyword.is_empty() {
            return false;
        }
        self.content.to_lowercase().contains(keyword)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(keyword))
    }
}

/// Render a snippet as an inline reference, e.g. `Hawking (1988). A Brief History of Time.`
pub fn format_citation(snippet: &ResearchSnippet) -> String {
    let source = snippet.source.trim_end_matches('.');
    format!("{} ({}). {}.", snippet.author, snippet.year, source)
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Generate a fresh snippet id.
pub fn new_snippet_id() -> String {
    format!("src-{}", Uuid::new_v4())
}

/// Generate a snippet id guaranteed to be absent from `taken`.
pub fn fresh_id_excluding(taken: &HashSet<String>) -> String {
    loop {
        let id = new_snippet_id();
        if !taken.contains(&id) {
            return id;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Truncate to at most `max_chars` characters on a char boundary, appending
/// `...` when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
