// Parsing of model replies into typed oracle results.
//
// Replies are expected to be JSON but often arrive wrapped in prose or a
// ```json fence. Each bracket in the reply is tried as the start of a JSON
// value, so stray brackets in the prose do not hide the payload.

use quill_core::profile::RawStyleProfile;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::oracle::{CitationDraft, OracleError};

/// Keyword replies are capped at this many entries.
pub const MAX_KEYWORDS: usize = 5;

/// Every well-formed JSON value in `text` that begins at an `open`
/// character, in order of position. Trailing prose after a value is ignored.
pub(crate) fn json_candidates(text: &str, open: char) -> impl Iterator<Item = Value> + '_ {
    text.match_indices(open).filter_map(|(i, _)| {
        serde_json::Deserializer::from_str(&text[i..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
    })
}

/// The first candidate `convert` accepts and `useful` approves of, else the
/// first one `convert` accepts at all.
fn first_useful<T>(
    candidates: impl Iterator<Item = Value>,
    convert: impl Fn(Value) -> Option<T>,
    useful: impl Fn(&T) -> bool,
) -> Option<T> {
    let mut fallback = None;
    for value in candidates {
        let Some(parsed) = convert(value) else {
            continue;
        };
        if useful(&parsed) {
            return Some(parsed);
        }
        fallback.get_or_insert(parsed);
    }
    fallback
}

fn parse_array<T>(
    text: &str,
    convert: impl Fn(Vec<Value>) -> Vec<T>,
) -> Result<Vec<T>, OracleError> {
    let items = |value: Value| match value {
        Value::Array(items) => Some(convert(items)),
        _ => None,
    };
    first_useful(json_candidates(text, '['), items, |parsed| !parsed.is_empty())
        .ok_or_else(|| OracleError::Malformed("no JSON array in reply".to_string()))
}

/// A JSON array of strings, lowercased and trimmed, blanks dropped, at most
/// `MAX_KEYWORDS`. Non-string elements are skipped.
pub fn parse_keywords(text: &str) -> Result<Vec<String>, OracleError> {
    parse_array(text, |items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .take(MAX_KEYWORDS)
            .collect()
    })
}

#[derive(Debug, Deserialize)]
struct DraftWire {
    title: Option<String>,
    author: Option<String>,
    year: Option<Value>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tags: Option<Vec<Value>>,
}

fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl DraftWire {
    fn into_draft(self) -> Option<CitationDraft> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let author = self.author.filter(|a| !a.trim().is_empty())?;
        let year = self.year.as_ref().and_then(parse_year)?;
        let tags = self
            .tags
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Some(CitationDraft {
            title: title.trim().to_string(),
            year,
            author: author.trim().to_string(),
            content: self.content.unwrap_or_default().trim().to_string(),
            tags,
        })
    }
}

/// An array of citation records. Records lacking a title, author or year are
/// dropped, as is anything beyond `count`.
pub fn parse_citation_drafts(text: &str, count: usize) -> Result<Vec<CitationDraft>, OracleError> {
    parse_array(text, |items| {
        items
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<DraftWire>(v) {
                Ok(wire) => wire.into_draft(),
                Err(e) => {
                    debug!("dropping citation record: {e}");
                    None
                }
            })
            .take(count)
            .collect()
    })
}

/// A JSON object read leniently into a partial profile.
pub fn parse_style_profile(text: &str) -> Result<RawStyleProfile, OracleError> {
    let profile = |value: Value| match value {
        Value::Object(_) => serde_json::from_value::<RawStyleProfile>(value).ok(),
        _ => None,
    };
    first_useful(json_candidates(text, '{'), profile, |raw| {
        *raw != RawStyleProfile::default()
    })
    .ok_or_else(|| OracleError::Malformed("no JSON object in reply".to_string()))
}
