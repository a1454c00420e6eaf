// Local research library: an ordered, id-unique collection of snippets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::snippet::ResearchSnippet;

/// The session's bibliography.
///
/// Entries keep insertion order; keyword matching walks them in that order
/// so earlier entries win ties. Ids are unique within the collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bibliography {
    entries: Vec<ResearchSnippet>,
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in starter library.
    pub fn seeded() -> Self {
        let mut bib = Self::new();
        bib.merge(seed_entries());
        bib
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResearchSnippet> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[ResearchSnippet] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ResearchSnippet> {
        self.entries.iter().find(|s| s.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.iter().any(|s| s.id == id)
    }

    /// Every id currently present.
    pub fn ids(&self) -> HashSet<String> {
        self.entries.iter().map(|s| s.id.clone()).collect()
    }

    /// Append every snippet whose id is not already present. Existing entries
    /// are never replaced. Returns the number of snippets added.
    pub fn merge<I>(&mut self, snippets: I) -> usize
    where
        I: IntoIterator<Item = ResearchSnippet>,
    {
        let mut ids = self.ids();
        let mut added = 0;
        for snippet in snippets {
            if ids.insert(snippet.id.clone()) {
                self.entries.push(snippet);
                added += 1;
            } else {
                debug!("Skipping snippet with duplicate id {}", snippet.id);
            }
        }
        added
    }

    /// All entries mentioning at least one of `keywords`, in collection order.
    ///
    /// Keywords are compared lowercase against content and tags; blank
    /// keywords are ignored.
    pub fn match_keywords(&self, keywords: &[String]) -> Vec<&ResearchSnippet> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|snippet| keywords.iter().any(|k| snippet.mentions(k)))
            .collect()
    }
}

fn seed_entries() -> Vec<ResearchSnippet> {
    let entry = |id: &str, source: &str, year: i32, author: &str, content: &str, tags: &[&str]| {
        ResearchSnippet {
            id: id.to_string(),
            source: source.to_string(),
            year,
            author: author.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    };

    vec![
        entry(
            "seed-1",
            "The Elegant Universe",
            1999,
            "Brian Greene",
            "String theory proposes that the fundamental constituents of reality are one-dimensional vibrating strings.",
            &["physics", "string theory", "cosmology"],
        ),
        entry(
            "seed-2",
            "Quantum Computation and Quantum Information",
            2000,
            "Michael Nielsen and Isaac Chuang",
            "Quantum algorithms exploit superposition and entanglement to outperform classical computation on specific problems.",
            &["quantum", "computing", "information theory"],
        ),
        entry(
            "seed-3",
            "The Language Instinct",
            1994,
            "Steven Pinker",
            "Language is a distinct piece of the biological makeup of our brains rather than a cultural invention.",
            &["linguistics", "cognition", "evolution"],
        ),
        entry(
            "seed-4",
            "Gödel, Escher, Bach",
            1979,
            "Douglas Hofstadter",
            "Self-reference and formal systems give rise to strange loops that may underlie consciousness.",
            &["logic", "consciousness", "mathematics"],
        ),
        entry(
            "seed-5",
            "The Structure of Scientific Revolutions",
            1962,
            "Thomas Kuhn",
            "Science advances through paradigm shifts rather than a steady accumulation of knowledge.",
            &["philosophy of science", "history", "paradigm"],
        ),
    ]
}
