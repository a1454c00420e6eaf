// Deterministic in-process oracle.
//
// Answers come from canned values set with the builder methods, and every
// call is recorded so tests can assert exactly which operations ran.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use quill_core::profile::{RawStyleProfile, StyleProfile};

use crate::oracle::{CitationDraft, Oracle, OracleError};

/// One recorded oracle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleCall {
    ExtractKeywords(String),
    GenerateCitations { excerpt: String, count: usize },
    AnalyzeStyle(String),
    GenerateSample(StyleProfile),
}

#[derive(Debug, Clone)]
enum CitationReply {
    /// Fabricate exactly the requested number of drafts.
    Fabricate,
    Fixed(Vec<CitationDraft>),
    Fail(OracleError),
}

pub struct StubOracle {
    keywords: Result<Vec<String>, OracleError>,
    citations: CitationReply,
    style: Result<RawStyleProfile, OracleError>,
    sample: Result<String, OracleError>,
    latency: Option<Duration>,
    calls: Mutex<Vec<OracleCall>>,
}

impl Default for StubOracle {
    fn default() -> Self {
        StubOracle {
            keywords: Ok(Vec::new()),
            citations: CitationReply::Fabricate,
            style: Ok(RawStyleProfile::default()),
            sample: Ok("A sample paragraph.".to_string()),
            latency: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = Ok(keywords.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn failing_keywords(mut self) -> Self {
        self.keywords = Err(OracleError::Transport("keyword service down".to_string()));
        self
    }

    pub fn with_citations(mut self, drafts: Vec<CitationDraft>) -> Self {
        self.citations = CitationReply::Fixed(drafts);
        self
    }

    pub fn failing_citations(mut self) -> Self {
        self.citations = CitationReply::Fail(OracleError::Malformed("not JSON".to_string()));
        self
    }

    pub fn with_style(mut self, raw: RawStyleProfile) -> Self {
        self.style = Ok(raw);
        self
    }

    pub fn failing_style(mut self) -> Self {
        self.style = Err(OracleError::Transport("analysis service down".to_string()));
        self
    }

    pub fn with_sample(mut self, sample: &str) -> Self {
        self.sample = Ok(sample.to_string());
        self
    }

    pub fn failing_sample(mut self) -> Self {
        self.sample = Err(OracleError::EmptyResponse);
        self
    }

    /// Delay every answer by `latency` (honors tokio's paused clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<OracleCall> {
        self.lock_calls().clone()
    }

    pub fn citation_requests(&self) -> Vec<usize> {
        self.lock_calls()
            .iter()
            .filter_map(|c| match c {
                OracleCall::GenerateCitations { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    pub fn analysis_calls(&self) -> usize {
        self.lock_calls()
            .iter()
            .filter(|c| matches!(c, OracleCall::AnalyzeStyle(_)))
            .count()
    }

    pub fn keyword_calls(&self) -> usize {
        self.lock_calls()
            .iter()
            .filter(|c| matches!(c, OracleCall::ExtractKeywords(_)))
            .count()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<OracleCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn record(&self, call: OracleCall) {
        self.lock_calls().push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// A plausible synthetic record, numbered for traceability.
pub fn fabricated_draft(n: usize) -> CitationDraft {
    CitationDraft {
        title: format!("Generated Source {n}"),
        year: 2000 + n as i32,
        author: format!("Author {n}"),
        content: format!("Synthetic supporting finding number {n}."),
        tags: vec!["generated".to_string()],
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, OracleError> {
        self.record(OracleCall::ExtractKeywords(text.to_string())).await;
        self.keywords.clone()
    }

    async fn generate_citations(
        &self,
        excerpt: &str,
        count: usize,
    ) -> Result<Vec<CitationDraft>, OracleError> {
        self.record(OracleCall::GenerateCitations {
            excerpt: excerpt.to_string(),
            count,
        })
        .await;
        match &self.citations {
            CitationReply::Fabricate => Ok((1..=count).map(fabricated_draft).collect()),
            CitationReply::Fixed(drafts) => Ok(drafts.clone()),
            CitationReply::Fail(err) => Err(err.clone()),
        }
    }

    async fn analyze_style(&self, sample: &str) -> Result<RawStyleProfile, OracleError> {
        self.record(OracleCall::AnalyzeStyle(sample.to_string())).await;
        self.style.clone()
    }

    async fn generate_style_sample(&self, profile: &StyleProfile) -> Result<String, OracleError> {
        self.record(OracleCall::GenerateSample(profile.clone())).await;
        self.sample.clone()
    }
}
