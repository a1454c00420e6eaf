// Messages exchanged with the session actor.

use quill_core::{Bibliography, Preset, ResearchSnippet, StyleProfile};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::calibration::CalibrationError;
use crate::resolver::Resolution;

/// Requests from the editor surface. Each mutation is applied by the actor
/// alone, one at a time.
#[derive(Debug)]
pub enum Command {
    ResolveCitations {
        excerpt: String,
        reply: oneshot::Sender<Vec<ResearchSnippet>>,
    },
    Calibrate {
        sample: String,
        reply: oneshot::Sender<Result<StyleProfile, CalibrationError>>,
    },
    GenerateSample {
        reply: oneshot::Sender<String>,
    },
    /// Replace the current profile wholesale (settings form save).
    SaveProfile {
        profile: StyleProfile,
        reply: oneshot::Sender<()>,
    },
    /// Start editing (if not already) and return the unsaved draft.
    EditProfile {
        reply: oneshot::Sender<StyleProfile>,
    },
    /// Apply a preset over the unsaved draft.
    ApplyPreset {
        preset: Preset,
        reply: oneshot::Sender<StyleProfile>,
    },
    DiscardDraft,
    /// The primary text changed; restarts the quiet-period timer.
    DocumentEdited {
        text: String,
    },
    AddUpload {
        file_name: String,
        body: String,
        reply: oneshot::Sender<ResearchSnippet>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown,
}

/// Notifications pushed to the editor surface.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantEvent {
    /// Local matches for the document after a quiet period.
    Suggestions(Vec<ResearchSnippet>),
    BibliographyGrew { added: usize, total: usize },
    ProfileReplaced(StyleProfile),
}

/// Completions of spawned oracle work, applied back on the actor.
#[derive(Debug)]
pub enum TaskOutcome {
    Resolved {
        resolution: Resolution,
        reply: oneshot::Sender<Vec<ResearchSnippet>>,
    },
    Calibrated {
        profile: StyleProfile,
        reply: oneshot::Sender<Result<StyleProfile, CalibrationError>>,
    },
    IdleKeywords {
        keywords: Vec<String>,
    },
}

/// A copy of the session state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub bibliography: Bibliography,
    pub profile: StyleProfile,
    pub draft: Option<StyleProfile>,
    pub document: String,
}
