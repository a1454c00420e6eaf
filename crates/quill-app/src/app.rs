// Session state and the actor loop that owns it.
//
// The bibliography and the style profile are mutated only here, by one task,
// one message at a time. Oracle calls run in spawned tasks; their results
// come back through the task channel and are applied in arrival order with
// no staleness check (last write wins).

use std::sync::Arc;

use quill_core::{Bibliography, Preset, ResearchSnippet, StyleProfile};
use quill_llm::Oracle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::calibration;
use crate::config::Config;
use crate::protocol::{AssistantEvent, Command, Snapshot, TaskOutcome};
use crate::resolver::{self, Resolution};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub bibliography: Bibliography,
    /// The profile in force for generation.
    pub profile: StyleProfile,
    /// The settings-form copy being edited, if any.
    pub draft: Option<StyleProfile>,
    /// Latest primary document text.
    pub document: String,
    /// When the quiet period after the last edit ends.
    pub quiet_deadline: Option<Instant>,
    pub oracle: Arc<dyn Oracle>,
    /// Spawned oracle tasks report back through clones of this sender.
    pub task_tx: mpsc::Sender<TaskOutcome>,
}

impl AppState {
    pub fn new(
        config: Config,
        oracle: Arc<dyn Oracle>,
        bibliography: Bibliography,
        task_tx: mpsc::Sender<TaskOutcome>,
    ) -> Self {
        AppState {
            config,
            bibliography,
            profile: StyleProfile::default(),
            draft: None,
            document: String::new(),
            quiet_deadline: None,
            oracle,
            task_tx,
        }
    }

    /// Admit generated citations. Returns how many were new.
    pub fn merge_citations(&mut self, resolution: &Resolution) -> usize {
        let added = resolution.merge_into(&mut self.bibliography);
        if added > 0 {
            info!(
                "Bibliography grew by {} (now {} entries)",
                added,
                self.bibliography.len()
            );
        }
        added
    }

    /// Replace the current profile wholesale and drop any draft.
    pub fn replace_profile(&mut self, profile: StyleProfile) {
        self.profile = profile;
        self.draft = None;
    }

    pub fn edit_profile(&mut self) -> StyleProfile {
        self.draft.get_or_insert_with(|| self.profile.clone()).clone()
    }

    pub fn apply_preset(&mut self, preset: Preset) -> StyleProfile {
        let base = self.edit_profile();
        let patched = preset.apply(&base);
        info!("Applied {} preset to draft profile", preset);
        self.draft = Some(patched.clone());
        patched
    }

    pub fn discard_draft(&mut self) {
        self.draft = None;
    }

    /// Record new document text and restart the quiet-period timer.
    pub fn document_edited(&mut self, text: String) {
        self.document = text;
        self.quiet_deadline = Some(Instant::now() + self.config.resolver.quiet_period());
    }

    pub fn add_upload(&mut self, file_name: &str, body: &str) -> ResearchSnippet {
        let mut snippet = ResearchSnippet::from_upload(
            file_name,
            body,
            self.config.library.upload_preview_chars,
        );
        while self.bibliography.contains_id(&snippet.id) {
            snippet.id = quill_core::snippet::new_snippet_id();
        }
        self.bibliography.merge([snippet.clone()]);
        info!("Added uploaded document '{}' as {}", file_name, snippet.id);
        snippet
    }

    /// Local matches for `keywords` against the current library.
    pub fn local_suggestions(&self, keywords: &[String]) -> Vec<ResearchSnippet> {
        self.bibliography
            .match_keywords(keywords)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            bibliography: self.bibliography.clone(),
            profile: self.profile.clone(),
            draft: self.draft.clone(),
            document: self.document.clone(),
        }
    }

    fn spawn_resolution(&self, excerpt: String, reply: oneshot::Sender<Vec<ResearchSnippet>>) {
        let oracle = Arc::clone(&self.oracle);
        let bibliography = self.bibliography.clone();
        let settings = self.config.resolver.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let resolution =
                resolver::resolve_citations(oracle.as_ref(), &excerpt, &bibliography, &settings)
                    .await;
            let _ = tx.send(TaskOutcome::Resolved { resolution, reply }).await;
        });
    }

    fn spawn_calibration(
        &self,
        sample: String,
        reply: oneshot::Sender<Result<StyleProfile, calibration::CalibrationError>>,
    ) {
        let oracle = Arc::clone(&self.oracle);
        let min_chars = self.config.calibration.min_sample_chars;
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            match calibration::calibrate(oracle.as_ref(), &sample, min_chars).await {
                Ok(profile) => {
                    let _ = tx.send(TaskOutcome::Calibrated { profile, reply }).await;
                }
                Err(e) => {
                    // Rejected before any oracle call; state is untouched.
                    info!("Calibration rejected: {}", e);
                    let _ = reply.send(Err(e));
                }
            }
        });
    }

    fn spawn_sample(&self, reply: oneshot::Sender<String>) {
        let oracle = Arc::clone(&self.oracle);
        let profile = self.profile.clone();

        tokio::spawn(async move {
            let text = calibration::style_sample(oracle.as_ref(), &profile).await;
            let _ = reply.send(text);
        });
    }

    fn spawn_idle_keywords(&self) {
        let oracle = Arc::clone(&self.oracle);
        let text = self.document.clone();
        let min_chars = self.config.resolver.min_keyword_chars;
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let keywords = resolver::extract_keywords(oracle.as_ref(), &text, min_chars).await;
            let _ = tx.send(TaskOutcome::IdleKeywords { keywords }).await;
        });
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the session actor until `Shutdown` or until every command sender is
/// dropped.
///
/// Listens on the command channel, the task-outcome channel and the
/// quiet-period timer using `tokio::select!`, and pushes notifications
/// through `events_tx`.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<Command>,
    mut task_rx: mpsc::Receiver<TaskOutcome>,
    events_tx: mpsc::Sender<AssistantEvent>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Assistant session started ({} library entries)", state.bibliography.len());

    loop {
        let deadline = state.quiet_deadline;

        tokio::select! {
            // --- Commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Shutdown) => {
                        info!("Shutdown command received");
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &events_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Oracle task outcomes (state always holds a sender, so never None) ---
            Some(outcome) = task_rx.recv() => {
                handle_outcome(&mut state, outcome, &events_tx).await;
            }

            // --- Quiet period elapsed ---
            _ = wait_until(deadline) => {
                state.quiet_deadline = None;
                debug!("Quiet period elapsed, extracting keywords from document");
                state.spawn_idle_keywords();
            }
        }
    }

    info!("Assistant session exiting");
    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn handle_command(
    state: &mut AppState,
    cmd: Command,
    events_tx: &mpsc::Sender<AssistantEvent>,
) {
    match cmd {
        Command::ResolveCitations { excerpt, reply } => {
            state.spawn_resolution(excerpt, reply);
        }
        Command::Calibrate { sample, reply } => {
            state.spawn_calibration(sample, reply);
        }
        Command::GenerateSample { reply } => {
            state.spawn_sample(reply);
        }
        Command::SaveProfile { profile, reply } => {
            state.replace_profile(profile.clone());
            info!("Style profile saved");
            let _ = events_tx.send(AssistantEvent::ProfileReplaced(profile)).await;
            let _ = reply.send(());
        }
        Command::EditProfile { reply } => {
            let _ = reply.send(state.edit_profile());
        }
        Command::ApplyPreset { preset, reply } => {
            let _ = reply.send(state.apply_preset(preset));
        }
        Command::DiscardDraft => {
            state.discard_draft();
        }
        Command::DocumentEdited { text } => {
            state.document_edited(text);
        }
        Command::AddUpload {
            file_name,
            body,
            reply,
        } => {
            let snippet = state.add_upload(&file_name, &body);
            let _ = events_tx
                .send(AssistantEvent::BibliographyGrew {
                    added: 1,
                    total: state.bibliography.len(),
                })
                .await;
            let _ = reply.send(snippet);
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        Command::Shutdown => {
            // Handled in the main loop
        }
    }
}

async fn handle_outcome(
    state: &mut AppState,
    outcome: TaskOutcome,
    events_tx: &mpsc::Sender<AssistantEvent>,
) {
    match outcome {
        TaskOutcome::Resolved { resolution, reply } => {
            let added = state.merge_citations(&resolution);
            if added > 0 {
                let _ = events_tx
                    .send(AssistantEvent::BibliographyGrew {
                        added,
                        total: state.bibliography.len(),
                    })
                    .await;
            }
            let _ = reply.send(resolution.citations);
        }
        TaskOutcome::Calibrated { profile, reply } => {
            state.replace_profile(profile.clone());
            let _ = events_tx
                .send(AssistantEvent::ProfileReplaced(profile.clone()))
                .await;
            let _ = reply.send(Ok(profile));
        }
        TaskOutcome::IdleKeywords { keywords } => {
            let suggestions = state.local_suggestions(&keywords);
            debug!(
                "Idle keywords {:?} matched {} library entries",
                keywords,
                suggestions.len()
            );
            let _ = events_tx.send(AssistantEvent::Suggestions(suggestions)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use quill_core::profile::{Percent, RawStyleProfile};
    use quill_llm::{OracleCall, StubOracle};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use crate::calibration::CalibrationError;

    const EXCERPT: &str = "Quantum entanglement links particles across any distance.";

    struct Harness {
        cmd_tx: mpsc::Sender<Command>,
        events: mpsc::Receiver<AssistantEvent>,
        stub: Arc<StubOracle>,
        join: JoinHandle<anyhow::Result<()>>,
    }

    fn start(stub: StubOracle, bibliography: Bibliography) -> Harness {
        let stub = Arc::new(stub);
        let oracle: Arc<dyn Oracle> = stub.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (task_tx, task_rx) = mpsc::channel(16);
        let (events_tx, events) = mpsc::channel(64);

        let state = AppState::new(Config::default(), oracle, bibliography, task_tx);
        let join = tokio::spawn(run(cmd_rx, task_rx, events_tx, state));

        Harness {
            cmd_tx,
            events,
            stub,
            join,
        }
    }

    fn snippet(id: &str, content: &str, tags: &[&str]) -> ResearchSnippet {
        ResearchSnippet {
            id: id.into(),
            source: format!("Source {id}"),
            year: 2015,
            author: "Author".into(),
            content: content.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    impl Harness {
        async fn snapshot(&self) -> Snapshot {
            let (reply, rx) = oneshot::channel();
            self.cmd_tx.send(Command::Snapshot { reply }).await.unwrap();
            rx.await.unwrap()
        }

        /// Send an edit and wait until the actor has applied it.
        async fn edit(&self, text: &str) {
            self.cmd_tx
                .send(Command::DocumentEdited { text: text.into() })
                .await
                .unwrap();
            self.snapshot().await;
        }

        async fn resolve(&self, excerpt: &str) -> Vec<ResearchSnippet> {
            let (reply, rx) = oneshot::channel();
            self.cmd_tx
                .send(Command::ResolveCitations {
                    excerpt: excerpt.into(),
                    reply,
                })
                .await
                .unwrap();
            rx.await.unwrap()
        }

        async fn calibrate(&self, sample: &str) -> Result<StyleProfile, CalibrationError> {
            let (reply, rx) = oneshot::channel();
            self.cmd_tx
                .send(Command::Calibrate {
                    sample: sample.into(),
                    reply,
                })
                .await
                .unwrap();
            rx.await.unwrap()
        }
    }

    // -- lifecycle --

    #[tokio::test]
    async fn event_loop_handles_shutdown_command() {
        let h = start(StubOracle::new(), Bibliography::new());
        h.cmd_tx.send(Command::Shutdown).await.unwrap();
        let result = h.join.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn event_loop_exits_when_commands_close() {
        let h = start(StubOracle::new(), Bibliography::new());
        drop(h.cmd_tx);
        assert!(h.join.await.unwrap().is_ok());
    }

    // -- citation resolution --

    #[tokio::test]
    async fn resolution_merges_generated_entries() {
        let mut h = start(
            StubOracle::new().with_keywords(&["quantum"]),
            {
                let mut bib = Bibliography::new();
                bib.merge([snippet("q", "no match", &["quantum"])]);
                bib
            },
        );

        let citations = h.resolve(EXCERPT).await;
        assert_eq!(citations.len(), 3);
        assert_eq!(citations[0].id, "q");

        assert_eq!(
            h.events.recv().await,
            Some(AssistantEvent::BibliographyGrew { added: 2, total: 3 })
        );

        let snap = h.snapshot().await;
        assert_eq!(snap.bibliography.len(), 3);
        for c in &citations {
            assert!(snap.bibliography.contains_id(&c.id));
        }
    }

    #[tokio::test]
    async fn full_local_resolution_does_not_grow_library() {
        let bib = {
            let mut bib = Bibliography::new();
            bib.merge([
                snippet("1", "quantum", &[]),
                snippet("2", "quantum", &[]),
                snippet("3", "quantum", &[]),
            ]);
            bib
        };
        let h = start(StubOracle::new().with_keywords(&["quantum"]), bib);

        let citations = h.resolve(EXCERPT).await;
        assert_eq!(citations.len(), 3);
        assert!(h.stub.citation_requests().is_empty());
        assert_eq!(h.snapshot().await.bibliography.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_resolution_is_applied_to_current_state() {
        let h = start(
            StubOracle::new()
                .with_keywords(&["quantum"])
                .with_latency(Duration::from_secs(5)),
            Bibliography::new(),
        );

        let (reply, pending) = oneshot::channel();
        h.cmd_tx
            .send(Command::ResolveCitations {
                excerpt: EXCERPT.into(),
                reply,
            })
            .await
            .unwrap();

        // Mutations keep flowing while the oracle is busy.
        let (up_reply, up_rx) = oneshot::channel();
        h.cmd_tx
            .send(Command::AddUpload {
                file_name: "notes.md".into(),
                body: "Quantum notes".into(),
                reply: up_reply,
            })
            .await
            .unwrap();
        let uploaded = up_rx.await.unwrap();
        assert_eq!(h.snapshot().await.bibliography.len(), 1);

        let citations = pending.await.unwrap();
        assert_eq!(citations.len(), 3);

        let snap = h.snapshot().await;
        assert_eq!(snap.bibliography.len(), 4);
        assert!(snap.bibliography.contains_id(&uploaded.id));
    }

    // -- calibration --

    #[tokio::test]
    async fn short_calibration_sample_is_rejected_without_oracle() {
        let h = start(StubOracle::new(), Bibliography::new());
        let err = h.calibrate("0123456789").await.unwrap_err();
        assert!(matches!(err, CalibrationError::SampleTooShort { actual: 10, .. }));
        assert!(h.stub.calls().is_empty());
        assert_eq!(h.snapshot().await.profile, StyleProfile::default());
    }

    #[tokio::test]
    async fn rejected_calibration_leaves_state_untouched() {
        let mut h = start(StubOracle::new(), Bibliography::new());

        let (reply, rx) = oneshot::channel();
        h.cmd_tx.send(Command::EditProfile { reply }).await.unwrap();
        let draft = rx.await.unwrap();

        assert!(h.calibrate(&"s".repeat(49)).await.is_err());

        let snap = h.snapshot().await;
        assert_eq!(snap.profile, StyleProfile::default());
        assert_eq!(snap.draft, Some(draft));
        assert!(h.events.try_recv().is_err(), "no profile event expected");
        assert!(h.stub.calls().is_empty());
    }

    #[tokio::test]
    async fn calibration_replaces_profile() {
        let mut h = start(
            StubOracle::new().with_style(RawStyleProfile {
                tone: Some("Lyrical".into()),
                formality: Some(Percent::new(35)),
                ..RawStyleProfile::default()
            }),
            Bibliography::new(),
        );

        let profile = h.calibrate(&"s".repeat(60)).await.unwrap();
        assert_eq!(profile.tone, "Lyrical");
        assert_eq!(h.stub.analysis_calls(), 1);
        assert_eq!(
            h.events.recv().await,
            Some(AssistantEvent::ProfileReplaced(profile.clone()))
        );
        assert_eq!(h.snapshot().await.profile, profile);
    }

    #[tokio::test]
    async fn failed_calibration_installs_error_profile() {
        let h = start(StubOracle::new().failing_style(), Bibliography::new());
        let profile = h.calibrate(&"s".repeat(60)).await.unwrap();
        assert!(profile.is_error_sentinel());
        assert!(h.snapshot().await.profile.is_error_sentinel());
    }

    // -- profile editing --

    #[tokio::test]
    async fn preset_touches_draft_until_saved() {
        let h = start(StubOracle::new(), Bibliography::new());

        let (reply, rx) = oneshot::channel();
        h.cmd_tx
            .send(Command::ApplyPreset {
                preset: Preset::Scientific,
                reply,
            })
            .await
            .unwrap();
        let draft = rx.await.unwrap();
        assert_eq!(draft.tone, "Objective");

        let snap = h.snapshot().await;
        assert_eq!(snap.profile, StyleProfile::default());
        assert_eq!(snap.draft.as_ref(), Some(&draft));

        let (reply, rx) = oneshot::channel();
        h.cmd_tx
            .send(Command::SaveProfile {
                profile: draft.clone(),
                reply,
            })
            .await
            .unwrap();
        rx.await.unwrap();

        let snap = h.snapshot().await;
        assert_eq!(snap.profile, draft);
        assert!(snap.draft.is_none());
    }

    #[tokio::test]
    async fn presets_stack_on_the_same_draft_and_can_be_discarded() {
        let h = start(StubOracle::new(), Bibliography::new());

        for preset in [Preset::Conversational, Preset::Journalistic] {
            let (reply, rx) = oneshot::channel();
            h.cmd_tx
                .send(Command::ApplyPreset { preset, reply })
                .await
                .unwrap();
            rx.await.unwrap();
        }
        let draft = h.snapshot().await.draft.expect("draft exists");
        // Journalistic does not mention voice, so Conversational's survives.
        assert_eq!(draft.voice, "Warm and informal");
        assert_eq!(draft.tone, "Direct");

        h.cmd_tx.send(Command::DiscardDraft).await.unwrap();
        assert!(h.snapshot().await.draft.is_none());
    }

    #[tokio::test]
    async fn sample_uses_saved_profile() {
        let h = start(StubOracle::new().with_sample("Sample."), Bibliography::new());

        let (reply, rx) = oneshot::channel();
        h.cmd_tx.send(Command::GenerateSample { reply }).await.unwrap();
        assert_eq!(rx.await.unwrap(), "Sample.");
        assert_eq!(
            h.stub.calls(),
            vec![OracleCall::GenerateSample(StyleProfile::default())]
        );
    }

    // -- quiet period --

    #[tokio::test(start_paused = true)]
    async fn quiet_period_fires_once_after_last_edit() {
        let mut h = start(
            StubOracle::new().with_keywords(&["quantum"]),
            Bibliography::seeded(),
        );

        h.edit("Quantum computers rely on qubits.").await;
        assert!(timeout(Duration::from_secs(20), h.events.recv()).await.is_err());

        // A second edit restarts the 30 second window.
        h.edit("Quantum computers rely on entangled qubits.").await;
        assert!(timeout(Duration::from_secs(25), h.events.recv()).await.is_err());

        let event = timeout(Duration::from_secs(10), h.events.recv())
            .await
            .expect("quiet period should elapse")
            .expect("event channel open");
        match event {
            AssistantEvent::Suggestions(found) => {
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].id, "seed-2");
            }
            other => panic!("expected suggestions, got {other:?}"),
        }

        assert_eq!(
            h.stub.calls(),
            vec![OracleCall::ExtractKeywords(
                "Quantum computers rely on entangled qubits.".to_string()
            )]
        );

        // Nothing further without new edits.
        assert!(timeout(Duration::from_secs(120), h.events.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_with_short_document_suggests_nothing() {
        let mut h = start(StubOracle::new(), Bibliography::seeded());
        h.edit("Hi").await;

        let event = timeout(Duration::from_secs(31), h.events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, AssistantEvent::Suggestions(Vec::new()));
        assert_eq!(h.stub.keyword_calls(), 0);
    }

    // -- uploads --

    #[tokio::test]
    async fn upload_is_truncated_and_matchable() {
        let mut h = start(StubOracle::new(), Bibliography::new());

        let body = format!("Photosynthesis {}", "x".repeat(5000));
        let (reply, rx) = oneshot::channel();
        h.cmd_tx
            .send(Command::AddUpload {
                file_name: "bio.pdf".into(),
                body,
                reply,
            })
            .await
            .unwrap();
        let uploaded = rx.await.unwrap();

        assert_eq!(uploaded.content.chars().count(), 1000 + 3);
        assert_eq!(
            h.events.recv().await,
            Some(AssistantEvent::BibliographyGrew { added: 1, total: 1 })
        );

        let snap = h.snapshot().await;
        let hits = snap
            .bibliography
            .match_keywords(&["photosynthesis".to_string(), "pdf".to_string()]);
        assert_eq!(hits.len(), 1);
    }
}
