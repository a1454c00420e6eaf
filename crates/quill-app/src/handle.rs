// Cloneable front door to the session actor.

use std::sync::Arc;

use quill_core::{Bibliography, Preset, ResearchSnippet, StyleProfile};
use quill_llm::Oracle;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::error;

use crate::app::{self, AppState};
use crate::calibration::CalibrationError;
use crate::config::Config;
use crate::protocol::{AssistantEvent, Command, Snapshot};

const COMMAND_BUFFER: usize = 64;
const TASK_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("assistant session has shut down")]
    Closed,
}

/// Sends commands to a running session and awaits the replies.
#[derive(Clone)]
pub struct AssistantHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl AssistantHandle {
    /// Start a session actor on the current runtime.
    ///
    /// Returns the handle, the event stream and the actor's join handle.
    /// The actor awaits room on the bounded event channel, so the receiver
    /// must be drained or dropped; holding it unread stalls every command
    /// once the buffer fills.
    pub fn spawn(
        config: Config,
        oracle: Arc<dyn Oracle>,
        bibliography: Bibliography,
    ) -> (Self, mpsc::Receiver<AssistantEvent>, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (task_tx, task_rx) = mpsc::channel(TASK_BUFFER);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        let state = AppState::new(config, oracle, bibliography, task_tx);
        let join = tokio::spawn(async move {
            if let Err(e) = app::run(cmd_rx, task_rx, events_tx, state).await {
                error!("Assistant session error: {}", e);
            }
        });

        (AssistantHandle { cmd_tx }, events_rx, join)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    async fn send(&self, cmd: Command) -> Result<(), SessionError> {
        self.cmd_tx.send(cmd).await.map_err(|_| SessionError::Closed)
    }

    /// Up to three supporting citations, local entries first.
    pub async fn resolve_citations(
        &self,
        excerpt: impl Into<String>,
    ) -> Result<Vec<ResearchSnippet>, SessionError> {
        let excerpt = excerpt.into();
        self.request(|reply| Command::ResolveCitations { excerpt, reply })
            .await
    }

    /// Analyze `sample` and make the result the current profile.
    pub async fn calibrate(
        &self,
        sample: impl Into<String>,
    ) -> Result<StyleProfile, CalibrationError> {
        let sample = sample.into();
        self.request(|reply| Command::Calibrate { sample, reply })
            .await?
    }

    pub async fn generate_sample(&self) -> Result<String, SessionError> {
        self.request(|reply| Command::GenerateSample { reply }).await
    }

    pub async fn save_profile(&self, profile: StyleProfile) -> Result<(), SessionError> {
        self.request(|reply| Command::SaveProfile { profile, reply })
            .await
    }

    pub async fn edit_profile(&self) -> Result<StyleProfile, SessionError> {
        self.request(|reply| Command::EditProfile { reply }).await
    }

    pub async fn apply_preset(&self, preset: Preset) -> Result<StyleProfile, SessionError> {
        self.request(|reply| Command::ApplyPreset { preset, reply })
            .await
    }

    pub async fn discard_draft(&self) -> Result<(), SessionError> {
        self.send(Command::DiscardDraft).await
    }

    pub async fn document_edited(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Command::DocumentEdited { text: text.into() }).await
    }

    pub async fn add_upload(
        &self,
        file_name: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<ResearchSnippet, SessionError> {
        let (file_name, body) = (file_name.into(), body.into());
        self.request(|reply| Command::AddUpload {
            file_name,
            body,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown).await
    }
}
