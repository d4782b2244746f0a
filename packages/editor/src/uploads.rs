//! # Uploads
//!
//! Runs attachment uploads on tokio tasks and feeds their outcomes back to
//! the editor.
//!
//! ## Design
//!
//! The editor is single threaded and tasks never touch it. Each task owns
//! a [`CancellationToken`] and reports [`UploadEvent`]s over an mpsc
//! channel; the host applies them on the editor's thread through
//! [`UploadManager::apply`], [`UploadManager::drain`] or
//! [`UploadManager::run_until_idle`].
//!
//! Every upload ends with exactly one outcome. Once an id has completed,
//! failed or been cancelled, later events for it are dropped, so a late
//! progress report can never resurrect a finished placeholder. An outcome
//! that arrives while its placeholder is undone is kept by the editor and
//! applied when the placeholder comes back.

use crate::engine::{AttachmentFile, AttachmentResult, Editor};
use crate::errors::UploadError;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Boxed `Send` future returned by upload adapters
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// The host's upload implementation
pub trait UploadAdapter: Send + Sync + 'static {
    fn upload(
        &self,
        file: AttachmentFile,
        progress: ProgressSender,
    ) -> BoxFuture<Result<AttachmentResult, UploadError>>;
}

/// What happened to an upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress { id: String, percent: u8 },
    Completed { id: String, result: AttachmentResult },
    Failed { id: String, error: UploadError },
    Cancelled { id: String },
}

impl UploadEvent {
    pub fn id(&self) -> &str {
        match self {
            UploadEvent::Progress { id, .. }
            | UploadEvent::Completed { id, .. }
            | UploadEvent::Failed { id, .. }
            | UploadEvent::Cancelled { id } => id,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, UploadEvent::Progress { .. })
    }
}

/// Handed to an adapter to report progress for one upload
#[derive(Debug, Clone)]
pub struct ProgressSender {
    id: String,
    tx: mpsc::UnboundedSender<UploadEvent>,
}

impl ProgressSender {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Report progress in percent (clamped to 100)
    pub fn report(&self, percent: u8) {
        let event = UploadEvent::Progress {
            id: self.id.clone(),
            percent: percent.min(100),
        };
        if self.tx.send(event).is_err() {
            debug!(id = %self.id, "upload manager gone, progress dropped");
        }
    }
}

/// Starts uploads and applies their events to an editor
pub struct UploadManager {
    adapter: Arc<dyn UploadAdapter>,
    tx: mpsc::UnboundedSender<UploadEvent>,
    rx: mpsc::UnboundedReceiver<UploadEvent>,
    /// Tokens of uploads still in flight
    tokens: HashMap<String, CancellationToken>,
    finished: HashSet<String>,
}

impl UploadManager {
    pub fn new(adapter: impl UploadAdapter) -> Self {
        Self::with_adapter(Arc::new(adapter))
    }

    pub fn with_adapter(adapter: Arc<dyn UploadAdapter>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            adapter,
            tx,
            rx,
            tokens: HashMap::new(),
            finished: HashSet::new(),
        }
    }

    /// Insert one placeholder per file, in order, and start uploading them.
    /// Must be called inside a tokio runtime. Returns the placeholder ids.
    pub fn start_batch(&mut self, editor: &mut Editor, files: Vec<AttachmentFile>) -> Vec<String> {
        let ids = editor.insert_attachment_placeholders(&files);
        if ids.len() < files.len() {
            warn!(
                requested = files.len(),
                inserted = ids.len(),
                "some placeholders could not be inserted"
            );
        }
        for (id, file) in ids.iter().zip(files) {
            self.spawn(id.clone(), file);
        }
        ids
    }

    fn spawn(&mut self, id: String, file: AttachmentFile) {
        let token = CancellationToken::new();
        self.tokens.insert(id.clone(), token.clone());

        let adapter = Arc::clone(&self.adapter);
        let tx = self.tx.clone();
        let progress = ProgressSender {
            id: id.clone(),
            tx: tx.clone(),
        };

        tokio::spawn(async move {
            let upload = adapter.upload(file, progress);
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => UploadEvent::Cancelled { id },
                outcome = upload => match outcome {
                    Ok(result) => UploadEvent::Completed { id, result },
                    Err(UploadError::Cancelled) => UploadEvent::Cancelled { id },
                    Err(error) => UploadEvent::Failed { id, error },
                },
            };
            if tx.send(event).is_err() {
                debug!("upload manager gone, outcome dropped");
            }
        });
    }

    /// Number of uploads without an outcome yet
    pub fn in_flight(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_finished(&self, id: &str) -> bool {
        self.finished.contains(id)
    }

    /// Stop an upload. Its placeholder is marked failed right away.
    pub fn cancel(&mut self, editor: &mut Editor, id: &str) -> bool {
        let Some(token) = self.tokens.remove(id) else {
            return false;
        };
        token.cancel();
        self.finished.insert(id.to_string());
        debug!(id, "upload cancelled");
        editor.fail_attachment(id);
        true
    }

    /// Apply one event. Returns whether the editor changed.
    pub fn apply(&mut self, editor: &mut Editor, event: UploadEvent) -> bool {
        if self.finished.contains(event.id()) {
            debug!(id = event.id(), "event for a finished upload dropped");
            return false;
        }
        if event.is_final() {
            self.tokens.remove(event.id());
            self.finished.insert(event.id().to_string());
        }

        match event {
            UploadEvent::Progress { id, percent } => editor.set_attachment_progress(&id, percent),
            UploadEvent::Completed { id, result } => editor.resolve_attachment(&id, &result),
            UploadEvent::Failed { id, error } => {
                warn!(%id, %error, "upload failed");
                editor.fail_attachment(&id)
            }
            UploadEvent::Cancelled { id } => editor.fail_attachment(&id),
        }
    }

    /// Apply every event already received. Returns how many were applied.
    pub fn drain(&mut self, editor: &mut Editor) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(editor, event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next event, `None` once nothing is in flight
    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        if self.tokens.is_empty() {
            return self.rx.try_recv().ok();
        }
        self.rx.recv().await
    }

    /// Apply events until every upload has an outcome
    pub async fn run_until_idle(&mut self, editor: &mut Editor) {
        while let Some(event) = self.next_event().await {
            self.apply(editor, event);
        }
    }
}

impl Drop for UploadManager {
    fn drop(&mut self) {
        for token in self.tokens.values() {
            token.cancel();
        }
    }
}

impl std::fmt::Debug for UploadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadManager")
            .field("in_flight", &self.tokens.len())
            .field("finished", &self.finished.len())
            .finish()
    }
}
