//! Image upload and removal session
//!
//! [`RemovalSession`] holds at most one selection/result cycle and exposes the
//! transitions a UI needs, independent of any UI framework:
//!
//! ```text
//! Idle --select_file--> Ready --submit--> AwaitingResponse --on_success--> ReadyWithResult
//!                         ^                      |
//!                         +------on_failure------+
//! any state --select_file--> Ready (result discarded)
//! ```
//!
//! Submitting is refused while a request is outstanding, which serializes
//! requests without a queue. Status changes are published on a `watch`
//! channel and user-facing notifications on an event channel, so adapters
//! decide how to present them.

use crate::client::RemovalService;
use crate::config::RemovalConfig;
use crate::error::{BgRemovalError, Result, REMOVAL_FAILED_MESSAGE};
use crate::picker::{PickedFile, SelectedImage};
use crate::renderer::{ResultImage, ResultRenderer};
use crate::resources::{LocalRef, ResourceStore};
use instant::Instant;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Observable state of the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No file selected
    Idle,
    /// File selected, no result
    Ready,
    /// Request for the current file outstanding
    AwaitingResponse,
    /// File selected and its result available
    ReadyWithResult,
}

impl SessionState {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            SessionState::Idle => "No file selected",
            SessionState::Ready => "Ready to remove background",
            SessionState::AwaitingResponse => "Waiting for the removal service",
            SessionState::ReadyWithResult => "Result available",
        }
    }
}

/// Whether a request is outstanding; drives the submit control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    AwaitingResponse,
}

/// Notifications for the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    FileSelected {
        file_name: String,
        mime: String,
        preview: LocalRef,
    },
    SubmitStarted {
        file_name: String,
    },
    ResultReady {
        file_name: String,
        result: LocalRef,
        download_file_name: String,
    },
    /// Emitted once per failed request; `message` is safe to show to users
    RemovalFailed {
        message: String,
    },
}

/// Receiving end of a session's event channel
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// How a submitted request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// Result rendered under this reference
    Succeeded(LocalRef),
    /// Failure reported on the event channel
    Failed,
    /// The selection changed while waiting; the response was discarded
    Stale,
}

/// Proof of an outstanding request, consumed when the request completes
#[derive(Debug)]
#[must_use = "complete the ticket with on_success or on_failure"]
pub struct RemovalTicket {
    id: u64,
    generation: u64,
}

#[derive(Debug)]
struct InFlight {
    ticket_id: u64,
    generation: u64,
    started: Instant,
}

/// Single-request upload session
#[derive(Debug)]
pub struct RemovalSession {
    renderer: ResultRenderer,
    resources: ResourceStore,
    selected: Option<SelectedImage>,
    result: Option<ResultImage>,
    /// Bumped on every selection
    generation: u64,
    next_ticket: u64,
    in_flight: Option<InFlight>,
    status_tx: watch::Sender<SessionStatus>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl RemovalSession {
    /// Create an idle session and the receiver for its events
    #[must_use]
    pub fn new(config: &RemovalConfig) -> (Self, SessionEvents) {
        Self::with_renderer(ResultRenderer::new(config.download_file_name.clone()))
    }

    #[must_use]
    pub fn with_renderer(renderer: ResultRenderer) -> (Self, SessionEvents) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(SessionStatus::Idle);

        let session = Self {
            renderer,
            resources: ResourceStore::new(),
            selected: None,
            result: None,
            generation: 0,
            next_ticket: 0,
            in_flight: None,
            status_tx,
            events,
        };
        (session, receiver)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match (&self.selected, &self.result) {
            (None, _) => SessionState::Idle,
            (Some(_), _) if self.awaiting_current_selection() => SessionState::AwaitingResponse,
            (Some(_), Some(_)) => SessionState::ReadyWithResult,
            (Some(_), None) => SessionState::Ready,
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.in_flight.is_some() {
            SessionStatus::AwaitingResponse
        } else {
            SessionStatus::Idle
        }
    }

    /// Watch status changes, e.g. to toggle a submit button
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// A file is selected and no request is outstanding
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.selected.is_some() && self.in_flight.is_none()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&ResultImage> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn preview_ref(&self) -> Option<&LocalRef> {
        self.selected.as_ref().map(SelectedImage::preview)
    }

    #[must_use]
    pub fn result_ref(&self) -> Option<&LocalRef> {
        self.result.as_ref().map(ResultImage::local_ref)
    }

    /// Registry for resolving preview and result references
    #[must_use]
    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    /// Replace the selection, dropping the previous preview and any result
    pub fn select_file(&mut self, picked: PickedFile) -> &SelectedImage {
        if let Some(previous) = self.selected.take() {
            self.resources.revoke(previous.preview());
        }
        self.clear_result();
        self.generation += 1;

        if self.in_flight.is_some() {
            debug!("Selection changed while a request is outstanding; its response will be discarded");
        }

        let preview = self.resources.create_ref(picked.blob());
        let image = SelectedImage::new(picked, preview);

        info!(
            file_name = %image.file_name(),
            mime = %image.mime(),
            bytes = image.blob().len(),
            "File selected"
        );
        self.emit(SessionEvent::FileSelected {
            file_name: image.file_name().to_string(),
            mime: image.mime().to_string(),
            preview: image.preview().clone(),
        });

        self.selected.insert(image)
    }

    /// Start a request for the current selection
    ///
    /// Returns the ticket that completes the request and the image to send.
    ///
    /// # Errors
    /// - No file is selected
    /// - A request is already outstanding
    pub fn submit(&mut self) -> Result<(RemovalTicket, SelectedImage)> {
        if self.in_flight.is_some() {
            return Err(BgRemovalError::invalid_state(
                "a removal request is already outstanding",
            ));
        }
        let image = self
            .selected
            .clone()
            .ok_or_else(|| BgRemovalError::invalid_state("no file selected"))?;

        self.clear_result();
        self.next_ticket += 1;
        let ticket = RemovalTicket {
            id: self.next_ticket,
            generation: self.generation,
        };
        self.in_flight = Some(InFlight {
            ticket_id: ticket.id,
            generation: ticket.generation,
            started: Instant::now(),
        });
        self.publish_status();

        info!(file_name = %image.file_name(), "Removal request submitted");
        self.emit(SessionEvent::SubmitStarted {
            file_name: image.file_name().to_string(),
        });

        Ok((ticket, image))
    }

    /// Complete a request with the bytes returned by the service
    pub fn on_success(&mut self, ticket: RemovalTicket, bytes: Vec<u8>) -> RemovalOutcome {
        let Some(in_flight) = self.finish(&ticket) else {
            return RemovalOutcome::Stale;
        };
        if ticket.generation != self.generation {
            debug!("Discarding result for a superseded selection");
            return RemovalOutcome::Stale;
        }
        let Some(source) = self.selected.as_ref() else {
            return RemovalOutcome::Stale;
        };

        let file_name = source.file_name().to_string();
        let elapsed_ms = in_flight.started.elapsed().as_millis() as u64;
        let result = self
            .renderer
            .render(bytes, &file_name, elapsed_ms, &mut self.resources);
        let local_ref = result.local_ref().clone();

        info!(
            file_name = %file_name,
            result_bytes = result.bytes().len(),
            elapsed_ms,
            "Background removed"
        );
        self.emit(SessionEvent::ResultReady {
            file_name,
            result: local_ref.clone(),
            download_file_name: result.download_file_name().to_string(),
        });
        self.result = Some(result);

        RemovalOutcome::Succeeded(local_ref)
    }

    /// Complete a request that failed. The error is logged, not returned.
    pub fn on_failure(&mut self, ticket: RemovalTicket, error: BgRemovalError) -> RemovalOutcome {
        let Some(in_flight) = self.finish(&ticket) else {
            return RemovalOutcome::Stale;
        };
        if ticket.generation != self.generation {
            debug!(error = %error, "Discarding failure for a superseded selection");
            return RemovalOutcome::Stale;
        }

        error!(
            error = %error,
            elapsed_ms = in_flight.started.elapsed().as_millis() as u64,
            "Error removing background"
        );
        self.emit(SessionEvent::RemovalFailed {
            message: REMOVAL_FAILED_MESSAGE.to_string(),
        });

        RemovalOutcome::Failed
    }

    /// Submit the current selection to `service` and apply the outcome
    ///
    /// The status returns to idle on every exit path, including when the
    /// returned future is dropped before completion.
    ///
    /// # Errors
    /// Only when submitting is not allowed; removal failures are reported as
    /// [`RemovalOutcome::Failed`] plus a [`SessionEvent::RemovalFailed`].
    pub async fn remove_background<S>(&mut self, service: &S) -> Result<RemovalOutcome>
    where
        S: RemovalService + ?Sized,
    {
        let (ticket, image) = self.submit()?;
        let guard = InFlightGuard {
            session: self,
            ticket: Some(ticket),
        };
        let response = service.remove_background(&image).await;
        Ok(guard.complete(response))
    }

    /// Write the current result into `dir`
    ///
    /// # Errors
    /// - No result is available
    /// - The file cannot be written
    pub fn download_result<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        self.result
            .as_ref()
            .ok_or_else(|| BgRemovalError::invalid_state("no result to download"))?
            .download_to(dir)
    }

    fn awaiting_current_selection(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| f.generation == self.generation)
    }

    fn clear_result(&mut self) {
        if let Some(result) = self.result.take() {
            self.resources.revoke(result.local_ref());
            debug!("Previous result cleared");
        }
    }

    /// Release the outstanding request if `ticket` belongs to it
    fn finish(&mut self, ticket: &RemovalTicket) -> Option<InFlight> {
        match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket_id == ticket.id => {
                self.publish_status();
                Some(in_flight)
            },
            other => {
                self.in_flight = other;
                warn!(ticket = ticket.id, "Ignoring completion for an unknown request");
                None
            },
        }
    }

    fn abandon(&mut self, ticket: RemovalTicket) {
        if self.finish(&ticket).is_some() {
            warn!("Removal request dropped before completion");
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session event dropped: no listener");
        }
    }
}

/// Releases the outstanding request if the driving future is dropped
struct InFlightGuard<'a> {
    session: &'a mut RemovalSession,
    ticket: Option<RemovalTicket>,
}

impl InFlightGuard<'_> {
    fn complete(mut self, response: Result<Vec<u8>>) -> RemovalOutcome {
        let Some(ticket) = self.ticket.take() else {
            return RemovalOutcome::Stale;
        };
        match response {
            Ok(bytes) => self.session.on_success(ticket, bytes),
            Err(error) => self.session.on_failure(ticket, error),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.session.abandon(ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::FilePicker;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn picked(name: &str) -> PickedFile {
        FilePicker::pick_bytes(name, PNG_MAGIC.to_vec()).unwrap()
    }

    fn session() -> (RemovalSession, SessionEvents) {
        RemovalSession::new(&RemovalConfig::default())
    }

    fn drain(events: &mut SessionEvents) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_new_session_is_idle() {
        let (session, _events) = session();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(!session.can_submit());
        assert!(session.preview_ref().is_none());
        assert!(session.result_ref().is_none());
    }

    #[test]
    fn test_submit_without_file_is_refused() {
        let (mut session, _events) = session();
        let err = session.submit().unwrap_err();
        assert!(matches!(err, BgRemovalError::InvalidState(_)));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_full_cycle() {
        let (mut session, mut events) = session();

        session.select_file(picked("cat.png"));
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.can_submit());

        let (ticket, image) = session.submit().unwrap();
        assert_eq!(image.file_name(), "cat.png");
        assert_eq!(session.state(), SessionState::AwaitingResponse);
        assert_eq!(session.status(), SessionStatus::AwaitingResponse);
        assert!(!session.can_submit());

        let outcome = session.on_success(ticket, vec![1, 2, 3]);
        let RemovalOutcome::Succeeded(result_ref) = outcome.clone() else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(session.state(), SessionState::ReadyWithResult);
        assert_eq!(session.result_ref(), Some(&result_ref));
        assert!(session.can_submit());

        let events = drain(&mut events);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SessionEvent::FileSelected { .. }));
        assert!(matches!(events[1], SessionEvent::SubmitStarted { .. }));
        assert!(matches!(events[2], SessionEvent::ResultReady { .. }));
    }

    #[test]
    fn test_second_submit_while_awaiting_is_refused() {
        let (mut session, _events) = session();
        session.select_file(picked("cat.png"));
        let (ticket, _) = session.submit().unwrap();

        assert!(matches!(session.submit(), Err(BgRemovalError::InvalidState(_))));

        session.on_failure(ticket, BgRemovalError::removal_failed("boom"));
        assert!(session.can_submit());
    }

    #[test]
    fn test_failure_returns_to_ready() {
        let (mut session, mut events) = session();
        session.select_file(picked("dog.png"));
        drain(&mut events);

        let (ticket, _) = session.submit().unwrap();
        let outcome = session.on_failure(ticket, BgRemovalError::removal_failed("403"));

        assert_eq!(outcome, RemovalOutcome::Failed);
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.result_ref().is_none());
        let failures: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::RemovalFailed { .. }))
            .collect();
        assert_eq!(
            failures,
            vec![SessionEvent::RemovalFailed {
                message: REMOVAL_FAILED_MESSAGE.to_string()
            }]
        );
    }

    #[test]
    fn test_resubmit_clears_previous_result() {
        let (mut session, _events) = session();
        session.select_file(picked("cat.png"));
        let (ticket, _) = session.submit().unwrap();
        session.on_success(ticket, vec![1]);
        assert!(session.result_ref().is_some());

        let (ticket, _) = session.submit().unwrap();
        assert!(session.result_ref().is_none());
        session.on_failure(ticket, BgRemovalError::removal_failed("500"));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_selection_while_awaiting_discards_response() {
        let (mut session, _events) = session();
        session.select_file(picked("a.png"));
        let (ticket, _) = session.submit().unwrap();

        session.select_file(picked("b.png"));
        // New selection is ready, but the old request still blocks submission
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.status(), SessionStatus::AwaitingResponse);
        assert!(!session.can_submit());

        let outcome = session.on_success(ticket, vec![1, 2]);
        assert_eq!(outcome, RemovalOutcome::Stale);
        assert!(session.result_ref().is_none());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.can_submit());
    }

    #[test]
    fn test_foreign_ticket_is_ignored() {
        let (mut session, _events) = session();
        session.select_file(picked("a.png"));
        let (ticket, _) = session.submit().unwrap();

        let forged = RemovalTicket {
            id: ticket.id + 100,
            generation: ticket.generation,
        };
        assert_eq!(session.on_success(forged, vec![1]), RemovalOutcome::Stale);
        assert_eq!(session.status(), SessionStatus::AwaitingResponse);

        assert!(matches!(
            session.on_success(ticket, vec![1]),
            RemovalOutcome::Succeeded(_)
        ));
    }

    #[test]
    fn test_superseded_refs_are_revoked() {
        let (mut session, _events) = session();
        for name in ["a.png", "b.png", "c.png"] {
            session.select_file(picked(name));
            let (ticket, _) = session.submit().unwrap();
            session.on_success(ticket, vec![0; 4]);
            // One preview and one result at most
            assert_eq!(session.resources().len(), 2);
        }

        let old_preview = session.preview_ref().cloned().unwrap();
        session.select_file(picked("d.png"));
        assert!(session.resources().resolve(&old_preview).is_none());
        assert_eq!(session.resources().len(), 1);
    }

    #[test]
    fn test_status_receiver_tracks_requests() {
        let (mut session, _events) = session();
        let status = session.status_receiver();
        session.select_file(picked("a.png"));

        let (ticket, _) = session.submit().unwrap();
        assert_eq!(*status.borrow(), SessionStatus::AwaitingResponse);
        session.on_success(ticket, vec![1]);
        assert_eq!(*status.borrow(), SessionStatus::Idle);
    }

    #[test]
    fn test_events_without_listener_do_not_fail() {
        let (mut session, events) = session();
        drop(events);
        session.select_file(picked("a.png"));
        let (ticket, _) = session.submit().unwrap();
        assert!(matches!(
            session.on_success(ticket, vec![1]),
            RemovalOutcome::Succeeded(_)
        ));
    }

    #[test]
    fn test_download_without_result() {
        let (session, _events) = session();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            session.download_result(dir.path()),
            Err(BgRemovalError::InvalidState(_))
        ));
    }
}
