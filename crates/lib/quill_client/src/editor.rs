//! Editor session — owns the draft and reconciles AI results into it.
//!
//! A result is applied automatically only if the draft is exactly as it was
//! when the action was dispatched. If the user kept typing, the result is
//! held as a [`Suggestion`] until they apply or discard it.

use std::sync::Arc;

use quill_core::actions::ActionKind;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatcher::ActionDispatcher;
use crate::error::DispatchError;
use crate::notify::{Notification, Notifier};
use crate::stream::CompletionStream;

pub const CONFLICT_WARNING: &str =
    "Your draft changed while the AI was working. Review the suggestion before applying it.";

/// An AI result waiting for the user's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: ActionKind,
    pub text: String,
}

/// How a finished action was folded into the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The draft was replaced with the result.
    Applied,
    /// The draft had changed; the result is pending as a suggestion.
    Held,
}

/// A dispatched action whose stream has not been drained yet.
pub struct InFlight {
    pub kind: ActionKind,
    base_revision: u64,
    stream: CompletionStream,
}

impl InFlight {
    /// Drain the stream. The session stays editable meanwhile.
    pub async fn finish(self) -> Finished {
        Finished {
            kind: self.kind,
            base_revision: self.base_revision,
            result: self.stream.collect_text().await,
        }
    }
}

/// A drained action, ready for [`EditorSession::reconcile`].
pub struct Finished {
    kind: ActionKind,
    base_revision: u64,
    result: Result<String, DispatchError>,
}

pub struct EditorSession {
    draft: String,
    /// Bumped on every change to the draft.
    revision: u64,
    credits: i64,
    pending: Option<Suggestion>,
    dispatcher: ActionDispatcher,
    notifier: Arc<dyn Notifier>,
}

impl EditorSession {
    pub fn new(
        dispatcher: ActionDispatcher,
        notifier: Arc<dyn Notifier>,
        draft: impl Into<String>,
        credits: i64,
    ) -> Self {
        Self {
            draft: draft.into(),
            revision: 0,
            credits,
            pending: None,
            dispatcher,
            notifier,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn credits(&self) -> i64 {
        self.credits
    }

    pub fn pending_suggestion(&self) -> Option<&Suggestion> {
        self.pending.as_ref()
    }

    /// Replace the draft with the user's edit.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.draft {
            self.draft = text;
            self.revision += 1;
        }
    }

    /// Snapshot the draft and start `kind` over it.
    pub async fn dispatch(
        &mut self,
        kind: ActionKind,
        cancel: CancellationToken,
    ) -> Result<InFlight, DispatchError> {
        let base_revision = self.revision;
        match self
            .dispatcher
            .invoke(kind, &self.draft, &mut self.credits, cancel)
            .await
        {
            Ok(stream) => Ok(InFlight {
                kind,
                base_revision,
                stream,
            }),
            Err(DispatchError::Cancelled) => {
                debug!(%kind, "action cancelled before the server answered");
                Err(DispatchError::Cancelled)
            }
            Err(e) => {
                self.notifier.notify(Notification::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Fold a finished action into the draft.
    ///
    /// Notifies exactly once: success when applied, a warning when held, an
    /// error when the stream failed. Cancelled actions end silently.
    pub fn reconcile(&mut self, finished: Finished) -> Result<ReconcileOutcome, DispatchError> {
        let Finished {
            kind,
            base_revision,
            result,
        } = finished;

        let text = match result {
            Ok(text) => text,
            Err(DispatchError::Cancelled) => {
                debug!(%kind, "action cancelled");
                return Err(DispatchError::Cancelled);
            }
            Err(e) => {
                self.notifier.notify(Notification::error(e.to_string()));
                return Err(e);
            }
        };

        if base_revision == self.revision {
            self.replace_draft(text);
            self.notifier
                .notify(Notification::success(kind.success_message()));
            info!(%kind, "AI result applied");
            Ok(ReconcileOutcome::Applied)
        } else {
            self.pending = Some(Suggestion { kind, text });
            self.notifier.notify(Notification::warning(CONFLICT_WARNING));
            info!(%kind, "AI result held, draft changed meanwhile");
            Ok(ReconcileOutcome::Held)
        }
    }

    /// Dispatch, drain and reconcile in one go.
    pub async fn run(
        &mut self,
        kind: ActionKind,
        cancel: CancellationToken,
    ) -> Result<ReconcileOutcome, DispatchError> {
        let in_flight = self.dispatch(kind, cancel).await?;
        let finished = in_flight.finish().await;
        self.reconcile(finished)
    }

    /// Replace the draft with the pending suggestion, if any.
    pub fn apply_suggestion(&mut self) -> bool {
        let Some(Suggestion { kind, text }) = self.pending.take() else {
            return false;
        };
        self.replace_draft(text);
        self.notifier
            .notify(Notification::success(kind.success_message()));
        true
    }

    /// Drop the pending suggestion, keeping the user's draft.
    pub fn discard_suggestion(&mut self) -> bool {
        self.pending.take().is_some()
    }

    fn replace_draft(&mut self, text: String) {
        self.draft = text;
        self.revision += 1;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use quill_core::actions::ActionRequest;

    use super::*;
    use crate::backend::{CompletionBackend, CompletionReply};
    use crate::notify::{Level, RecordingNotifier};

    struct Scripted {
        chunks: Vec<&'static str>,
        fail_mid_stream: bool,
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        async fn complete(
            &self,
            _request: &ActionRequest,
            cancel: CancellationToken,
        ) -> Result<CompletionReply, DispatchError> {
            let mut items: Vec<Result<String, DispatchError>> =
                self.chunks.iter().map(|c| Ok(c.to_string())).collect();
            if self.fail_mid_stream {
                items.push(Err(DispatchError::Transport("connection reset".into())));
            }
            Ok(CompletionReply {
                remaining_actions: None,
                stream: CompletionStream::new(futures_util::stream::iter(items), cancel),
            })
        }
    }

    /// Never answers until the action is cancelled.
    struct Unanswered;

    #[async_trait]
    impl CompletionBackend for Unanswered {
        async fn complete(
            &self,
            _request: &ActionRequest,
            cancel: CancellationToken,
        ) -> Result<CompletionReply, DispatchError> {
            cancel.cancelled().await;
            Err(DispatchError::Cancelled)
        }
    }

    fn session(chunks: Vec<&'static str>, fail: bool) -> (EditorSession, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = ActionDispatcher::new(Arc::new(Scripted {
            chunks,
            fail_mid_stream: fail,
        }));
        let session = EditorSession::new(dispatcher, notifier.clone(), "My draft", 5);
        (session, notifier)
    }

    #[tokio::test]
    async fn unchanged_draft_is_replaced_and_notified_once() {
        let (mut s, notes) = session(vec!["Once", " upon", " a", " time"], false);

        let outcome = s.run(ActionKind::Generate, CancellationToken::new()).await;

        assert_eq!(outcome, Ok(ReconcileOutcome::Applied));
        assert_eq!(s.draft(), "Once upon a time");
        assert_eq!(s.credits(), 4);
        assert_eq!(
            notes.notifications(),
            vec![Notification::success("Blog generated successfully")]
        );
    }

    #[tokio::test]
    async fn no_notification_before_the_last_chunk() {
        let (mut s, notes) = session(vec!["Once", " upon"], false);

        let in_flight = s
            .dispatch(ActionKind::Rephrase, CancellationToken::new())
            .await
            .unwrap();
        assert!(notes.notifications().is_empty());

        let finished = in_flight.finish().await;
        assert!(notes.notifications().is_empty());

        s.reconcile(finished).unwrap();
        assert_eq!(notes.notifications().len(), 1);
    }

    #[tokio::test]
    async fn edits_during_flight_hold_the_result() {
        let (mut s, notes) = session(vec!["Shorter text"], false);

        let in_flight = s
            .dispatch(ActionKind::Summarize, CancellationToken::new())
            .await
            .unwrap();
        s.set_draft("My draft, now longer");
        let outcome = s.reconcile(in_flight.finish().await);

        assert_eq!(outcome, Ok(ReconcileOutcome::Held));
        assert_eq!(s.draft(), "My draft, now longer");
        assert_eq!(
            s.pending_suggestion(),
            Some(&Suggestion {
                kind: ActionKind::Summarize,
                text: "Shorter text".into()
            })
        );
        assert_eq!(notes.notifications()[0].level, Level::Warning);

        assert!(s.apply_suggestion());
        assert_eq!(s.draft(), "Shorter text");
        assert!(s.pending_suggestion().is_none());
        assert_eq!(
            notes.notifications()[1],
            Notification::success("Blog content summarized successfully")
        );
    }

    #[tokio::test]
    async fn discarding_keeps_the_users_draft() {
        let (mut s, _notes) = session(vec!["AI text"], false);

        let in_flight = s
            .dispatch(ActionKind::Rephrase, CancellationToken::new())
            .await
            .unwrap();
        s.set_draft("edited");
        s.reconcile(in_flight.finish().await).unwrap();

        assert!(s.discard_suggestion());
        assert_eq!(s.draft(), "edited");
        assert!(!s.discard_suggestion());
        assert!(!s.apply_suggestion());
    }

    #[tokio::test]
    async fn failed_stream_leaves_draft_and_reports_error() {
        let (mut s, notes) = session(vec!["partial"], true);

        let outcome = s.run(ActionKind::Spellcheck, CancellationToken::new()).await;

        assert!(matches!(outcome, Err(DispatchError::Transport(_))));
        assert_eq!(s.draft(), "My draft");
        let seen = notes.notifications();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].level, Level::Error);
    }

    #[tokio::test]
    async fn refused_dispatch_is_reported() {
        let (mut s, notes) = session(vec!["x"], false);
        s.set_draft("   ");

        let outcome = s.run(ActionKind::Rephrase, CancellationToken::new()).await;

        assert_eq!(outcome, Err(DispatchError::EmptyInput));
        assert_eq!(
            notes.notifications(),
            vec![Notification::error("Text field is empty. Write something first.")]
        );
    }

    #[tokio::test]
    async fn cancelled_action_changes_nothing() {
        let (mut s, notes) = session(vec!["Once", " upon"], false);
        let cancel = CancellationToken::new();

        let in_flight = s.dispatch(ActionKind::Rephrase, cancel.clone()).await.unwrap();
        cancel.cancel();
        let outcome = s.reconcile(in_flight.finish().await);

        assert_eq!(outcome, Err(DispatchError::Cancelled));
        assert_eq!(s.draft(), "My draft");
        assert!(notes.notifications().is_empty());
    }

    #[tokio::test]
    async fn cancelling_before_the_server_answers_is_silent() {
        let notes = Arc::new(RecordingNotifier::new());
        let dispatcher = ActionDispatcher::new(Arc::new(Unanswered));
        let mut s = EditorSession::new(dispatcher, notes.clone(), "My draft", 5);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            canceller.cancel();
        });
        let outcome = s.run(ActionKind::Rephrase, cancel).await;

        assert_eq!(outcome, Err(DispatchError::Cancelled));
        assert_eq!(s.draft(), "My draft");
        assert_eq!(s.credits(), 4);
        assert!(notes.notifications().is_empty());
    }

    #[test]
    fn identical_edit_does_not_count_as_a_change() {
        let (mut s, _) = session(vec![], false);
        let before = s.revision;
        s.set_draft("My draft");
        assert_eq!(s.revision, before);
    }
}
