//! # quill_client
//!
//! Editor-side half of Quill's AI actions: the dispatcher that gates and
//! sends a request, and the session that folds the streamed result back
//! into the draft.

pub mod backend;
pub mod dispatcher;
pub mod editor;
pub mod error;
pub mod notify;
pub mod stream;

pub use backend::{CompletionBackend, CompletionReply, HttpCompletionBackend};
pub use dispatcher::ActionDispatcher;
pub use editor::{EditorSession, Finished, InFlight, ReconcileOutcome, Suggestion};
pub use error::DispatchError;
pub use notify::{Level, Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use stream::CompletionStream;
