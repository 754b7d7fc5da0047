//! Action dispatcher — local gating and the optimistic credit count.

use std::sync::Arc;

use quill_core::actions::{ActionKind, ActionRequest};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::CompletionBackend;
use crate::error::DispatchError;
use crate::stream::CompletionStream;

/// Gates and sends AI actions on behalf of one editing session.
#[derive(Clone)]
pub struct ActionDispatcher {
    backend: Arc<dyn CompletionBackend>,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Start one AI action over `draft`.
    ///
    /// `credits` is the caller's local view of the balance. A blank draft or
    /// a non-positive balance fails without any request. Otherwise the local
    /// count drops by one before the request goes out, exactly one request is
    /// sent, and the count is then re-synced from the server:
    ///
    /// - accepted: set to the balance the server reports
    /// - quota exhausted: set to zero
    /// - rejected before the server's debit (bad input, ledger outage,
    ///   session rejected): restored to its previous value
    /// - anything else: left debited, the server may have spent the credit
    pub async fn invoke(
        &self,
        kind: ActionKind,
        draft: &str,
        credits: &mut i64,
        cancel: CancellationToken,
    ) -> Result<CompletionStream, DispatchError> {
        if draft.trim().is_empty() {
            return Err(DispatchError::EmptyInput);
        }
        if *credits <= 0 {
            return Err(DispatchError::QuotaExhausted);
        }

        let before = *credits;
        *credits -= 1;
        let request = ActionRequest::new(kind, draft);

        match self.backend.complete(&request, cancel).await {
            Ok(reply) => {
                if let Some(remaining) = reply.remaining_actions {
                    *credits = remaining;
                }
                debug!(%kind, credits = *credits, "action dispatched");
                Ok(reply.stream)
            }
            Err(DispatchError::QuotaExhausted) => {
                *credits = 0;
                Err(DispatchError::QuotaExhausted)
            }
            Err(e) if e.rejected_before_debit() => {
                *credits = before;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
