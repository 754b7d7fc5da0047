//! Completion service — prompt, debit, then open the upstream stream.

use quill_core::actions::ActionKind;
use quill_core::credits::CreditLedger;
use quill_core::generation::{TextGenerator, TextStream};
use tracing::info;

use crate::error::AppResult;

/// An accepted completion: the balance after its debit and the live stream.
pub struct StartedCompletion {
    pub remaining_actions: i64,
    pub stream: TextStream,
}

/// Run one completion for `owner_id`.
///
/// The prompt is built first so invalid input never costs a credit. The debit
/// is a single atomic ledger call; a failed upstream call afterwards does not
/// refund it.
pub async fn start_completion(
    ledger: &dyn CreditLedger,
    generator: &dyn TextGenerator,
    owner_id: &str,
    kind: ActionKind,
    source_text: &str,
) -> AppResult<StartedCompletion> {
    let prompt = kind.build_prompt(source_text)?;

    let remaining_actions = ledger.debit(owner_id).await?;

    let stream = generator.stream_text(&prompt).await?;
    info!(owner_id, %kind, remaining_actions, "completion stream started");

    Ok(StartedCompletion {
        remaining_actions,
        stream,
    })
}
