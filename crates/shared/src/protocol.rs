use serde::{Deserialize, Serialize};

use crate::domain::AccountId;

/// One invocation of the external contract, in the wire shape the gateway
/// forwards to the ledger. The method names mirror the contract itself:
/// `get_pnl` is a read-only view call, `add_statement` is a state change
/// authorized against the signer.
///
/// The ledger also exposes a legacy string-message pair
/// (`add_statement {message}` / `get_statement`); this client speaks only
/// the numeric shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "args", rename_all = "snake_case")]
pub enum ContractCall {
    GetPnl { account_id: AccountId },
    AddStatement { statement: f64 },
}

/// Result body of a `get_pnl` view call. Never-written accounts come back
/// as `0.0`, not as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlResponse {
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Recorded,
}

/// Acknowledgment body of an `add_statement` call. Carries no value: the
/// client is expected to read the persisted statement back rather than
/// trust what it just sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub account_id: AccountId,
    pub outcome: SubmitOutcome,
}
