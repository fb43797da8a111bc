mod deposit;
mod divest;
mod initialize;
mod pulse_maturity;
mod request_bandwidth;
mod schedule_credit;
mod withdraw;

pub use deposit::*;
pub use divest::*;
pub use initialize::*;
pub use pulse_maturity::*;
pub use request_bandwidth::*;
pub use schedule_credit::*;
pub use withdraw::*;

use crate::{
    events::{AccountEventHeader, MaturityInvariantClampEvent, TempoAccountSettleCreditEvent},
    state::tempo_account::{ScheduledCredit, TempoAccount},
};
use anchor_lang::prelude::*;

/// Emit one settlement event per scheduled credit that came due at the top of
/// this operation.
pub(crate) fn emit_settled_credits(
    settled: &[ScheduledCredit],
    signer: Pubkey,
    tempo_account: Pubkey,
    account: &TempoAccount,
) {
    for credit in settled {
        emit!(TempoAccountSettleCreditEvent {
            header: AccountEventHeader {
                signer: Some(signer),
                tempo_account,
                tempo_account_authority: account.authority,
                tempo_group: account.group,
            },
            amount: credit.amount,
            unlock_at: credit.unlock_at,
        });
    }
}

/// Report clamped invariant violations upward as a non-fatal anomaly event.
pub(crate) fn emit_clamp_if_any(
    anomalies_before: u64,
    signer: Pubkey,
    tempo_account: Pubkey,
    account: &TempoAccount,
) {
    if account.pending.anomaly_count > anomalies_before {
        emit!(MaturityInvariantClampEvent {
            header: AccountEventHeader {
                signer: Some(signer),
                tempo_account,
                tempo_account_authority: account.authority,
                tempo_group: account.group,
            },
            anomaly_count: account.pending.anomaly_count,
        });
    }
}
