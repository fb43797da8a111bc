use anchor_lang::prelude::*;

use crate::state::tempo_group::{GroupConfig, WrappedI80F48};

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct GroupEventHeader {
    pub signer: Option<Pubkey>,
    pub tempo_group: Pubkey,
}

#[derive(AnchorSerialize, AnchorDeserialize)]
pub struct AccountEventHeader {
    pub signer: Option<Pubkey>,
    pub tempo_account: Pubkey,
    pub tempo_account_authority: Pubkey,
    pub tempo_group: Pubkey,
}

// Group events

#[event]
pub struct TempoGroupCreateEvent {
    pub header: GroupEventHeader,
}

#[event]
pub struct TempoGroupConfigureEvent {
    pub header: GroupEventHeader,
    pub config: GroupConfig,
}

// Account events

#[event]
pub struct TempoAccountCreateEvent {
    pub header: AccountEventHeader,
    pub initial_deposit: u64,
    /// Portion of the register deposit credited with full maturity weight.
    pub matured_portion: u64,
}

#[event]
pub struct TempoAccountDepositEvent {
    pub header: AccountEventHeader,
    pub amount: u64,
}

#[event]
pub struct TempoAccountWithdrawEvent {
    pub header: AccountEventHeader,
    pub amount: u64,
}

#[event]
pub struct TempoAccountDivestEvent {
    pub header: AccountEventHeader,
    pub amount: u64,
    pub weight_lost: u64,
}

#[event]
pub struct TempoAccountScheduleCreditEvent {
    pub header: AccountEventHeader,
    pub amount: u64,
    pub unlock_at: i64,
}

#[event]
pub struct TempoAccountSettleCreditEvent {
    pub header: AccountEventHeader,
    pub amount: u64,
    pub unlock_at: i64,
}

#[event]
pub struct TempoAccountMaturityPulseEvent {
    pub header: AccountEventHeader,
    pub maturity: u64,
}

#[event]
pub struct TempoAccountBandwidthEvent {
    pub header: AccountEventHeader,
    pub admitted: bool,
    pub cost: WrappedI80F48,
    pub capacity: WrappedI80F48,
}

/// Emitted when an operation had to clamp a negative or overflowing queue
/// aggregate back into range. Non-fatal, reported for offline inspection.
#[event]
pub struct MaturityInvariantClampEvent {
    pub header: AccountEventHeader,
    pub anomaly_count: u64,
}
