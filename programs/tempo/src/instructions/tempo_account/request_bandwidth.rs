use crate::{
    check,
    events::{AccountEventHeader, TempoAccountBandwidthEvent},
    instructions::tempo_account::{emit_clamp_if_any, emit_settled_credits},
    prelude::*,
    state::bandwidth::BandwidthState,
    state::tempo_account::{TempoAccount, ACCOUNT_DISABLED},
    state::tempo_group::WrappedI80F48,
};
use anchor_lang::prelude::*;
use fixed::types::I80F48;

/// Admission check for one transaction under the supplied congestion signal.
/// `load_ratio` is current versus historical peak throughput, computed by the
/// dispatcher. A denial is a normal outcome (`Ok(false)`) telling the caller
/// to retry later, never an error.
pub fn request_bandwidth(
    ctx: Context<TempoAccountRequestBandwidth>,
    load_ratio: WrappedI80F48,
) -> TempoResult<bool> {
    let TempoAccountRequestBandwidth {
        tempo_group: tempo_group_loader,
        tempo_account: tempo_account_loader,
        signer,
    } = ctx.accounts;

    let clock = Clock::get()?;
    let group = tempo_group_loader.load()?;
    let mut tempo_account = tempo_account_loader.load_mut()?;

    check!(
        !tempo_account.get_flag(ACCOUNT_DISABLED),
        TempoError::AccountDisabled
    );

    let anomalies_before = tempo_account.pending.anomaly_count;
    let settled = tempo_account.settle_due_credits(clock.unix_timestamp, &group.config)?;
    emit_settled_credits(
        &settled,
        signer.key(),
        tempo_account_loader.key(),
        &tempo_account,
    );

    let load_ratio: I80F48 = load_ratio.into();
    let maturity = tempo_account.current_maturity(clock.unix_timestamp, &group.config)?;
    let decision = tempo_account.bandwidth.try_admit(
        maturity,
        clock.unix_timestamp,
        load_ratio,
        &group.config,
    )?;

    emit!(TempoAccountBandwidthEvent {
        header: AccountEventHeader {
            signer: Some(signer.key()),
            tempo_account: tempo_account_loader.key(),
            tempo_account_authority: tempo_account.authority,
            tempo_group: tempo_account.group,
        },
        admitted: decision.is_admitted(),
        cost: BandwidthState::transaction_cost(load_ratio, &group.config)?.into(),
        capacity: tempo_account.bandwidth.capacity,
    });
    emit_clamp_if_any(
        anomalies_before,
        signer.key(),
        tempo_account_loader.key(),
        &tempo_account,
    );

    Ok(decision.is_admitted())
}

#[derive(Accounts)]
pub struct TempoAccountRequestBandwidth<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        mut,
        constraint = tempo_account.load()?.group == tempo_group.key(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    #[account(address = tempo_account.load()?.authority)]
    pub signer: Signer<'info>,
}
