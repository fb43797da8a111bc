use crate::{
    events::{AccountEventHeader, TempoAccountMaturityPulseEvent},
    instructions::tempo_account::{emit_clamp_if_any, emit_settled_credits},
    prelude::*,
    state::tempo_account::TempoAccount,
};
use anchor_lang::prelude::*;

/// Bring the account's decay queue up to date and report the effective
/// maturity weight. Permissionless: refreshing cached state early never
/// changes the outcome of later operations.
pub fn pulse_maturity(ctx: Context<TempoAccountPulseMaturity>) -> TempoResult<u64> {
    let TempoAccountPulseMaturity {
        tempo_group: tempo_group_loader,
        tempo_account: tempo_account_loader,
        signer,
    } = ctx.accounts;

    let clock = Clock::get()?;
    let group = tempo_group_loader.load()?;
    let mut tempo_account = tempo_account_loader.load_mut()?;

    let anomalies_before = tempo_account.pending.anomaly_count;
    let settled = tempo_account.settle_due_credits(clock.unix_timestamp, &group.config)?;
    emit_settled_credits(
        &settled,
        signer.key(),
        tempo_account_loader.key(),
        &tempo_account,
    );

    let maturity = tempo_account.current_maturity(clock.unix_timestamp, &group.config)?;
    let maturity: u64 = maturity.to_num();

    emit!(TempoAccountMaturityPulseEvent {
        header: AccountEventHeader {
            signer: Some(signer.key()),
            tempo_account: tempo_account_loader.key(),
            tempo_account_authority: tempo_account.authority,
            tempo_group: tempo_account.group,
        },
        maturity,
    });
    emit_clamp_if_any(
        anomalies_before,
        signer.key(),
        tempo_account_loader.key(),
        &tempo_account,
    );

    Ok(maturity)
}

#[derive(Accounts)]
pub struct TempoAccountPulseMaturity<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        mut,
        constraint = tempo_account.load()?.group == tempo_group.key(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    pub signer: Signer<'info>,
}
