use crate::{
    check,
    events::{AccountEventHeader, TempoAccountDepositEvent},
    instructions::tempo_account::{emit_clamp_if_any, emit_settled_credits},
    prelude::*,
    state::tempo_account::{TempoAccount, ACCOUNT_DISABLED},
};
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount, Transfer};

/// 1. Settle scheduled credits that have come due
/// 2. Append the deposit to the pending queue (merging same-bucket arrivals)
/// 3. Transfer funds from the signer's token account to the liquidity vault
pub fn deposit(ctx: Context<TempoAccountDeposit>, amount: u64) -> TempoResult {
    let TempoAccountDeposit {
        tempo_group: tempo_group_loader,
        tempo_account: tempo_account_loader,
        signer,
        signer_token_account,
        liquidity_vault,
        token_program,
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

    if amount == 0 {
        return Ok(());
    }

    tempo_account.credit(amount, clock.unix_timestamp, &group.config)?;

    group.deposit_spl_transfer(
        amount,
        Transfer {
            from: signer_token_account.to_account_info(),
            to: liquidity_vault.to_account_info(),
            authority: signer.to_account_info(),
        },
        token_program.to_account_info(),
    )?;

    emit!(TempoAccountDepositEvent {
        header: AccountEventHeader {
            signer: Some(signer.key()),
            tempo_account: tempo_account_loader.key(),
            tempo_account_authority: tempo_account.authority,
            tempo_group: tempo_account.group,
        },
        amount,
    });
    emit_clamp_if_any(
        anomalies_before,
        signer.key(),
        tempo_account_loader.key(),
        &tempo_account,
    );

    Ok(())
}

#[derive(Accounts)]
pub struct TempoAccountDeposit<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        mut,
        constraint = tempo_account.load()?.group == tempo_group.key(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    #[account(address = tempo_account.load()?.authority)]
    pub signer: Signer<'info>,

    /// CHECK: Token mint/authority are checked at transfer
    #[account(mut)]
    pub signer_token_account: AccountInfo<'info>,

    #[account(mut, address = tempo_group.load()?.liquidity_vault)]
    pub liquidity_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}
