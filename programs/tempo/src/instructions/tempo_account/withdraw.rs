use crate::{
    check,
    constants::{LIQUIDITY_VAULT_AUTHORITY_SEED, LIQUIDITY_VAULT_SEED},
    events::{AccountEventHeader, TempoAccountWithdrawEvent},
    group_signer,
    instructions::tempo_account::{emit_clamp_if_any, emit_settled_credits},
    prelude::*,
    state::tempo_account::{TempoAccount, WithdrawStrategy, ACCOUNT_DISABLED},
    state::tempo_group::GroupVaultType,
};
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount, Transfer};

/// 1. Settle scheduled credits that have come due
/// 2. Remove liquidity newest-first, so fresh deposits are spent before any
///    accrued maturity weight is touched
/// 3. Transfer funds from the liquidity vault to the destination account
pub fn withdraw(ctx: Context<TempoAccountWithdraw>, amount: u64) -> TempoResult {
    let TempoAccountWithdraw {
        tempo_group: tempo_group_loader,
        tempo_account: tempo_account_loader,
        signer,
        destination_token_account,
        liquidity_vault,
        liquidity_vault_authority,
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

    tempo_account.withdraw(
        amount,
        clock.unix_timestamp,
        WithdrawStrategy::NewestFirst,
        &group.config,
    )?;

    let group_key = tempo_group_loader.key();
    group.withdraw_spl_transfer(
        amount,
        Transfer {
            from: liquidity_vault.to_account_info(),
            to: destination_token_account.to_account_info(),
            authority: liquidity_vault_authority.to_account_info(),
        },
        token_program.to_account_info(),
        group_signer!(
            GroupVaultType::Liquidity,
            group_key,
            group.liquidity_vault_authority_bump
        ),
    )?;

    emit!(TempoAccountWithdrawEvent {
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
pub struct TempoAccountWithdraw<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        mut,
        constraint = tempo_account.load()?.group == tempo_group.key(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    #[account(address = tempo_account.load()?.authority)]
    pub signer: Signer<'info>,

    #[account(mut)]
    pub destination_token_account: Account<'info, TokenAccount>,

    /// CHECK: Seed constraint check
    #[account(
        seeds = [
            LIQUIDITY_VAULT_AUTHORITY_SEED.as_bytes(),
            tempo_group.key().as_ref(),
        ],
        bump = tempo_group.load()?.liquidity_vault_authority_bump,
    )]
    pub liquidity_vault_authority: AccountInfo<'info>,

    #[account(
        mut,
        seeds = [
            LIQUIDITY_VAULT_SEED.as_bytes(),
            tempo_group.key().as_ref(),
        ],
        bump = tempo_group.load()?.liquidity_vault_bump,
    )]
    pub liquidity_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}
