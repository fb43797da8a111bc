use crate::{
    events::{AccountEventHeader, TempoAccountScheduleCreditEvent},
    instructions::tempo_account::emit_settled_credits,
    prelude::*,
    state::tempo_account::TempoAccount,
};
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount, Transfer};

/// Escrow `amount` into the group's liquidity vault now and credit it to the
/// account at `unlock_at`. Settlement routes the credit through the pending
/// queue at its unlock bucket, so maturity accrues from the unlock time even
/// when the settling operation runs later.
pub fn schedule_credit(
    ctx: Context<TempoAccountScheduleCredit>,
    amount: u64,
    unlock_at: i64,
) -> TempoResult {
    let TempoAccountScheduleCredit {
        tempo_group: tempo_group_loader,
        tempo_account: tempo_account_loader,
        admin,
        admin_token_account,
        liquidity_vault,
        token_program,
    } = ctx.accounts;

    let clock = Clock::get()?;
    let group = tempo_group_loader.load()?;
    let mut tempo_account = tempo_account_loader.load_mut()?;

    let settled = tempo_account.settle_due_credits(clock.unix_timestamp, &group.config)?;
    emit_settled_credits(
        &settled,
        admin.key(),
        tempo_account_loader.key(),
        &tempo_account,
    );

    if amount == 0 {
        return Ok(());
    }

    tempo_account.schedule_credit(amount, unlock_at, clock.unix_timestamp)?;

    group.deposit_spl_transfer(
        amount,
        Transfer {
            from: admin_token_account.to_account_info(),
            to: liquidity_vault.to_account_info(),
            authority: admin.to_account_info(),
        },
        token_program.to_account_info(),
    )?;

    emit!(TempoAccountScheduleCreditEvent {
        header: AccountEventHeader {
            signer: Some(admin.key()),
            tempo_account: tempo_account_loader.key(),
            tempo_account_authority: tempo_account.authority,
            tempo_group: tempo_account.group,
        },
        amount,
        unlock_at,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct TempoAccountScheduleCredit<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        mut,
        constraint = tempo_account.load()?.group == tempo_group.key(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    /// Admin only
    #[account(address = tempo_group.load()?.admin)]
    pub admin: Signer<'info>,

    /// CHECK: Token mint/authority are checked at transfer
    #[account(mut)]
    pub admin_token_account: AccountInfo<'info>,

    #[account(mut, address = tempo_group.load()?.liquidity_vault)]
    pub liquidity_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}
