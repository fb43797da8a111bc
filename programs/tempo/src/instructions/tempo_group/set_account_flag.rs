use crate::{check, prelude::*, state::tempo_account::{TempoAccount, ACCOUNT_DISABLED}};
use anchor_lang::prelude::*;

fn validate_flag(flag: u64) -> TempoResult {
    check!(flag == ACCOUNT_DISABLED, TempoError::IllegalFlag);
    Ok(())
}

pub fn set_account_flag(ctx: Context<SetAccountFlag>, flag: u64) -> TempoResult {
    validate_flag(flag)?;

    let mut tempo_account = ctx.accounts.tempo_account.load_mut()?;
    tempo_account.set_flag(flag);

    Ok(())
}

pub fn unset_account_flag(ctx: Context<UnsetAccountFlag>, flag: u64) -> TempoResult {
    validate_flag(flag)?;

    let mut tempo_account = ctx.accounts.tempo_account.load_mut()?;
    tempo_account.unset_flag(flag);

    Ok(())
}

#[derive(Accounts)]
pub struct SetAccountFlag<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        mut,
        constraint = tempo_account.load()?.group == tempo_group.key(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    /// Admin only
    #[account(address = tempo_group.load()?.admin)]
    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct UnsetAccountFlag<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        mut,
        constraint = tempo_account.load()?.group == tempo_group.key(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    /// Admin only
    #[account(address = tempo_group.load()?.admin)]
    pub admin: Signer<'info>,
}
