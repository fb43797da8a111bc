use crate::{
    events::{AccountEventHeader, TempoAccountCreateEvent},
    prelude::*,
    state::tempo_account::TempoAccount,
};
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount, Transfer};

/// 1. Create the tempo account for the group
/// 2. Credit the register deposit: the portion up to
///    `first_deposit_matured_cap` at full maturity weight, the rest through
///    the pending queue
/// 3. Seed the bandwidth state with the fully weighted portion
/// 4. Transfer the register deposit into the group's liquidity vault
pub fn initialize_account(
    ctx: Context<TempoAccountInitialize>,
    initial_deposit: u64,
) -> TempoResult {
    let TempoAccountInitialize {
        tempo_group: tempo_group_loader,
        tempo_account: tempo_account_loader,
        authority,
        signer_token_account,
        liquidity_vault,
        token_program,
        ..
    } = ctx.accounts;

    let clock = Clock::get()?;
    let group = tempo_group_loader.load()?;
    let mut tempo_account = tempo_account_loader.load_init()?;

    tempo_account.initialize(tempo_group_loader.key(), authority.key());

    let matured_portion =
        tempo_account.register_deposit(initial_deposit, clock.unix_timestamp, &group.config)?;
    tempo_account
        .bandwidth
        .initialize(matured_portion, clock.unix_timestamp);

    if initial_deposit > 0 {
        group.deposit_spl_transfer(
            initial_deposit,
            Transfer {
                from: signer_token_account.to_account_info(),
                to: liquidity_vault.to_account_info(),
                authority: authority.to_account_info(),
            },
            token_program.to_account_info(),
        )?;
    }

    emit!(TempoAccountCreateEvent {
        header: AccountEventHeader {
            signer: Some(authority.key()),
            tempo_account: tempo_account_loader.key(),
            tempo_account_authority: tempo_account.authority,
            tempo_group: tempo_account.group,
        },
        initial_deposit,
        matured_portion,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct TempoAccountInitialize<'info> {
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(
        init,
        payer = fee_payer,
        space = 8 + std::mem::size_of::<TempoAccount>(),
    )]
    pub tempo_account: AccountLoader<'info, TempoAccount>,

    pub authority: Signer<'info>,

    #[account(mut)]
    pub fee_payer: Signer<'info>,

    /// CHECK: Token mint/authority are checked at transfer
    #[account(mut)]
    pub signer_token_account: AccountInfo<'info>,

    #[account(mut, address = tempo_group.load()?.liquidity_vault)]
    pub liquidity_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}
