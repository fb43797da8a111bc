use crate::{
    constants::{LIQUIDITY_VAULT_AUTHORITY_SEED, LIQUIDITY_VAULT_SEED},
    events::{GroupEventHeader, TempoGroupCreateEvent},
    prelude::*,
    state::tempo_group::{GroupConfig, GroupConfigCompact},
};
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

pub fn initialize_group(
    ctx: Context<TempoGroupInitialize>,
    config: GroupConfigCompact,
) -> TempoResult {
    let config: GroupConfig = config.into();
    config.validate()?;

    let tempo_group = &mut ctx.accounts.tempo_group.load_init()?;

    tempo_group.set_initial_configuration(
        ctx.accounts.admin.key(),
        ctx.accounts.mint.key(),
        ctx.accounts.mint.decimals,
        ctx.accounts.liquidity_vault.key(),
        ctx.bumps.liquidity_vault,
        ctx.bumps.liquidity_vault_authority,
        config,
    );

    emit!(TempoGroupCreateEvent {
        header: GroupEventHeader {
            signer: Some(ctx.accounts.admin.key()),
            tempo_group: ctx.accounts.tempo_group.key(),
        }
    });

    Ok(())
}

#[derive(Accounts)]
pub struct TempoGroupInitialize<'info> {
    #[account(zero)]
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub mint: Box<Account<'info, Mint>>,

    /// CHECK: Seed constraint check
    #[account(
        seeds = [
            LIQUIDITY_VAULT_AUTHORITY_SEED.as_bytes(),
            tempo_group.key().as_ref(),
        ],
        bump
    )]
    pub liquidity_vault_authority: UncheckedAccount<'info>,

    #[account(
        init,
        payer = admin,
        token::mint = mint,
        token::authority = liquidity_vault_authority,
        seeds = [
            LIQUIDITY_VAULT_SEED.as_bytes(),
            tempo_group.key().as_ref(),
        ],
        bump,
    )]
    pub liquidity_vault: Box<Account<'info, TokenAccount>>,

    pub rent: Sysvar<'info, Rent>,
    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}
