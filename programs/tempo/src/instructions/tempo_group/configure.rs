use crate::{
    events::{GroupEventHeader, TempoGroupConfigureEvent},
    prelude::*,
    state::tempo_group::GroupConfigOpt,
};
use anchor_lang::prelude::*;

/// Apply a partial config update. Every update is re-validated so the group
/// can never leave a valid state.
pub fn configure(ctx: Context<TempoGroupConfigure>, config: GroupConfigOpt) -> TempoResult {
    let tempo_group = &mut ctx.accounts.tempo_group.load_mut()?;

    tempo_group.configure(&config)?;

    emit!(TempoGroupConfigureEvent {
        header: GroupEventHeader {
            signer: Some(ctx.accounts.admin.key()),
            tempo_group: ctx.accounts.tempo_group.key(),
        },
        config: tempo_group.config,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct TempoGroupConfigure<'info> {
    #[account(mut)]
    pub tempo_group: AccountLoader<'info, TempoGroup>,

    #[account(address = tempo_group.load()?.admin)]
    pub admin: Signer<'info>,
}
