pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod macros;
pub mod prelude;
pub mod state;
pub mod utils;

use anchor_lang::prelude::*;
use instructions::*;
use prelude::*;
use state::tempo_group::{GroupConfigCompact, GroupConfigOpt, WrappedI80F48};

cfg_if::cfg_if! {
    if #[cfg(feature = "mainnet-beta")] {
        declare_id!("5KQWLPxpwhafmcMZmc5vwSNv69Cyar1yiknCZZQcsvhf");
    } else if #[cfg(feature = "devnet")] {
        declare_id!("A8x6qfu5q2sShUPJ4n2dKTJhE9VGM7hrQPXst2RmWwNw");
    } else {
        declare_id!("BDeW6mZsR7DmFRJr2v8a9Z4DebDdpmkX748X2PCKeSTW");
    }
}

#[program]
pub mod tempo {
    use super::*;

    pub fn tempo_group_initialize(
        ctx: Context<TempoGroupInitialize>,
        config: GroupConfigCompact,
    ) -> TempoResult {
        tempo_group::initialize_group(ctx, config)
    }

    pub fn tempo_group_configure(
        ctx: Context<TempoGroupConfigure>,
        config: GroupConfigOpt,
    ) -> TempoResult {
        tempo_group::configure(ctx, config)
    }

    // User instructions

    /// Initialize a tempo account for a given group.
    ///
    /// The register deposit up to `first_deposit_matured_cap` is credited with
    /// full maturity weight immediately, the rest goes through the pending
    /// queue like any ordinary deposit.
    pub fn tempo_account_initialize(
        ctx: Context<TempoAccountInitialize>,
        initial_deposit: u64,
    ) -> TempoResult {
        tempo_account::initialize_account(ctx, initial_deposit)
    }

    pub fn tempo_account_deposit(ctx: Context<TempoAccountDeposit>, amount: u64) -> TempoResult {
        tempo_account::deposit(ctx, amount)
    }

    /// Ordinary withdrawal, consumes the least mature funds first.
    pub fn tempo_account_withdraw(ctx: Context<TempoAccountWithdraw>, amount: u64) -> TempoResult {
        tempo_account::withdraw(ctx, amount)
    }

    /// Withdrawal that sheds the highest maturity value per unit withdrawn.
    /// Returns the total maturity weight lost, floored to native units.
    pub fn tempo_account_divest(
        ctx: Context<TempoAccountDivest>,
        amount: u64,
    ) -> TempoResult<u64> {
        tempo_account::divest(ctx, amount)
    }

    /// Bring the account's decay queue up to date and return the effective
    /// maturity, floored to native units.
    pub fn tempo_account_pulse_maturity(
        ctx: Context<TempoAccountPulseMaturity>,
    ) -> TempoResult<u64> {
        tempo_account::pulse_maturity(ctx)
    }

    /// Admission check for one transaction under the supplied network load.
    /// A denial is a normal outcome (`Ok(false)`), never an error.
    pub fn tempo_account_request_bandwidth(
        ctx: Context<TempoAccountRequestBandwidth>,
        load_ratio: WrappedI80F48,
    ) -> TempoResult<bool> {
        tempo_account::request_bandwidth(ctx, load_ratio)
    }

    /// Escrow `amount` into the group vault and credit it to the account at
    /// `unlock_at`, routed through the pending queue on settlement.
    pub fn tempo_account_schedule_credit(
        ctx: Context<TempoAccountScheduleCredit>,
        amount: u64,
        unlock_at: i64,
    ) -> TempoResult {
        tempo_account::schedule_credit(ctx, amount, unlock_at)
    }

    // Operational instructions

    pub fn set_account_flag(ctx: Context<SetAccountFlag>, flag: u64) -> TempoResult {
        tempo_group::set_account_flag(ctx, flag)
    }

    pub fn unset_account_flag(ctx: Context<UnsetAccountFlag>, flag: u64) -> TempoResult {
        tempo_group::unset_account_flag(ctx, flag)
    }
}

#[cfg(not(feature = "no-entrypoint"))]
use solana_security_txt::security_txt;
#[cfg(not(feature = "no-entrypoint"))]
security_txt! {
    name: "tempo",
    project_url: "https://tempo.example.org/",
    contacts: "email:security@tempo.example.org",
    policy: "https://github.com/tempo-protocol/tempo/blob/main/SECURITY.md",
    preferred_languages: "en",
    source_code: "https://github.com/tempo-protocol/tempo"
}
