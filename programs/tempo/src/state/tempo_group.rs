use std::fmt::{Debug, Formatter};

use anchor_lang::prelude::*;
use anchor_spl::token::{transfer, Transfer};
use fixed::types::I80F48;
#[cfg(any(feature = "test", feature = "client"))]
use type_layout::TypeLayout;

use crate::{
    assert_struct_align, assert_struct_size, check, debug,
    constants::{
        BANDWIDTH_RECOVERY_WINDOW_DEFAULT, BASE_TX_COST_DEFAULT, BUCKET_INTERVAL_DEFAULT,
        FIRST_DEPOSIT_MATURED_CAP_DEFAULT, FLOOR_BOOST_DEFAULT, LIQUIDITY_VAULT_AUTHORITY_SEED,
        LIQUIDITY_VAULT_SEED, MAX_PENDING_ENTRIES, MINIMUM_RESERVED_BALANCE_DEFAULT,
        PENDING_ENTRIES_SLACK, RECOVERY_WINDOW_DEFAULT,
    },
    prelude::TempoError,
    set_if_some, TempoResult,
};

#[repr(C, align(8))]
#[zero_copy]
#[derive(Default, AnchorDeserialize, AnchorSerialize)]
pub struct WrappedI80F48 {
    pub value: [u8; 16],
}

impl Debug for WrappedI80F48 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", I80F48::from_le_bytes(self.value))
    }
}

impl From<I80F48> for WrappedI80F48 {
    fn from(i: I80F48) -> Self {
        Self {
            value: i.to_le_bytes(),
        }
    }
}

impl From<WrappedI80F48> for I80F48 {
    fn from(w: WrappedI80F48) -> Self {
        Self::from_le_bytes(w.value)
    }
}

impl PartialEq for WrappedI80F48 {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for WrappedI80F48 {}

assert_struct_size!(TempoGroup, 512);
assert_struct_align!(TempoGroup, 8);
#[account(zero_copy)]
#[repr(C)]
#[cfg_attr(
    any(feature = "test", feature = "client"),
    derive(Debug, PartialEq, Eq, TypeLayout)
)]
pub struct TempoGroup {
    pub admin: Pubkey,           // 32
    pub mint: Pubkey,            // 32
    pub liquidity_vault: Pubkey, // 32

    pub config: GroupConfig, // 96

    pub group_flags: u64, // 8

    pub mint_decimals: u8,
    pub liquidity_vault_bump: u8,
    pub liquidity_vault_authority_bump: u8,
    pub _pad0: [u8; 5],

    pub _padding: [u64; 38], // 8 * 38 = 304
}

impl TempoGroup {
    /// Set the group parameters when initializing a group.
    /// This should be called only when the group is first initialized.
    #[allow(clippy::too_many_arguments)]
    pub fn set_initial_configuration(
        &mut self,
        admin_pk: Pubkey,
        mint: Pubkey,
        mint_decimals: u8,
        liquidity_vault: Pubkey,
        liquidity_vault_bump: u8,
        liquidity_vault_authority_bump: u8,
        config: GroupConfig,
    ) {
        self.admin = admin_pk;
        self.mint = mint;
        self.mint_decimals = mint_decimals;
        self.liquidity_vault = liquidity_vault;
        self.liquidity_vault_bump = liquidity_vault_bump;
        self.liquidity_vault_authority_bump = liquidity_vault_authority_bump;
        self.config = config;
    }

    /// Configure the group parameters.
    /// This function validates config values so the group remains in a valid state.
    /// Any modification of group config should happen through this function.
    pub fn configure(&mut self, config: &GroupConfigOpt) -> TempoResult {
        set_if_some!(self.config.recovery_window, config.recovery_window);
        set_if_some!(self.config.bucket_interval, config.bucket_interval);
        set_if_some!(
            self.config.bandwidth_recovery_window,
            config.bandwidth_recovery_window
        );
        set_if_some!(self.config.base_tx_cost, config.base_tx_cost);
        set_if_some!(self.config.floor_boost, config.floor_boost);
        set_if_some!(
            self.config.minimum_reserved_balance,
            config.minimum_reserved_balance
        );
        set_if_some!(
            self.config.first_deposit_matured_cap,
            config.first_deposit_matured_cap
        );

        self.config.validate()?;

        Ok(())
    }

    pub fn deposit_spl_transfer<'b: 'c, 'c: 'b>(
        &self,
        amount: u64,
        accounts: Transfer<'b>,
        program: AccountInfo<'c>,
    ) -> TempoResult {
        // Only deposits to the group's liquidity vault are allowed.
        check!(
            accounts.to.key.eq(&self.liquidity_vault),
            TempoError::InvalidTransfer
        );

        debug!(
            "deposit_spl_transfer: amount: {} from {} to {}, auth {}",
            amount, accounts.from.key, accounts.to.key, accounts.authority.key
        );

        transfer(CpiContext::new(program, accounts), amount)
    }

    pub fn withdraw_spl_transfer<'b: 'c, 'c: 'b>(
        &self,
        amount: u64,
        accounts: Transfer<'b>,
        program: AccountInfo<'c>,
        signer_seeds: &[&[&[u8]]],
    ) -> TempoResult {
        // Only withdraws from the group's liquidity vault are allowed.
        check!(
            accounts.from.key.eq(&self.liquidity_vault),
            TempoError::InvalidTransfer
        );

        debug!(
            "withdraw_spl_transfer: amount: {} from {} to {}, auth {}",
            amount, accounts.from.key, accounts.to.key, accounts.authority.key
        );

        transfer(
            CpiContext::new_with_signer(program, accounts, signer_seeds),
            amount,
        )
    }
}

assert_struct_size!(GroupConfig, 96);
#[zero_copy]
#[repr(C)]
#[cfg_attr(
    any(feature = "test", feature = "client"),
    derive(PartialEq, Eq, TypeLayout)
)]
#[derive(Debug, AnchorDeserialize, AnchorSerialize)]
pub struct GroupConfig {
    /// Seconds for a pending deposit to accrue full maturity weight.
    pub recovery_window: i64,
    /// Deposit timestamps are rounded down to a multiple of this interval;
    /// deposits in the same interval merge into one queue entry.
    pub bucket_interval: i64,
    /// Seconds for an idle account's bandwidth capacity to replenish fully.
    pub bandwidth_recovery_window: i64,
    /// Admission cost of one transaction at `load_ratio == 1`.
    pub base_tx_cost: u64,
    /// Virtual stake added to the capacity ceiling of every account.
    pub floor_boost: u64,
    /// Balance that can never be withdrawn.
    pub minimum_reserved_balance: u64,
    /// Portion of the account-opening deposit granted full weight immediately.
    pub first_deposit_matured_cap: u64,

    pub _padding: [u64; 5],
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            recovery_window: RECOVERY_WINDOW_DEFAULT,
            bucket_interval: BUCKET_INTERVAL_DEFAULT,
            bandwidth_recovery_window: BANDWIDTH_RECOVERY_WINDOW_DEFAULT,
            base_tx_cost: BASE_TX_COST_DEFAULT,
            floor_boost: FLOOR_BOOST_DEFAULT,
            minimum_reserved_balance: MINIMUM_RESERVED_BALANCE_DEFAULT,
            first_deposit_matured_cap: FIRST_DEPOSIT_MATURED_CAP_DEFAULT,
            _padding: [0; 5],
        }
    }
}

impl GroupConfig {
    pub fn validate(&self) -> TempoResult {
        check!(self.bucket_interval > 0, TempoError::InvalidConfig);
        check!(
            self.recovery_window >= self.bucket_interval,
            TempoError::InvalidConfig
        );
        // The pending entry array must be able to hold every live bucket of
        // one full recovery window, plus slack for back-dated credits.
        check!(
            self.recovery_window / self.bucket_interval + PENDING_ENTRIES_SLACK
                <= MAX_PENDING_ENTRIES as i64,
            TempoError::InvalidConfig
        );
        check!(
            self.bandwidth_recovery_window > 0,
            TempoError::InvalidConfig
        );
        check!(self.base_tx_cost > 0, TempoError::InvalidConfig);

        Ok(())
    }
}

/// Compact form of [`GroupConfig`] used as an instruction argument.
#[derive(Debug, AnchorDeserialize, AnchorSerialize)]
pub struct GroupConfigCompact {
    pub recovery_window: i64,
    pub bucket_interval: i64,
    pub bandwidth_recovery_window: i64,
    pub base_tx_cost: u64,
    pub floor_boost: u64,
    pub minimum_reserved_balance: u64,
    pub first_deposit_matured_cap: u64,
}

impl From<GroupConfigCompact> for GroupConfig {
    fn from(config: GroupConfigCompact) -> Self {
        Self {
            recovery_window: config.recovery_window,
            bucket_interval: config.bucket_interval,
            bandwidth_recovery_window: config.bandwidth_recovery_window,
            base_tx_cost: config.base_tx_cost,
            floor_boost: config.floor_boost,
            minimum_reserved_balance: config.minimum_reserved_balance,
            first_deposit_matured_cap: config.first_deposit_matured_cap,
            _padding: [0; 5],
        }
    }
}

#[derive(Debug, Default, AnchorDeserialize, AnchorSerialize)]
pub struct GroupConfigOpt {
    pub recovery_window: Option<i64>,
    pub bucket_interval: Option<i64>,
    pub bandwidth_recovery_window: Option<i64>,
    pub base_tx_cost: Option<u64>,
    pub floor_boost: Option<u64>,
    pub minimum_reserved_balance: Option<u64>,
    pub first_deposit_matured_cap: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum GroupVaultType {
    Liquidity,
}

impl GroupVaultType {
    pub fn get_seed(self) -> &'static [u8] {
        match self {
            GroupVaultType::Liquidity => LIQUIDITY_VAULT_SEED.as_bytes(),
        }
    }

    pub fn get_authority_seed(self) -> &'static [u8] {
        match self {
            GroupVaultType::Liquidity => LIQUIDITY_VAULT_AUTHORITY_SEED.as_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn default_config_is_valid() {
        GroupConfig::default().validate().unwrap();
    }

    #[test]
    fn config_rejects_oversized_bucket_span() {
        let config = GroupConfig {
            recovery_window: 7 * 24 * 60 * 60,
            // 504 live buckets, far beyond the entry array.
            bucket_interval: 20 * 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_window_below_interval() {
        let config = GroupConfig {
            recovery_window: 60,
            bucket_interval: 3600,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn configure_applies_partial_update() {
        let mut group = TempoGroup::zeroed();
        group.config = GroupConfig::default();

        group
            .configure(&GroupConfigOpt {
                floor_boost: Some(5),
                minimum_reserved_balance: Some(1_000),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(group.config.floor_boost, 5);
        assert_eq!(group.config.minimum_reserved_balance, 1_000);
        // Untouched fields keep their defaults.
        assert_eq!(group.config.recovery_window, RECOVERY_WINDOW_DEFAULT);
    }

    #[test]
    fn configure_rejects_invalid_update() {
        let mut group = TempoGroup::zeroed();
        group.config = GroupConfig::default();

        assert!(group
            .configure(&GroupConfigOpt {
                bucket_interval: Some(0),
                ..Default::default()
            })
            .is_err());
    }
}
