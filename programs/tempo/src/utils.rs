use crate::{group_authority_seed, group_seed, state::tempo_group::GroupVaultType};
use anchor_lang::prelude::*;

pub fn find_group_vault_pda(group_pk: &Pubkey, vault_type: GroupVaultType) -> (Pubkey, u8) {
    Pubkey::find_program_address(group_seed!(vault_type, group_pk), &crate::id())
}

pub fn find_group_vault_authority_pda(
    group_pk: &Pubkey,
    vault_type: GroupVaultType,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(group_authority_seed!(vault_type, group_pk), &crate::id())
}

#[macro_export]
macro_rules! assert_eq_with_tolerance {
    ($test_val:expr, $val:expr, $tolerance:expr) => {
        assert!(
            ($test_val - $val).abs() <= $tolerance,
            "assertion failed: `({} - {}) <= {}`",
            $test_val,
            $val,
            $tolerance
        );
    };
}
