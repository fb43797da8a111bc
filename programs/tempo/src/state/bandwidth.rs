use anchor_lang::prelude::*;
use fixed::types::I80F48;
#[cfg(any(feature = "test", feature = "client"))]
use type_layout::TypeLayout;

use crate::{
    assert_struct_align, assert_struct_size, check, debug, math_error,
    prelude::{TempoError, TempoResult},
    state::tempo_group::{GroupConfig, WrappedI80F48},
};

/// Outcome of an admission check. A denial is a normal result signaling
/// "retry later", never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted,
    Denied,
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admitted)
    }
}

assert_struct_size!(BandwidthState, 64);
assert_struct_align!(BandwidthState, 8);
#[zero_copy]
#[repr(C)]
#[cfg_attr(any(feature = "test", feature = "client"), derive(TypeLayout))]
pub struct BandwidthState {
    /// Current token-bucket level, amount-denominated.
    pub capacity: WrappedI80F48,
    /// Timestamp of the last successful admission.
    pub last_activity_at: i64,
    pub admitted_count: u64,
    pub denied_count: u64,
    pub _padding: [u64; 3],
}

impl BandwidthState {
    pub fn initialize(&mut self, initial_capacity: u64, now: i64) {
        self.capacity = I80F48::from_num(initial_capacity).into();
        self.last_activity_at = now;
    }

    /// Admission check for one transaction.
    ///
    /// The capacity ceiling is `maturity + floor_boost`, so even zero-stake
    /// accounts keep minimal throughput. Capacity catches up toward the
    /// ceiling proportionally to idle time, reaching it exactly after
    /// `bandwidth_recovery_window` seconds, never overshooting. The cost of
    /// one transaction scales with the congestion signal supplied by the
    /// dispatcher.
    ///
    /// The recovery update persists whether or not the transaction is
    /// admitted; `last_activity_at` moves only on admission.
    pub fn try_admit(
        &mut self,
        maturity: I80F48,
        now: i64,
        load_ratio: I80F48,
        config: &GroupConfig,
    ) -> TempoResult<AdmissionDecision> {
        check!(
            load_ratio >= I80F48::ZERO,
            TempoError::InvalidNetworkLoadRatio
        );

        let max_capacity = maturity
            .checked_add(I80F48::from_num(config.floor_boost))
            .ok_or_else(math_error!())?;

        let mut capacity: I80F48 = self.capacity.into();
        if capacity >= max_capacity {
            // Matured weight decreased since the last check, e.g. after a
            // withdrawal.
            capacity = max_capacity;
        } else {
            let elapsed = now.saturating_sub(self.last_activity_at);
            let elapsed_ratio = I80F48::from_num(elapsed)
                .checked_div(I80F48::from_num(config.bandwidth_recovery_window))
                .ok_or_else(math_error!())?
                .clamp(I80F48::ZERO, I80F48::ONE);
            let headroom = max_capacity
                .checked_sub(capacity)
                .ok_or_else(math_error!())?;
            capacity = capacity
                .checked_add(
                    headroom
                        .checked_mul(elapsed_ratio)
                        .ok_or_else(math_error!())?,
                )
                .ok_or_else(math_error!())?;
        }
        self.capacity = capacity.into();

        let cost = I80F48::from_num(config.base_tx_cost)
            .checked_mul(load_ratio)
            .ok_or_else(math_error!())?;

        if capacity < cost {
            debug!("admission denied: capacity {} < cost {}", capacity, cost);
            self.denied_count += 1;
            return Ok(AdmissionDecision::Denied);
        }

        self.capacity = capacity
            .checked_sub(cost)
            .ok_or_else(math_error!())?
            .into();
        self.last_activity_at = now;
        self.admitted_count += 1;

        Ok(AdmissionDecision::Admitted)
    }

    /// Per-transaction admission cost at the given congestion level.
    pub fn transaction_cost(load_ratio: I80F48, config: &GroupConfig) -> TempoResult<I80F48> {
        Ok(I80F48::from_num(config.base_tx_cost)
            .checked_mul(load_ratio)
            .ok_or_else(math_error!())?)
    }
}
