use anchor_lang::prelude::*;
use fixed::types::I80F48;
#[cfg(any(feature = "test", feature = "client"))]
use type_layout::TypeLayout;

use crate::{
    assert_struct_align, assert_struct_size, check,
    constants::{MAX_PENDING_ENTRIES, WEIGHT_DUST_TOLERANCE},
    math_error,
    prelude::{TempoError, TempoResult},
    state::{
        tempo_account::AccountBank,
        tempo_group::{GroupConfig, WrappedI80F48},
    },
};

/// Round `ts` down to the start of its bucket interval.
///
/// All deposits inside one interval collapse into a single queue entry, which
/// bounds queue growth under high transaction volume and keeps decay
/// resolution deterministic across re-execution.
pub fn bucket_timestamp(ts: i64, interval: i64) -> i64 {
    ts / interval * interval
}

assert_struct_size!(PendingDeposit, 24);
#[zero_copy]
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub struct PendingDeposit {
    /// Bucketed arrival time.
    pub start_time: i64,
    /// `start_time + recovery_window`, the moment this deposit reaches full
    /// weight.
    pub end_time: i64,
    pub amount: u64,
}

assert_struct_size!(PendingQueue, 2384);
assert_struct_align!(PendingQueue, 8);
#[zero_copy]
#[repr(C)]
#[cfg_attr(any(feature = "test", feature = "client"), derive(TypeLayout))]
pub struct PendingQueue {
    /// Live entries are `entries[..entries_count]`, sorted by `start_time`
    /// ascending with unique start times.
    pub entries: [PendingDeposit; MAX_PENDING_ENTRIES], // 24 * 96 = 2304
    pub entries_count: u64,
    /// Cached sum of all live entries' amounts.
    pub total_pending: u64,
    /// Cached incremental sum of each entry's weight as of `last_updated_at`.
    pub total_accrued_weight: WrappedI80F48,
    /// Bucketed timestamp of the last recompute.
    pub last_updated_at: i64,
    /// Number of arithmetic edge cases that had to be clamped back into
    /// range. Never fatal, surfaced through events for offline inspection.
    pub anomaly_count: u64,
    pub _padding: [u64; 4],
}

impl PendingQueue {
    pub fn is_empty(&self) -> bool {
        self.entries_count == 0
    }

    pub fn entries(&self) -> &[PendingDeposit] {
        &self.entries[..self.entries_count as usize]
    }

    pub fn total_accrued(&self) -> I80F48 {
        self.total_accrued_weight.into()
    }

    /// Weight ratio `entry` had accrued as of `last_updated_at`, in `[0, 1]`.
    fn accrued_ratio(&self, entry: &PendingDeposit, config: &GroupConfig) -> TempoResult<I80F48> {
        let elapsed = self.last_updated_at.saturating_sub(entry.start_time);
        let ratio = I80F48::from_num(elapsed)
            .checked_div(I80F48::from_num(config.recovery_window))
            .ok_or_else(math_error!())?;

        Ok(ratio.clamp(I80F48::ZERO, I80F48::ONE))
    }

    /// Bring the queue up to date at `now`.
    ///
    /// Matured head entries are folded into `bank.matured_weight`, then the
    /// remaining unmatured weight advances linearly: every pending entry's
    /// weight ratio is linear in time, so the accrual rate over a set of
    /// entries that do not mature in this step is `total_pending /
    /// recovery_window`, independent of each entry's individual age. This is
    /// what keeps a recompute O(matured entries removed) instead of O(queue).
    ///
    /// Idempotent: a recompute at the same or an earlier bucket is a no-op.
    pub fn refresh(
        &mut self,
        bank: &mut AccountBank,
        now: i64,
        config: &GroupConfig,
    ) -> TempoResult {
        let slot = bucket_timestamp(now, config.bucket_interval);
        if slot <= self.last_updated_at {
            return Ok(());
        }

        while !self.is_empty() && self.entries[0].end_time <= slot {
            let matured = self.entries[0];
            let ratio = self.accrued_ratio(&matured, config)?;

            // Remove the weight this entry had already contributed to the
            // running sum; its full amount moves to the matured balance.
            let contributed = ratio
                .checked_mul(I80F48::from_num(matured.amount))
                .ok_or_else(math_error!())?;
            self.sub_accrued_weight(contributed);

            bank.matured_weight = bank
                .matured_weight
                .checked_add(matured.amount)
                .ok_or_else(math_error!())?;
            self.sub_total_pending(matured.amount);
            self.remove_entry(0);
        }

        if self.is_empty() {
            self.total_pending = 0;
            self.total_accrued_weight = I80F48::ZERO.into();
        } else {
            // Exact linear advance for every entry surviving this step.
            let advance = I80F48::from_num(self.total_pending)
                .checked_mul(I80F48::from_num(slot - self.last_updated_at))
                .ok_or_else(math_error!())?
                .checked_div(I80F48::from_num(config.recovery_window))
                .ok_or_else(math_error!())?;
            let accrued: I80F48 = self.total_accrued_weight.into();
            self.total_accrued_weight = accrued
                .checked_add(advance)
                .ok_or_else(math_error!())?
                .into();
            self.clamp_accrued_to_pending();
        }

        self.last_updated_at = slot;

        Ok(())
    }

    /// Record `amount` arriving at `at`, observed at block time `now`.
    ///
    /// Ordinary deposits pass `at == now`; scheduled credits settle with a
    /// back-dated `at`, in which case the entry's already-elapsed weight is
    /// added to the running sum so later subtraction stays exact.
    pub fn push(
        &mut self,
        bank: &mut AccountBank,
        amount: u64,
        at: i64,
        now: i64,
        config: &GroupConfig,
    ) -> TempoResult {
        self.refresh(bank, now, config)?;

        let start_time = bucket_timestamp(at, config.bucket_interval);
        let end_time = start_time
            .checked_add(config.recovery_window)
            .ok_or_else(math_error!())?;

        // A credit settled a full recovery window late matures on the spot.
        if end_time <= self.last_updated_at {
            bank.matured_weight = bank
                .matured_weight
                .checked_add(amount)
                .ok_or_else(math_error!())?;
            return Ok(());
        }

        let count = self.entries_count as usize;
        // Find the insertion point scanning from the tail; deposits arrive in
        // chronological order so this terminates immediately in practice.
        let mut idx = count;
        while idx > 0 && self.entries[idx - 1].start_time > start_time {
            idx -= 1;
        }

        if idx > 0 && self.entries[idx - 1].start_time == start_time {
            self.entries[idx - 1].amount = self.entries[idx - 1]
                .amount
                .checked_add(amount)
                .ok_or_else(math_error!())?;
        } else {
            check!(count < MAX_PENDING_ENTRIES, TempoError::PendingQueueFull);
            self.entries.copy_within(idx..count, idx + 1);
            self.entries[idx] = PendingDeposit {
                start_time,
                end_time,
                amount,
            };
            self.entries_count += 1;
        }

        self.total_pending = self
            .total_pending
            .checked_add(amount)
            .ok_or_else(math_error!())?;

        // Weight the new entry has already accrued as of the last recompute.
        let entry = PendingDeposit {
            start_time,
            end_time,
            amount,
        };
        let ratio = self.accrued_ratio(&entry, config)?;
        if ratio > I80F48::ZERO {
            let accrued: I80F48 = self.total_accrued_weight.into();
            let elapsed = ratio
                .checked_mul(I80F48::from_num(amount))
                .ok_or_else(math_error!())?;
            self.total_accrued_weight = accrued
                .checked_add(elapsed)
                .ok_or_else(math_error!())?
                .into();
            self.clamp_accrued_to_pending();
        }

        Ok(())
    }

    /// Consume up to `amount` from the newest (least mature) entry.
    /// Returns the principal consumed and the accrued weight removed with it.
    pub fn consume_newest(
        &mut self,
        amount: u64,
        config: &GroupConfig,
    ) -> TempoResult<(u64, I80F48)> {
        let idx = (self.entries_count as usize)
            .checked_sub(1)
            .ok_or_else(math_error!())?;
        self.consume_entry_at(idx, amount, config)
    }

    /// Consume up to `amount` from the oldest (closest to maturity) entry.
    /// Returns the principal consumed and the accrued weight removed with it.
    pub fn consume_oldest(
        &mut self,
        amount: u64,
        config: &GroupConfig,
    ) -> TempoResult<(u64, I80F48)> {
        check!(!self.is_empty(), TempoError::MathError);
        self.consume_entry_at(0, amount, config)
    }

    /// Shared reduction/removal primitive behind both withdrawal strategies.
    /// Keeps the running weighted-sum invariant in one place.
    fn consume_entry_at(
        &mut self,
        idx: usize,
        amount: u64,
        config: &GroupConfig,
    ) -> TempoResult<(u64, I80F48)> {
        let entry = self.entries[idx];
        let ratio = self.accrued_ratio(&entry, config)?;

        let consumed = amount.min(entry.amount);
        let weight_removed = ratio
            .checked_mul(I80F48::from_num(consumed))
            .ok_or_else(math_error!())?;

        self.sub_accrued_weight(weight_removed);
        self.sub_total_pending(consumed);

        if consumed == entry.amount {
            self.remove_entry(idx);
            if self.is_empty() {
                // Truncation residue must not outlive the queue.
                self.total_accrued_weight = I80F48::ZERO.into();
                self.total_pending = 0;
            }
        } else {
            self.entries[idx].amount = entry
                .amount
                .checked_sub(consumed)
                .ok_or_else(math_error!())?;
        }

        Ok((consumed, weight_removed))
    }

    fn remove_entry(&mut self, idx: usize) {
        let count = self.entries_count as usize;
        self.entries.copy_within(idx + 1..count, idx);
        self.entries[count - 1] = PendingDeposit {
            start_time: 0,
            end_time: 0,
            amount: 0,
        };
        self.entries_count -= 1;
    }

    /// Subtract from the accrued weight, clamping residual underflow to zero.
    /// Truncation dust is discarded silently; a larger negative result means
    /// cached aggregates drifted, which is reported as an anomaly, never a
    /// failed instruction.
    fn sub_accrued_weight(&mut self, delta: I80F48) {
        let accrued: I80F48 = self.total_accrued_weight.into();
        let next = accrued.saturating_sub(delta);
        if next < I80F48::ZERO {
            if next < -WEIGHT_DUST_TOLERANCE {
                msg!("accrued weight underflow clamped: {} - {}", accrued, delta);
                self.anomaly_count += 1;
            }
            self.total_accrued_weight = I80F48::ZERO.into();
        } else {
            self.total_accrued_weight = next.into();
        }
    }

    fn sub_total_pending(&mut self, delta: u64) {
        match self.total_pending.checked_sub(delta) {
            Some(next) => self.total_pending = next,
            None => {
                msg!(
                    "pending amount underflow clamped: {} - {}",
                    self.total_pending,
                    delta
                );
                self.anomaly_count += 1;
                self.total_pending = 0;
            }
        }
    }

    fn clamp_accrued_to_pending(&mut self) {
        let accrued: I80F48 = self.total_accrued_weight.into();
        let pending = I80F48::from_num(self.total_pending);
        if accrued > pending {
            if accrued > pending + WEIGHT_DUST_TOLERANCE {
                msg!(
                    "accrued weight above pending clamped: {} > {}",
                    accrued,
                    pending
                );
                self.anomaly_count += 1;
            }
            self.total_accrued_weight = pending.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_eq_with_tolerance;
    use bytemuck::Zeroable;
    use fixed_macro::types::I80F48;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const WINDOW: i64 = 7 * 24 * 60 * 60;
    const INTERVAL: i64 = 2 * 60 * 60;

    fn config() -> GroupConfig {
        GroupConfig::default()
    }

    fn setup() -> (PendingQueue, AccountBank) {
        (PendingQueue::zeroed(), AccountBank::zeroed())
    }

    #[test_case(0, 3600, 0)]
    #[test_case(3599, 3600, 0)]
    #[test_case(3600, 3600, 3600)]
    #[test_case(10_000, 3600, 7200)]
    #[test_case(604_800, 1200, 604_800)]
    fn bucket_rounds_down(ts: i64, interval: i64, expected: i64) {
        assert_eq!(bucket_timestamp(ts, interval), expected);
    }

    #[test]
    fn deposits_in_same_bucket_merge() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        queue.push(&mut bank, 5, t0, t0, &cfg).unwrap();
        queue.push(&mut bank, 7, t0 + INTERVAL - 1, t0 + INTERVAL - 1, &cfg).unwrap();

        assert_eq!(queue.entries_count, 1);
        assert_eq!(queue.entries[0].amount, 12);
        assert_eq!(queue.total_pending, 12);
    }

    #[test]
    fn deposits_in_distinct_buckets_stay_separate() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        queue.push(&mut bank, 5, t0, t0, &cfg).unwrap();
        queue.push(&mut bank, 7, t0 + INTERVAL, t0 + INTERVAL, &cfg).unwrap();

        assert_eq!(queue.entries_count, 2);
        assert_eq!(queue.entries[0].amount, 5);
        assert_eq!(queue.entries[1].amount, 7);
        assert_eq!(queue.total_pending, 12);
    }

    /// A single deposit of `A` accrues `A/2` after half the recovery window
    /// and folds into the matured balance after the full window.
    #[test]
    fn linear_accrual_over_recovery_window() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;
        let amount = 1_000_000u64;

        queue.push(&mut bank, amount, t0, t0, &cfg).unwrap();

        queue.refresh(&mut bank, t0 + WINDOW / 2, &cfg).unwrap();
        assert_eq_with_tolerance!(
            queue.total_accrued(),
            I80F48!(500_000),
            I80F48::from_num(amount) * I80F48::from_num(INTERVAL) / I80F48::from_num(WINDOW)
        );
        assert_eq!(bank.matured_weight, 0);

        queue.refresh(&mut bank, t0 + WINDOW, &cfg).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.total_accrued(), I80F48::ZERO);
        assert_eq!(bank.matured_weight, amount);
    }

    /// With no entry maturing between two recomputes, accrued weight moves by
    /// exactly `total_pending * dt / recovery_window` regardless of the age
    /// mix of the entries.
    #[test]
    fn rate_invariant_for_mixed_ages() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        queue.push(&mut bank, 300, t0, t0, &cfg).unwrap();
        queue
            .push(&mut bank, 700, t0 + 4 * INTERVAL, t0 + 4 * INTERVAL, &cfg)
            .unwrap();

        let t1 = t0 + 10 * INTERVAL;
        queue.refresh(&mut bank, t1, &cfg).unwrap();
        let w1 = queue.total_accrued();

        let t2 = t1 + 20 * INTERVAL;
        queue.refresh(&mut bank, t2, &cfg).unwrap();
        let w2 = queue.total_accrued();

        let expected = I80F48::from_num(1_000u64)
            .checked_mul(I80F48::from_num(t2 - t1))
            .unwrap()
            / I80F48::from_num(WINDOW);
        assert_eq!(w2 - w1, expected);
    }

    #[test]
    fn refresh_is_idempotent_at_equal_and_earlier_timestamps() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        queue.push(&mut bank, 1_000, t0, t0, &cfg).unwrap();
        let t1 = t0 + 5 * INTERVAL;
        queue.refresh(&mut bank, t1, &cfg).unwrap();
        let snapshot = queue.total_accrued();

        // Same slot, same slot + sub-interval offset, and an earlier slot
        // must all leave the accrued weight untouched.
        queue.refresh(&mut bank, t1, &cfg).unwrap();
        queue.refresh(&mut bank, t1 + INTERVAL - 1, &cfg).unwrap();
        queue.refresh(&mut bank, t1 - 3 * INTERVAL, &cfg).unwrap();

        assert_eq!(queue.total_accrued(), snapshot);
        assert_eq!(queue.last_updated_at, t1);
    }

    #[test]
    fn accrued_weight_is_monotonic_in_time() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        queue.push(&mut bank, 123, t0, t0, &cfg).unwrap();
        queue
            .push(&mut bank, 77_000, t0 + 2 * INTERVAL, t0 + 2 * INTERVAL, &cfg)
            .unwrap();

        let mut last = I80F48::ZERO;
        for step in 1..100 {
            let now = t0 + step * INTERVAL;
            queue.refresh(&mut bank, now, &cfg).unwrap();
            let maturity =
                I80F48::from_num(bank.matured_weight) + queue.total_accrued();
            assert!(
                maturity >= last,
                "maturity decreased at step {}: {} < {}",
                step,
                maturity,
                last
            );
            last = maturity;
        }
        assert_eq!(bank.matured_weight, 77_123);
    }

    /// A back-dated push (scheduled credit settled late) must enter the sum
    /// with its already-elapsed weight so the later maturation subtraction
    /// balances out exactly.
    #[test]
    fn back_dated_push_accrues_elapsed_weight() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        // Bring the queue clock forward with an unrelated deposit.
        queue.push(&mut bank, 50, t0, t0, &cfg).unwrap();
        let now = t0 + 6 * INTERVAL;
        queue.refresh(&mut bank, now, &cfg).unwrap();

        // Credit unlocked two intervals ago, settled only now.
        let unlock_at = t0 + 4 * INTERVAL;
        queue.push(&mut bank, 1_000, unlock_at, now, &cfg).unwrap();

        let expected = I80F48::from_num(50u64)
            .checked_mul(I80F48::from_num(6 * INTERVAL))
            .unwrap()
            / I80F48::from_num(WINDOW)
            + I80F48::from_num(1_000u64)
                .checked_mul(I80F48::from_num(2 * INTERVAL))
                .unwrap()
                / I80F48::from_num(WINDOW);
        assert_eq_with_tolerance!(queue.total_accrued(), expected, I80F48!(0.000001));

        // Maturation of both entries returns the full principal with no
        // clamped residue.
        queue
            .refresh(&mut bank, t0 + WINDOW + 4 * INTERVAL, &cfg)
            .unwrap();
        assert!(queue.is_empty());
        assert_eq!(bank.matured_weight, 1_050);
        assert_eq!(queue.total_accrued(), I80F48::ZERO);
        assert_eq!(queue.anomaly_count, 0);
    }

    #[test]
    fn push_settled_a_full_window_late_matures_immediately() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;
        let now = t0 + WINDOW + 10 * INTERVAL;

        queue.refresh(&mut bank, now, &cfg).unwrap();
        queue.push(&mut bank, 400, t0, now, &cfg).unwrap();

        assert!(queue.is_empty());
        assert_eq!(bank.matured_weight, 400);
    }

    #[test]
    fn push_rejects_when_entry_slots_exhausted() {
        let (mut queue, mut bank) = setup();
        let cfg = config();

        for i in 0..MAX_PENDING_ENTRIES as i64 {
            // Refresh at a fixed early time so nothing matures between pushes.
            queue.push(&mut bank, 1, i * INTERVAL, 0, &cfg).unwrap();
        }
        let overflow = queue.push(
            &mut bank,
            1,
            MAX_PENDING_ENTRIES as i64 * INTERVAL,
            0,
            &cfg,
        );
        assert!(overflow.is_err());
    }

    #[test]
    fn consume_newest_trims_the_tail() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        queue.push(&mut bank, 10, t0, t0, &cfg).unwrap();
        queue
            .push(&mut bank, 10, t0 + INTERVAL, t0 + INTERVAL, &cfg)
            .unwrap();

        let (consumed, _) = queue.consume_newest(4, &cfg).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(queue.entries_count, 2);
        assert_eq!(queue.entries[1].amount, 6);

        let (consumed, _) = queue.consume_newest(6, &cfg).unwrap();
        assert_eq!(consumed, 6);
        assert_eq!(queue.entries_count, 1);
        assert_eq!(queue.entries[0].amount, 10);
        assert_eq!(queue.total_pending, 10);
    }

    #[test]
    fn underflow_is_clamped_and_counted() {
        let (mut queue, mut bank) = setup();
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        queue.push(&mut bank, 1_000, t0, t0, &cfg).unwrap();
        queue.refresh(&mut bank, t0 + 10 * INTERVAL, &cfg).unwrap();

        // Simulate cached-aggregate drift, then retire the entry.
        queue.total_accrued_weight = I80F48!(0.5).into();
        queue.refresh(&mut bank, t0 + WINDOW, &cfg).unwrap();

        assert_eq!(queue.total_accrued(), I80F48::ZERO);
        assert_eq!(queue.anomaly_count, 1);
        assert_eq!(bank.matured_weight, 1_000);
    }
}
