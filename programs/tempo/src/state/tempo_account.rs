use anchor_lang::prelude::*;
use fixed::types::I80F48;
#[cfg(any(feature = "test", feature = "client"))]
use type_layout::TypeLayout;

use crate::{
    assert_struct_align, assert_struct_size, check, math_error,
    constants::MAX_SCHEDULED_CREDITS,
    prelude::{TempoError, TempoResult},
    state::{
        bandwidth::BandwidthState,
        pending_queue::PendingQueue,
        tempo_group::GroupConfig,
    },
};

assert_struct_size!(TempoAccount, 3072);
assert_struct_align!(TempoAccount, 8);
#[account(zero_copy)]
#[repr(C)]
#[cfg_attr(any(feature = "test", feature = "client"), derive(TypeLayout))]
pub struct TempoAccount {
    pub group: Pubkey,     // 32
    pub authority: Pubkey, // 32

    pub bank: AccountBank,            // 32
    pub pending: PendingQueue,        // 2384
    pub bandwidth: BandwidthState,    // 64
    pub credits: ScheduledCreditList, // 224

    /// The flags that indicate the state of the account.
    /// This is u64 bitfield, where each bit represents a flag.
    ///
    /// Flags:
    /// - ACCOUNT_DISABLED = 1 << 0 - The account is disabled and blocks
    ///   deposit, withdrawal, and admission.
    pub account_flags: u64, // 8

    pub _padding: [u64; 37], // 8 * 37 = 296
}

pub const ACCOUNT_DISABLED: u64 = 1 << 0;

assert_struct_size!(AccountBank, 32);
#[zero_copy]
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub struct AccountBank {
    /// Spendable balance, in native units.
    pub liquid_balance: u64,
    /// Portion of past deposits that completed the full recovery window and
    /// now counts at full weight. Never exceeds `liquid_balance`.
    pub matured_weight: u64,
    pub total_deposited: u64,
    pub total_withdrawn: u64,
}

assert_struct_size!(ScheduledCredit, 24);
#[zero_copy]
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub struct ScheduledCredit {
    pub amount: u64,
    pub unlock_at: i64,
    pub created_at: i64,
}

assert_struct_size!(ScheduledCreditList, 224);
#[zero_copy]
#[repr(C)]
#[cfg_attr(any(feature = "test", feature = "client"), derive(TypeLayout))]
pub struct ScheduledCreditList {
    /// Live credits are `credits[..credits_count]`, sorted by `unlock_at`
    /// ascending.
    pub credits: [ScheduledCredit; MAX_SCHEDULED_CREDITS], // 24 * 8 = 192
    pub credits_count: u64,
    pub _padding: [u64; 3],
}

impl ScheduledCreditList {
    pub fn is_empty(&self) -> bool {
        self.credits_count == 0
    }

    fn insert(&mut self, credit: ScheduledCredit) -> TempoResult {
        let count = self.credits_count as usize;
        check!(
            count < MAX_SCHEDULED_CREDITS,
            TempoError::ScheduledCreditListFull
        );

        let mut idx = count;
        while idx > 0 && self.credits[idx - 1].unlock_at > credit.unlock_at {
            idx -= 1;
        }
        self.credits.copy_within(idx..count, idx + 1);
        self.credits[idx] = credit;
        self.credits_count += 1;

        Ok(())
    }

    fn pop_due(&mut self, now: i64) -> Option<ScheduledCredit> {
        if self.is_empty() || self.credits[0].unlock_at > now {
            return None;
        }
        let due = self.credits[0];
        let count = self.credits_count as usize;
        self.credits.copy_within(1..count, 0);
        self.credits[count - 1] = ScheduledCredit {
            amount: 0,
            unlock_at: 0,
            created_at: 0,
        };
        self.credits_count -= 1;
        Some(due)
    }
}

/// Which funds a withdrawal consumes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawStrategy {
    /// Consume the most recently deposited, least mature funds first,
    /// preserving matured weight as long as possible. Used for ordinary
    /// withdrawals: a deposit-then-withdraw cycle cannot launder fresh funds
    /// as matured.
    NewestFirst,
    /// Consume matured weight first, then the oldest pending entries,
    /// shedding the highest maturity value per unit withdrawn. Used when a
    /// position is closed out.
    MaturedFirst,
}

impl TempoAccount {
    /// Set the initial data for the tempo account.
    pub fn initialize(&mut self, group: Pubkey, authority: Pubkey) {
        self.group = group;
        self.authority = authority;
    }

    pub fn set_flag(&mut self, flag: u64) {
        msg!("Setting account flag {:b}", flag);
        self.account_flags |= flag;
    }

    pub fn unset_flag(&mut self, flag: u64) {
        msg!("Unsetting account flag {:b}", flag);
        self.account_flags &= !flag;
    }

    pub fn get_flag(&self, flag: u64) -> bool {
        self.account_flags & flag != 0
    }

    /// Credit the account-opening deposit. The portion up to
    /// `first_deposit_matured_cap` is granted full maturity weight
    /// immediately; the remainder decays through the pending queue like any
    /// ordinary deposit. Returns the fully weighted portion.
    pub fn register_deposit(
        &mut self,
        amount: u64,
        now: i64,
        config: &GroupConfig,
    ) -> TempoResult<u64> {
        let matured_portion = amount.min(config.first_deposit_matured_cap);
        self.credit_with_full_weight(matured_portion)?;

        let queued_portion = amount
            .checked_sub(matured_portion)
            .ok_or_else(math_error!())?;
        if queued_portion > 0 {
            self.credit(queued_portion, now, config)?;
        }

        Ok(matured_portion)
    }

    /// Add `amount` to the spendable balance and start its maturity decay.
    pub fn credit(&mut self, amount: u64, now: i64, config: &GroupConfig) -> TempoResult {
        if amount == 0 {
            return Ok(());
        }
        self.bank.liquid_balance = self
            .bank
            .liquid_balance
            .checked_add(amount)
            .ok_or_else(math_error!())?;
        self.bank.total_deposited = self
            .bank
            .total_deposited
            .checked_add(amount)
            .ok_or_else(math_error!())?;
        self.pending.push(&mut self.bank, amount, now, now, config)
    }

    /// Add `amount` to the spendable balance at full maturity weight,
    /// bypassing the decay queue.
    pub fn credit_with_full_weight(&mut self, amount: u64) -> TempoResult {
        if amount == 0 {
            return Ok(());
        }
        self.bank.liquid_balance = self
            .bank
            .liquid_balance
            .checked_add(amount)
            .ok_or_else(math_error!())?;
        self.bank.matured_weight = self
            .bank
            .matured_weight
            .checked_add(amount)
            .ok_or_else(math_error!())?;
        self.bank.total_deposited = self
            .bank
            .total_deposited
            .checked_add(amount)
            .ok_or_else(math_error!())?;
        Ok(())
    }

    /// Settle every scheduled credit that has come due, in chronological
    /// order. Each settled credit enters the pending queue at its unlock
    /// bucket, so a late settlement still accrues from the unlock time.
    ///
    /// Runs at the top of every account-touching operation, which is what
    /// keeps the queue ordered by start time without sorted inserts in the
    /// hot path.
    pub fn settle_due_credits(
        &mut self,
        now: i64,
        config: &GroupConfig,
    ) -> TempoResult<Vec<ScheduledCredit>> {
        let mut settled = vec![];
        while let Some(due) = self.credits.pop_due(now) {
            self.bank.liquid_balance = self
                .bank
                .liquid_balance
                .checked_add(due.amount)
                .ok_or_else(math_error!())?;
            self.bank.total_deposited = self
                .bank
                .total_deposited
                .checked_add(due.amount)
                .ok_or_else(math_error!())?;
            self.pending
                .push(&mut self.bank, due.amount, due.unlock_at, now, config)?;
            settled.push(due);
        }
        Ok(settled)
    }

    /// Register a future credit of `amount` unlocking at `unlock_at`.
    pub fn schedule_credit(&mut self, amount: u64, unlock_at: i64, now: i64) -> TempoResult {
        check!(unlock_at >= now, TempoError::CreditUnlockInPast);
        self.credits.insert(ScheduledCredit {
            amount,
            unlock_at,
            created_at: now,
        })
    }

    /// Effective maturity weight after bringing the queue up to date:
    /// matured balance plus the accrued weight of all pending deposits.
    pub fn current_maturity(&mut self, now: i64, config: &GroupConfig) -> TempoResult<I80F48> {
        self.pending.refresh(&mut self.bank, now, config)?;
        Ok(I80F48::from_num(self.bank.matured_weight)
            .checked_add(self.pending.total_accrued())
            .ok_or_else(math_error!())?)
    }

    /// Remove `amount` of liquidity under the given strategy. Returns the
    /// total maturity weight lost.
    ///
    /// Fails with `InsufficientBalance`, before any mutation, if the amount
    /// would dip into the reserved minimum. Residual decomposition shortfalls
    /// are clamped and reported, never fatal: the balance pre-check is the
    /// authoritative gate.
    pub fn withdraw(
        &mut self,
        amount: u64,
        now: i64,
        strategy: WithdrawStrategy,
        config: &GroupConfig,
    ) -> TempoResult<I80F48> {
        if amount == 0 {
            return Ok(I80F48::ZERO);
        }

        let remaining = self
            .bank
            .liquid_balance
            .checked_sub(amount)
            .ok_or(TempoError::InsufficientBalance)?;
        check!(
            remaining >= config.minimum_reserved_balance,
            TempoError::InsufficientBalance
        );

        self.pending.refresh(&mut self.bank, now, config)?;

        self.bank.liquid_balance = remaining;
        self.bank.total_withdrawn = self
            .bank
            .total_withdrawn
            .checked_add(amount)
            .ok_or_else(math_error!())?;

        let weight_lost = match strategy {
            WithdrawStrategy::NewestFirst => self.consume_newest_first(amount, config)?,
            WithdrawStrategy::MaturedFirst => self.consume_matured_first(amount, config)?,
        };

        Ok(weight_lost)
    }

    fn consume_newest_first(&mut self, amount: u64, config: &GroupConfig) -> TempoResult<I80F48> {
        let mut residual = amount;
        let mut weight_lost = I80F48::ZERO;

        while residual > 0 && !self.pending.is_empty() {
            let (consumed, weight) = self.pending.consume_newest(residual, config)?;
            residual = residual.checked_sub(consumed).ok_or_else(math_error!())?;
            weight_lost = weight_lost
                .checked_add(weight)
                .ok_or_else(math_error!())?;
        }

        // The withdrawal exceeds all pending principal; the rest comes out of
        // the matured balance. By subtraction, never by overwrite.
        if residual > 0 {
            weight_lost = weight_lost
                .checked_add(I80F48::from_num(self.sub_matured_weight(residual)))
                .ok_or_else(math_error!())?;
        }

        Ok(weight_lost)
    }

    fn consume_matured_first(&mut self, amount: u64, config: &GroupConfig) -> TempoResult<I80F48> {
        let matured_consumed = amount.min(self.bank.matured_weight);
        self.bank.matured_weight -= matured_consumed;
        let mut residual = amount
            .checked_sub(matured_consumed)
            .ok_or_else(math_error!())?;
        let mut weight_lost = I80F48::from_num(matured_consumed);

        while residual > 0 && !self.pending.is_empty() {
            let (consumed, weight) = self.pending.consume_oldest(residual, config)?;
            residual = residual.checked_sub(consumed).ok_or_else(math_error!())?;
            weight_lost = weight_lost
                .checked_add(weight)
                .ok_or_else(math_error!())?;
        }

        if residual > 0 {
            // Matured weight and pending principal together should cover any
            // pre-validated withdrawal; a leftover means the cached
            // decomposition drifted.
            msg!("withdrawal residual {} exceeds decomposition", residual);
            self.pending.anomaly_count += 1;
        }

        Ok(weight_lost)
    }

    /// Subtract up to `residual` from the matured balance, clamping at zero.
    /// Returns the amount actually subtracted.
    fn sub_matured_weight(&mut self, residual: u64) -> u64 {
        if self.bank.matured_weight >= residual {
            self.bank.matured_weight -= residual;
            residual
        } else {
            msg!(
                "matured weight underflow clamped: {} - {}",
                self.bank.matured_weight,
                residual
            );
            self.pending.anomaly_count += 1;
            let subtracted = self.bank.matured_weight;
            self.bank.matured_weight = 0;
            subtracted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::pending_queue::bucket_timestamp;
    use bytemuck::Zeroable;
    use fixed_macro::types::I80F48;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const WINDOW: i64 = 7 * 24 * 60 * 60;
    const INTERVAL: i64 = 2 * 60 * 60;

    fn config() -> GroupConfig {
        GroupConfig::default()
    }

    fn principal(account: &TempoAccount) -> u64 {
        account.bank.matured_weight + account.pending.total_pending
    }

    /// Deposit 10 at t0 and 10 half a window later, then withdraw 10 just
    /// after the second deposit. Newest-first removes the second entry and
    /// leaves the first entry's accrued weight intact; matured-first on the
    /// same state consumes the oldest entry instead.
    #[test]
    fn withdrawal_tie_break_between_strategies() {
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;
        let t1 = t0 + WINDOW / 2;

        let mut account = TempoAccount::zeroed();
        account.credit(10, t0, &cfg).unwrap();
        account.credit(10, t1, &cfg).unwrap();
        let mut divested = account;

        let weight_lost = account
            .withdraw(10, t1 + 1, WithdrawStrategy::NewestFirst, &cfg)
            .unwrap();
        assert_eq!(account.pending.entries_count, 1);
        assert_eq!(account.pending.entries[0].start_time, t0);
        assert_eq!(account.pending.entries[0].amount, 10);
        // The second entry was brand new, no weight lost with it.
        assert_eq!(weight_lost, I80F48::ZERO);
        assert_eq!(account.pending.total_accrued(), I80F48!(5));

        let weight_lost = divested
            .withdraw(10, t1 + 1, WithdrawStrategy::MaturedFirst, &cfg)
            .unwrap();
        assert_eq!(divested.pending.entries_count, 1);
        assert_eq!(divested.pending.entries[0].start_time, bucket_timestamp(t1, INTERVAL));
        // The oldest entry had accrued half its amount.
        assert_eq!(weight_lost, I80F48!(5));
        assert_eq!(divested.pending.total_accrued(), I80F48::ZERO);
    }

    #[test]
    fn newest_first_residual_subtracts_from_matured() {
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        let mut account = TempoAccount::zeroed();
        account.credit_with_full_weight(100).unwrap();
        account.credit(50, t0, &cfg).unwrap();

        let weight_lost = account
            .withdraw(120, t0, WithdrawStrategy::NewestFirst, &cfg)
            .unwrap();

        assert_eq!(account.bank.liquid_balance, 30);
        assert!(account.pending.is_empty());
        // 50 fresh units carried no weight; 70 matured units did.
        assert_eq!(weight_lost, I80F48!(70));
        assert_eq!(account.bank.matured_weight, 30);
        assert_eq!(account.pending.anomaly_count, 0);
    }

    #[test]
    fn matured_first_returns_weight_lost() {
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        let mut account = TempoAccount::zeroed();
        account.credit_with_full_weight(100).unwrap();
        account.credit(50, t0, &cfg).unwrap();

        let weight_lost = account
            .withdraw(120, t0, WithdrawStrategy::MaturedFirst, &cfg)
            .unwrap();

        assert_eq!(account.bank.liquid_balance, 30);
        assert_eq!(account.bank.matured_weight, 0);
        // All 100 matured units consumed, plus 20 weightless fresh units.
        assert_eq!(weight_lost, I80F48!(100));
        assert_eq!(account.pending.total_pending, 30);
    }

    #[test]
    fn withdrawal_respects_reserved_minimum() {
        let cfg = GroupConfig {
            minimum_reserved_balance: 100,
            ..config()
        };
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        let mut account = TempoAccount::zeroed();
        account.credit(150, t0, &cfg).unwrap();

        assert!(account
            .withdraw(60, t0, WithdrawStrategy::NewestFirst, &cfg)
            .is_err());
        // Nothing was consumed by the failed attempt.
        assert_eq!(account.bank.liquid_balance, 150);
        assert_eq!(account.pending.total_pending, 150);

        account
            .withdraw(50, t0, WithdrawStrategy::NewestFirst, &cfg)
            .unwrap();
        assert_eq!(account.bank.liquid_balance, 100);
    }

    #[test]
    fn register_deposit_caps_full_weight_portion() {
        let cfg = GroupConfig {
            first_deposit_matured_cap: 1_000,
            ..config()
        };
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        let mut account = TempoAccount::zeroed();
        let matured_portion = account.register_deposit(2_500, t0, &cfg).unwrap();

        assert_eq!(matured_portion, 1_000);
        assert_eq!(account.bank.liquid_balance, 2_500);
        assert_eq!(account.bank.matured_weight, 1_000);
        assert_eq!(account.pending.total_pending, 1_500);

        let maturity = account.current_maturity(t0, &cfg).unwrap();
        assert_eq!(maturity, I80F48!(1_000));
    }

    #[test]
    fn scheduled_credits_settle_in_chronological_order() {
        let cfg = config();
        let t0 = 1_000_000 / INTERVAL * INTERVAL;

        let mut account = TempoAccount::zeroed();
        account.schedule_credit(300, t0 + 5 * INTERVAL, t0).unwrap();
        account.schedule_credit(100, t0 + INTERVAL, t0).unwrap();
        account.schedule_credit(200, t0 + 3 * INTERVAL, t0).unwrap();

        // Nothing due yet.
        let settled = account.settle_due_credits(t0, &cfg).unwrap();
        assert!(settled.is_empty());
        assert_eq!(account.bank.liquid_balance, 0);

        let settled = account.settle_due_credits(t0 + 4 * INTERVAL, &cfg).unwrap();
        assert_eq!(
            settled.iter().map(|c| c.amount).collect::<Vec<_>>(),
            vec![100, 200]
        );
        assert_eq!(account.bank.liquid_balance, 300);
        assert_eq!(account.credits.credits_count, 1);
        // Queue entries carry the unlock buckets, oldest first.
        assert_eq!(account.pending.entries[0].start_time, t0 + INTERVAL);
        assert_eq!(account.pending.entries[1].start_time, t0 + 3 * INTERVAL);
    }

    #[test]
    fn schedule_credit_rejects_past_unlock_and_full_list() {
        let t0 = 1_000_000;

        let mut account = TempoAccount::zeroed();
        assert!(account.schedule_credit(10, t0 - 1, t0).is_err());

        for i in 0..MAX_SCHEDULED_CREDITS as i64 {
            account.schedule_credit(10, t0 + i, t0).unwrap();
        }
        assert!(account.schedule_credit(10, t0 + 100, t0).is_err());
    }

    #[test]
    fn account_flags_toggle() {
        let mut account = TempoAccount::zeroed();
        assert!(!account.get_flag(ACCOUNT_DISABLED));
        account.set_flag(ACCOUNT_DISABLED);
        assert!(account.get_flag(ACCOUNT_DISABLED));
        account.unset_flag(ACCOUNT_DISABLED);
        assert!(!account.get_flag(ACCOUNT_DISABLED));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Deposit(u64),
        WithdrawNewest(u64),
        WithdrawMatured(u64),
        Advance(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..1_000_000).prop_map(Op::Deposit),
            (1u64..1_500_000).prop_map(Op::WithdrawNewest),
            (1u64..1_500_000).prop_map(Op::WithdrawMatured),
            (1i64..20 * INTERVAL).prop_map(Op::Advance),
        ]
    }

    proptest! {
        /// Principal conservation: across arbitrary interleavings of
        /// deposits, withdrawals of both strategies, and time, the spendable
        /// balance always equals matured weight plus pending principal, and
        /// accrued weight never exceeds pending principal.
        #[test]
        fn conservation_holds_for_arbitrary_op_sequences(
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let cfg = config();
            let mut account = TempoAccount::zeroed();
            let mut now = 1_000_000 / INTERVAL * INTERVAL;

            for op in ops {
                match op {
                    Op::Deposit(amount) => account.credit(amount, now, &cfg).unwrap(),
                    Op::WithdrawNewest(amount) => {
                        let _ = account.withdraw(
                            amount, now, WithdrawStrategy::NewestFirst, &cfg);
                    }
                    Op::WithdrawMatured(amount) => {
                        let _ = account.withdraw(
                            amount, now, WithdrawStrategy::MaturedFirst, &cfg);
                    }
                    Op::Advance(dt) => now += dt,
                }

                prop_assert_eq!(
                    account.bank.liquid_balance,
                    principal(&account),
                    "principal decomposition drifted"
                );
                let accrued = account.pending.total_accrued();
                prop_assert!(accrued >= I80F48::ZERO);
                prop_assert!(accrued <= I80F48::from_num(account.pending.total_pending));
            }
        }
    }
}
