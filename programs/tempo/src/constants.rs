use fixed::types::I80F48;
use fixed_macro::types::I80F48;

pub const LIQUIDITY_VAULT_AUTHORITY_SEED: &str = "liquidity_vault_auth";
pub const LIQUIDITY_VAULT_SEED: &str = "liquidity_vault";

/// Truncation residue this small is discarded silently when cached weight
/// aggregates are rebalanced; anything larger is a genuine inconsistency and
/// is clamped and counted.
pub const WEIGHT_DUST_TOLERANCE: I80F48 = I80F48!(0.000001);

/// Seconds for a pending deposit to reach full maturity weight.
pub const RECOVERY_WINDOW_DEFAULT: i64 = 7 * 24 * 60 * 60;

/// Deposits landing in the same interval are merged into one queue entry.
pub const BUCKET_INTERVAL_DEFAULT: i64 = 2 * 60 * 60;

/// Seconds for an idle account's bandwidth capacity to fully replenish.
pub const BANDWIDTH_RECOVERY_WINDOW_DEFAULT: i64 = 24 * 60 * 60;

/// Admission cost of one transaction at `load_ratio == 1`, in native units.
pub const BASE_TX_COST_DEFAULT: u64 = 1_000_000;

/// Virtual stake added to every account's capacity ceiling so zero-stake
/// accounts keep minimal throughput.
pub const FLOOR_BOOST_DEFAULT: u64 = 1_000_000;

pub const MINIMUM_RESERVED_BALANCE_DEFAULT: u64 = 0;

/// Portion of the account-opening deposit granted full maturity weight
/// immediately.
pub const FIRST_DEPOSIT_MATURED_CAP_DEFAULT: u64 = 100_000_000;

/// Capacity of the fixed pending deposit array. Config validation keeps
/// `recovery_window / bucket_interval` comfortably below this.
pub const MAX_PENDING_ENTRIES: usize = 96;

/// Entry slots that must remain free after the worst-case live bucket span.
pub const PENDING_ENTRIES_SLACK: i64 = 8;

pub const MAX_SCHEDULED_CREDITS: usize = 8;
