use anchor_lang::prelude::*;

#[error_code]
pub enum TempoError {
    #[msg("Math error")] // 6000
    MathError,
    #[msg("Account balance is less than the withdraw amount plus the reserved minimum")] // 6001
    InsufficientBalance,
    #[msg("Pending deposit queue has no free entry slots")] // 6002
    PendingQueueFull,
    #[msg("Scheduled credit list has no free slots")] // 6003
    ScheduledCreditListFull,
    #[msg("Scheduled credit unlock time is in the past")] // 6004
    CreditUnlockInPast,
    #[msg("Invalid group config")] // 6005
    InvalidConfig,
    #[msg("Network load ratio must be non-negative")] // 6006
    InvalidNetworkLoadRatio,
    #[msg("Account disabled")] // 6007
    AccountDisabled,
    #[msg("Unauthorized")] // 6008
    Unauthorized,
    #[msg("Invalid transfer")] // 6009
    InvalidTransfer,
    #[msg("Illegal flag")] // 6010
    IllegalFlag,
}
