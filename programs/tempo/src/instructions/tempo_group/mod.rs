mod configure;
mod initialize;
mod set_account_flag;

pub use configure::*;
pub use initialize::*;
pub use set_account_flag::*;
