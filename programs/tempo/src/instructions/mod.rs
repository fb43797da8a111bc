pub mod tempo_account;
pub mod tempo_group;

pub use tempo_account::*;
pub use tempo_group::*;
