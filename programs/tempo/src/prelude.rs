use anchor_lang::prelude::*;

pub type TempoResult<G = ()> = Result<G>;

pub use crate::{
    errors::TempoError,
    macros::*,
    state::tempo_group::{GroupConfig, TempoGroup},
};
