//! Subcommand implementations

pub mod bind;
pub mod call;
pub mod inspect;
pub mod resolve;
