//! Shared domain types for the Raidscope project.

pub mod config;
pub mod events;
pub mod observation;
pub mod row;
pub mod speed;
pub mod time_codec;
pub mod units;

mod errors;

pub use errors::{RaidscopeError, Result};
