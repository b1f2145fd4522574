//! Basic shared types: errors and the crate-wide `Result` alias.

pub mod error;

pub use error::{Error, Result};
