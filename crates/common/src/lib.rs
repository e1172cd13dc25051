//! Shared constants and helpers used across shadowmount crates.

pub mod constants;
pub mod filetime;

pub use constants::*;
pub use filetime::{filetime_to_utc, utc_to_filetime};
