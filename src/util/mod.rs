//! Shared utilities

pub mod config;
pub mod context;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;

pub use config::Config;
pub use context::Context;
pub use errors::{Error, Result};
