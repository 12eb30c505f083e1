//! overmod - ephemeral Go workspaces with per-file dependency overrides
//!
//! This crate provisions a throwaway module workspace in which selected
//! files of dependency modules are replaced, without touching the module
//! cache or the caller's project. Building inside the workspace then sees
//! the overridden files in place of the originals.

pub mod core;
pub mod ops;
pub mod toolchain;
pub mod util;

/// Test utilities for unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides an in-process toolchain and module fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{manifest::Manifest, override_item::OverrideItem, workspace::Workspace};
pub use ops::{create_environment, create_environment_with_go, Environment, ProvisionError};
pub use toolchain::{GoToolchain, Toolchain};
pub use util::context::Context;
pub use util::errors::Error;
