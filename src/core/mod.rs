//! Core data structures.
//!
//! This module contains the foundational types used throughout overmod:
//! - Package references and how they are classified
//! - The module manifest model
//! - File overrides
//! - The ephemeral workspace

pub mod manifest;
pub mod override_item;
pub mod reference;
pub mod workspace;

pub use manifest::Manifest;
pub use override_item::OverrideItem;
pub use reference::PackageReference;
pub use workspace::{BaseManifest, Workspace, LOCKFILE_NAME, MANIFEST_NAME};
