//! High-level operations.
//!
//! [`create_environment`] drives the others: the manifest is built first,
//! then every override materializes its package (once) and is written into
//! the private tree, with redirects injected along the way.

pub mod create_environment;
pub mod manifest_builder;
pub mod materialize;
pub mod overlay;
pub mod redirect;

pub use create_environment::{
    create_environment, create_environment_with_go, Environment, ProvisionError,
};
pub use manifest_builder::build as build_manifest;
pub use materialize::{copy_tree, materialize, CopyStats};
pub use overlay::{apply_override, write_override};
pub use redirect::add_redirect;
