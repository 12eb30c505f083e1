//! Provisioning an overlay workspace.
//!
//! This is the entry point of the library: given the caller's build entries
//! and a set of file overrides, it allocates a fresh directory, writes a
//! manifest that resolves everything the caller's own manifest resolves,
//! materializes every overridden package into a private tree with its
//! files replaced, and re-expresses the entries so they can be built from
//! the new directory.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::override_item::{package_dir, OverrideItem};
use crate::core::reference::{is_location, resolve_for_workspace};
use crate::core::workspace::{generate_identity, Workspace};
use crate::ops::manifest_builder;
use crate::ops::overlay::apply_override;
use crate::toolchain::{GoToolchain, Toolchain};
use crate::util::context::Context;
use crate::util::errors::{Error, IoResultExt, Result};
use crate::util::fs::ensure_dir;

/// Prefix of workspace directory names.
pub const WORKSPACE_PREFIX: &str = "overmod-";

/// A provisioned workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Workspace root; the caller owns it and removes it when done.
    pub root: PathBuf,

    /// The caller's entries, re-expressed for use inside `root`
    pub entries: Vec<String>,

    /// Module identity the workspace manifest declares
    pub identity: String,

    /// Materialized packages, by module path
    pub overridden: Vec<String>,
}

/// Provisioning failure.
///
/// `root` is set once the workspace directory exists; it is left on disk
/// for inspection and the caller is responsible for removing it.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ProvisionError {
    pub root: Option<PathBuf>,
    #[source]
    pub source: Error,
}

impl ProvisionError {
    fn before_allocation(source: Error) -> Self {
        ProvisionError { root: None, source }
    }
}

/// Provision a workspace for `entries` with `overrides` applied.
///
/// Empty `entries` mean the caller's working directory (`.`).
pub fn create_environment(
    ctx: &Context,
    toolchain: &dyn Toolchain,
    entries: &[String],
    overrides: &[OverrideItem],
) -> Result<Environment, ProvisionError> {
    validate(overrides).map_err(ProvisionError::before_allocation)?;
    let root = allocate_root(ctx).map_err(ProvisionError::before_allocation)?;

    provision(ctx, toolchain, root.clone(), entries, overrides).map_err(|source| {
        tracing::debug!("provisioning failed, leaving {}", root.display());
        ProvisionError {
            root: Some(root),
            source,
        }
    })
}

/// [`create_environment`] with the `go` toolchain configured in `ctx`.
pub fn create_environment_with_go(
    ctx: &Context,
    entries: &[String],
    overrides: &[OverrideItem],
) -> Result<Environment, ProvisionError> {
    let go = GoToolchain::from_context(ctx);
    create_environment(ctx, &go, entries, overrides)
}

/// Reject malformed overrides before anything touches the disk.
fn validate(overrides: &[OverrideItem]) -> Result<()> {
    for item in overrides {
        package_dir(item.module_path())?;
        item.checked_relative_path()?;
    }
    Ok(())
}

fn allocate_root(ctx: &Context) -> Result<PathBuf> {
    let parent = ctx.temp_root();
    ensure_dir(&parent)?;
    let dir = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir_in(&parent)
        .fs_context("create workspace in", &parent)?;
    Ok(dir.keep())
}

fn provision(
    ctx: &Context,
    toolchain: &dyn Toolchain,
    root: PathBuf,
    entries: &[String],
    overrides: &[OverrideItem],
) -> Result<Environment> {
    let identity = generate_identity(&root, None);
    let mut ws = Workspace::new(root, identity).with_link_mode(ctx.link_mode());
    tracing::info!("provisioning workspace {}", ws.root().display());

    let base = manifest_builder::build(ctx, toolchain, &mut ws)?;

    let identifiers: Vec<String> = entries
        .iter()
        .filter(|entry| !is_location(entry))
        .cloned()
        .collect();
    if !identifiers.is_empty() {
        toolchain.fetch(ws.root(), &identifiers)?;
    }

    for item in overrides {
        apply_override(toolchain, &mut ws, item)?;
    }

    let default_entries = [".".to_string()];
    let entries = if entries.is_empty() {
        &default_entries[..]
    } else {
        entries
    };
    let entries = entries
        .iter()
        .map(|entry| resolve_for_workspace(entry, ctx.cwd(), base.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    Ok(Environment {
        identity: ws.identity().to_string(),
        overridden: ws.visited().map(str::to_string).collect(),
        root: ws.root().to_path_buf(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::{Manifest, RedirectTarget};
    use crate::test_support::{hash_tree, manifests, FakeToolchain, ModuleFixture};
    use crate::util::config::{Config, LinkMode};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Caller project, module cache and temp root in one place.
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            Sandbox {
                dir: TempDir::new().unwrap(),
            }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn context(&self, cwd: &Path) -> Context {
            let mut config = Config::default();
            config.workspace.temp_root = Some(self.path("tmp"));
            config.workspace.link_mode = Some(LinkMode::Hardlink);
            Context::with_config(cwd.to_path_buf(), config)
        }

        fn module(&self, fixture: ModuleFixture) -> PathBuf {
            fixture.write_to(&self.path("cache")).unwrap()
        }

        fn project(&self, module: &str) -> PathBuf {
            let dir = self.path("project");
            fs::create_dir_all(dir.join("cmd/tool")).unwrap();
            fs::write(dir.join("go.mod"), manifests::module(module)).unwrap();
            dir
        }
    }

    fn entries(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn manifest_of(env: &Environment) -> Manifest {
        Manifest::load(&env.root.join("go.mod")).unwrap()
    }

    #[test]
    fn test_single_override() {
        let sb = Sandbox::new();
        let pkga = sb.module(
            ModuleFixture::new("example.com/pkga")
                .with_file("sub/file.ext", "original")
                .with_file("lib.go", "package pkga\n"),
        );
        let before = hash_tree(&pkga).unwrap();
        let go = FakeToolchain::new().with_module("example.com/pkga", &pkga);
        let cwd = sb.path("elsewhere");
        fs::create_dir_all(&cwd).unwrap();

        let env = create_environment(
            &sb.context(&cwd),
            &go,
            &[],
            &[OverrideItem::new("example.com/pkga", "sub/file.ext", "X")],
        )
        .unwrap();

        let file = env.root.join("overlay/example.com/pkga/sub/file.ext");
        assert_eq!(fs::read_to_string(file).unwrap(), "X");
        assert_eq!(
            fs::read_to_string(env.root.join("overlay/example.com/pkga/lib.go")).unwrap(),
            "package pkga\n"
        );
        assert_eq!(hash_tree(&pkga).unwrap(), before);
        assert!(env.root.starts_with(sb.path("tmp")));
        assert_eq!(env.overridden, vec!["example.com/pkga"]);

        let manifest = manifest_of(&env);
        assert_eq!(manifest.identity(), Some(env.identity.as_str()));
        let redirects: Vec<_> = manifest.redirects_of("example.com/pkga").collect();
        assert_eq!(redirects.len(), 1);
        assert_eq!(
            redirects[0].new,
            RedirectTarget::Directory("./overlay/example.com/pkga".to_string())
        );
    }

    #[test]
    fn test_two_files_one_package() {
        let sb = Sandbox::new();
        let pkgb = sb.module(
            ModuleFixture::new("example.com/pkgb")
                .with_file("a.ext", "a")
                .with_file("lib.go", "package pkgb\n"),
        );
        let before = hash_tree(&pkgb).unwrap();
        let go = FakeToolchain::new().with_module("example.com/pkgb", &pkgb);
        let cwd = sb.path("elsewhere");
        fs::create_dir_all(&cwd).unwrap();

        let env = create_environment(
            &sb.context(&cwd),
            &go,
            &entries(&["example.com/pkgb"]),
            &[
                OverrideItem::new("example.com/pkgb", "a.ext", "A"),
                OverrideItem::new("example.com/pkgb", "b/c.ext", "C"),
            ],
        )
        .unwrap();

        let dir = env.root.join("overlay/example.com/pkgb");
        assert_eq!(fs::read_to_string(dir.join("a.ext")).unwrap(), "A");
        assert_eq!(fs::read_to_string(dir.join("b/c.ext")).unwrap(), "C");
        assert_eq!(fs::read_to_string(dir.join("lib.go")).unwrap(), "package pkgb\n");
        assert!(!pkgb.join("b").exists());
        assert_eq!(hash_tree(&pkgb).unwrap(), before);
        assert_eq!(go.locate_count("example.com/pkgb"), 1);
        assert_eq!(manifest_of(&env).redirects_of("example.com/pkgb").count(), 1);
        assert_eq!(env.entries, vec!["example.com/pkgb"]);
    }

    #[test]
    fn test_empty_entries_default_to_cwd_package() {
        let sb = Sandbox::new();
        let project = sb.project("example.com/me");
        let go = FakeToolchain::new();

        let env = create_environment(&sb.context(&project), &go, &[], &[]).unwrap();

        assert_eq!(env.entries, vec!["example.com/me"]);
        assert!(go.fetches().is_empty());
        let manifest = manifest_of(&env);
        assert_ne!(manifest.identity(), Some("example.com/me"));
        assert_eq!(
            manifest.requirement("example.com/me").map(|r| r.version.as_str()),
            Some("v0.0.0")
        );
        assert_eq!(manifest.redirects_of("example.com/me").count(), 1);
    }

    #[test]
    fn test_location_entries_with_manifest() {
        let sb = Sandbox::new();
        let project = sb.project("example.com/me");
        let go = FakeToolchain::new();

        let env = create_environment(
            &sb.context(&project.join("cmd")),
            &go,
            &entries(&["./tool", ".", "golang.org/x/text@v0.22.0"]),
            &[],
        );
        // the fake toolchain does not know golang.org/x/text
        assert!(env.is_err());

        let env = create_environment(
            &sb.context(&project.join("cmd")),
            &go,
            &entries(&["./tool", "."]),
            &[],
        )
        .unwrap();
        assert_eq!(env.entries, vec!["example.com/me/cmd/tool", "example.com/me/cmd"]);
    }

    #[test]
    fn test_location_outside_manifest_tree() {
        let sb = Sandbox::new();
        let project = sb.project("example.com/me");
        let go = FakeToolchain::new();

        let env = create_environment(
            &sb.context(&project),
            &go,
            &entries(&["../vendor/thing"]),
            &[],
        )
        .unwrap();
        assert_eq!(
            env.entries,
            vec![sb.path("vendor/thing").to_string_lossy().into_owned()]
        );
    }

    #[test]
    fn test_location_entries_without_manifest() {
        let sb = Sandbox::new();
        let cwd = sb.path("loose");
        fs::create_dir_all(&cwd).unwrap();
        let go = FakeToolchain::new();

        let env = create_environment(&sb.context(&cwd), &go, &entries(&["./a"]), &[]).unwrap();

        assert_eq!(env.entries, vec![cwd.join("a").to_string_lossy().into_owned()]);
        assert!(manifest_of(&env).replaces.is_empty());
    }

    #[test]
    fn test_missing_owning_identity_is_resolution_error() {
        let sb = Sandbox::new();
        let project = sb.project("example.com/me");
        fs::write(project.join("go.mod"), "go 1.21\n").unwrap();
        let go = FakeToolchain::new().without_owner();

        let err = create_environment(&sb.context(&project), &go, &entries(&["./x"]), &[])
            .unwrap_err();

        assert!(matches!(err.source, Error::Resolution { .. }));
        let root = err.root.expect("workspace was allocated");
        assert!(root.join("go.mod").is_file());
    }

    #[test]
    fn test_overriding_the_callers_own_module() {
        let sb = Sandbox::new();
        let project = sb.project("example.com/me");
        fs::write(project.join("main.go"), "package main\n").unwrap();
        let go = FakeToolchain::new();

        let env = create_environment(
            &sb.context(&project),
            &go,
            &[],
            &[OverrideItem::new("example.com/me", "main.go", "package main // patched\n")],
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(project.join("main.go")).unwrap(),
            "package main\n"
        );
        assert_eq!(
            fs::read_to_string(env.root.join("overlay/example.com/me/main.go")).unwrap(),
            "package main // patched\n"
        );
        let manifest = manifest_of(&env);
        let targets: Vec<_> = manifest
            .redirects_of("example.com/me")
            .filter_map(|r| r.new.directory())
            .collect();
        assert_eq!(targets, vec!["./overlay/example.com/me"]);
    }

    #[test]
    fn test_invalid_override_allocates_nothing() {
        let sb = Sandbox::new();
        let go = FakeToolchain::new();

        let err = create_environment(
            &sb.context(sb.dir.path()),
            &go,
            &[],
            &[OverrideItem::new("example.com/pkga", "../escape", "X")],
        )
        .unwrap_err();

        assert!(err.root.is_none());
        assert!(!sb.path("tmp").exists());
    }

    #[test]
    fn test_failure_keeps_root() {
        let sb = Sandbox::new();
        let cwd = sb.path("loose");
        fs::create_dir_all(&cwd).unwrap();
        let go = FakeToolchain::new();

        let err = create_environment(
            &sb.context(&cwd),
            &go,
            &[],
            &[OverrideItem::new("example.com/unknown", "a.go", "X")],
        )
        .unwrap_err();

        assert!(matches!(err.source, Error::ExternalCommand { .. }));
        assert!(err.root.unwrap().is_dir());
    }
}
