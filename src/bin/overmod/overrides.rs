//! Override input: the `--override` flag and override files.
//!
//! An override file is TOML:
//!
//! ```toml
//! entries = ["./cmd/tool"]
//!
//! [[override]]
//! package = "golang.org/x/text"
//! path = "language/extra.go"
//! file = "patches/extra.go"
//! ```
//!
//! `file` is relative to the override file; `content` may be given inline
//! instead.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use serde::Deserialize;

use overmod::util::fs::absolute;
use overmod::OverrideItem;

use crate::cli::OverrideArgs;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideFile {
    #[serde(default)]
    entries: Vec<String>,

    #[serde(default, rename = "override")]
    overrides: Vec<OverrideSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideSpec {
    package: String,
    path: String,
    file: Option<PathBuf>,
    content: Option<String>,
}

/// Entries and overrides collected from the command line.
#[derive(Debug, Default)]
pub struct Request {
    pub entries: Vec<String>,
    pub overrides: Vec<OverrideItem>,
}

/// Collect the override file, `--override` flags and positional entries,
/// in that order. Relative paths are resolved against `cwd`.
pub fn load_request(cwd: &Path, args: &OverrideArgs, entries: &[String]) -> Result<Request> {
    let mut request = Request::default();

    if let Some(ref file) = args.file {
        let path = absolute(cwd, file);
        let loaded = load_file(&path)?;
        request.entries.extend(loaded.entries);
        request.overrides.extend(loaded.overrides);
    }

    for flag in &args.overrides {
        request.overrides.push(parse_flag(cwd, flag)?);
    }

    request.entries.extend(entries.iter().cloned());
    Ok(request)
}

/// Load an override file.
pub fn load_file(path: &Path) -> Result<Request> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: OverrideFile =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    let base = path.parent().unwrap_or(Path::new("."));

    let overrides = file
        .overrides
        .into_iter()
        .map(|spec| {
            let content = match (spec.file, spec.content) {
                (Some(file), None) => read_source(&absolute(base, &file))?,
                (None, Some(content)) => content.into_bytes(),
                _ => bail!(
                    "override of {}:{} in {} needs exactly one of `file` or `content`",
                    spec.package,
                    spec.path,
                    path.display()
                ),
            };
            Ok(OverrideItem::new(spec.package, spec.path, content))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Request {
        entries: file.entries,
        overrides,
    })
}

/// Parse `PACKAGE:PATH=SOURCE_FILE`.
pub fn parse_flag(cwd: &Path, flag: &str) -> Result<OverrideItem> {
    let invalid = || anyhow!("invalid --override `{}`: expected PKG:PATH=SRC", flag);

    let (target, source) = flag.split_once('=').ok_or_else(invalid)?;
    let (package, path) = target.split_once(':').ok_or_else(invalid)?;
    if package.is_empty() || path.is_empty() || source.is_empty() {
        return Err(invalid());
    }

    let content = read_source(&absolute(cwd, Path::new(source)))?;
    Ok(OverrideItem::new(package, path, content))
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read override source {}", path.display()))
}
