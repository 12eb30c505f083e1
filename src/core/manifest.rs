//! Module manifest (`go.mod`) model.
//!
//! The manifest declares the module identity, its requirements and its
//! `replace` directives (redirect edges). Only the directives the workspace
//! rewrites are modelled structurally; everything else is carried through
//! verbatim so that a copied manifest keeps its meaning.
//!
//! Comments are dropped when a manifest is re-formatted, except for the
//! `// indirect` marker on requirements.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::core::reference::is_location;
use crate::util::errors::{Error, Result};

/// Directive verbs that are preserved without interpretation.
const PRESERVED_VERBS: &[&str] = &["exclude", "retract", "godebug", "tool", "ignore"];

/// A module path with an optional version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleVersion {
    pub path: String,
    pub version: Option<String>,
}

/// A `require` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
    pub indirect: bool,
}

/// Where a redirect points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Another module at a fixed version.
    Module { path: String, version: String },
    /// A local directory, either `./`/`../`-relative or absolute.
    Directory(String),
}

impl RedirectTarget {
    /// The directory path if this target is a directory.
    pub fn directory(&self) -> Option<&str> {
        match self {
            RedirectTarget::Directory(dir) => Some(dir),
            RedirectTarget::Module { .. } => None,
        }
    }
}

/// A `replace` entry: a redirect edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub old: ModuleVersion,
    pub new: RedirectTarget,
}

/// A directive kept as the raw text of its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherDirective {
    pub verb: String,
    pub entries: Vec<String>,
    pub block: bool,
}

/// A parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub module: Option<String>,
    pub go: Option<String>,
    pub toolchain: Option<String>,
    pub requires: Vec<Requirement>,
    pub replaces: Vec<Redirect>,
    pub others: Vec<OtherDirective>,
}

impl Manifest {
    /// A manifest with only an identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Manifest {
            module: Some(identity.into()),
            ..Default::default()
        }
    }

    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = crate::util::fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    /// Parse manifest text; `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        Parser {
            path,
            manifest: Manifest::default(),
        }
        .run(content)
    }

    /// The module identity.
    pub fn identity(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Replace the module identity.
    pub fn set_identity(&mut self, identity: impl Into<String>) {
        self.module = Some(identity.into());
    }

    /// Add a requirement, or update the version of an existing one.
    pub fn add_requirement(&mut self, path: &str, version: &str) {
        match self.requires.iter_mut().find(|r| r.path == path) {
            Some(existing) => existing.version = version.to_string(),
            None => self.requires.push(Requirement {
                path: path.to_string(),
                version: version.to_string(),
                indirect: false,
            }),
        }
    }

    /// Find the requirement for `path`.
    pub fn requirement(&self, path: &str) -> Option<&Requirement> {
        self.requires.iter().find(|r| r.path == path)
    }

    /// Add or update a redirect.
    ///
    /// With no `old_version` every redirect of `old_path` is affected: the
    /// first one is rewritten and the rest are dropped.
    pub fn set_redirect(&mut self, old_path: &str, old_version: Option<&str>, new: RedirectTarget) {
        let old = ModuleVersion {
            path: old_path.to_string(),
            version: old_version.map(str::to_string),
        };
        let matches = |r: &Redirect| {
            r.old.path == old_path
                && (old_version.is_none() || r.old.version.as_deref() == old_version)
        };

        match self.replaces.iter().position(|r| matches(r)) {
            Some(first) => {
                self.replaces[first] = Redirect { old, new };
                let mut index = 0;
                self.replaces.retain(|r| {
                    let keep = index <= first || !matches(r);
                    index += 1;
                    keep
                });
            }
            None => self.replaces.push(Redirect { old, new }),
        }
    }

    /// Redirects whose old side is `path`.
    pub fn redirects_of<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Redirect> + 'a {
        self.replaces.iter().filter(move |r| r.old.path == path)
    }

    /// Format the manifest as text.
    pub fn format(&self) -> String {
        let mut out = String::new();
        let mut sections: Vec<String> = Vec::new();

        if let Some(ref module) = self.module {
            sections.push(format!("module {}\n", quote(module)));
        }

        let mut header = String::new();
        if let Some(ref go) = self.go {
            let _ = writeln!(header, "go {}", quote(go));
        }
        if let Some(ref toolchain) = self.toolchain {
            let _ = writeln!(header, "toolchain {}", quote(toolchain));
        }
        if !header.is_empty() {
            sections.push(header);
        }

        if !self.requires.is_empty() {
            let lines: Vec<String> = self
                .requires
                .iter()
                .map(|r| {
                    let mut line = format!("{} {}", quote(&r.path), quote(&r.version));
                    if r.indirect {
                        line.push_str(" // indirect");
                    }
                    line
                })
                .collect();
            sections.push(format_directive("require", &lines, lines.len() > 1));
        }

        for other in &self.others {
            sections.push(format_directive(&other.verb, &other.entries, other.block));
        }

        if !self.replaces.is_empty() {
            let lines: Vec<String> = self.replaces.iter().map(format_redirect).collect();
            sections.push(format_directive("replace", &lines, lines.len() > 1));
        }

        for (i, section) in sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(section);
        }
        out
    }

    /// Format and write the manifest.
    pub fn save(&self, path: &Path) -> Result<()> {
        crate::util::fs::write_bytes(path, self.format().as_bytes())
    }
}

fn format_redirect(r: &Redirect) -> String {
    let mut line = quote(&r.old.path);
    if let Some(ref v) = r.old.version {
        line.push(' ');
        line.push_str(&quote(v));
    }
    line.push_str(" => ");
    match r.new {
        RedirectTarget::Module {
            ref path,
            ref version,
        } => {
            let _ = write!(line, "{} {}", quote(path), quote(version));
        }
        RedirectTarget::Directory(ref dir) => line.push_str(&quote(dir)),
    }
    line
}

fn format_directive(verb: &str, lines: &[String], block: bool) -> String {
    if block {
        let mut out = format!("{verb} (\n");
        for line in lines {
            let _ = writeln!(out, "\t{line}");
        }
        out.push_str(")\n");
        out
    } else {
        lines.iter().map(|line| format!("{verb} {line}\n")).collect()
    }
}

/// Quote a token when it could not be read back as a bare word.
fn quote(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token.contains("//")
        || token.contains("/*")
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '`' | '\'' | '\\' | '(' | ')' | ','));
    if !needs_quotes {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Parser<'a> {
    path: &'a Path,
    manifest: Manifest,
}

impl Parser<'_> {
    fn run(mut self, content: &str) -> Result<Manifest> {
        let mut block: Option<(String, usize)> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let (tokens, comment_start) = self.lex(raw, line_no)?;
            if tokens.is_empty() {
                continue;
            }
            let code = raw[..comment_start].trim();
            let comment = raw.get(comment_start + 2..);

            if let Some(verb) = block.as_ref().map(|(verb, _)| verb.clone()) {
                if tokens.len() == 1 && tokens[0] == ")" {
                    block = None;
                    continue;
                }
                let entry = Entry {
                    args: &tokens,
                    code,
                    comment,
                };
                self.entry(&verb, entry, line_no, true)?;
                continue;
            }

            let verb = tokens[0].clone();
            let args = &tokens[1..];
            match args {
                [open] if open == "(" => {
                    self.begin_block(&verb, line_no)?;
                    block = Some((verb, line_no));
                }
                [open, close] if open == "(" && close == ")" => {
                    self.begin_block(&verb, line_no)?;
                }
                _ => {
                    let entry = Entry {
                        args,
                        code: code.strip_prefix(verb.as_str()).unwrap_or(code).trim_start(),
                        comment,
                    };
                    self.entry(&verb, entry, line_no, false)?
                }
            }
        }

        if let Some((verb, line)) = block {
            return Err(self.error(line, format!("unterminated `{verb} (` block")));
        }

        Ok(self.manifest)
    }

    fn begin_block(&mut self, verb: &str, line: usize) -> Result<()> {
        match verb {
            "require" | "replace" => Ok(()),
            v if PRESERVED_VERBS.contains(&v) => {
                self.manifest.others.push(OtherDirective {
                    verb: v.to_string(),
                    entries: Vec::new(),
                    block: true,
                });
                Ok(())
            }
            v => Err(self.error(line, format!("unknown block type: {v}"))),
        }
    }

    fn entry(&mut self, verb: &str, entry: Entry<'_>, line: usize, in_block: bool) -> Result<()> {
        let args = entry.args;
        match verb {
            "module" | "go" | "toolchain" => {
                let [value] = args else {
                    return Err(self.error(line, format!("usage: {verb} <value>")));
                };
                let slot = match verb {
                    "module" => &mut self.manifest.module,
                    "go" => &mut self.manifest.go,
                    _ => &mut self.manifest.toolchain,
                };
                if slot.is_some() {
                    return Err(parse_error(self.path, line, format!("repeated {verb} statement")));
                }
                *slot = Some(value.clone());
            }
            "require" => {
                let [path, version] = args else {
                    return Err(self.error(line, "usage: require module/path v1.2.3"));
                };
                let indirect = entry.comment.is_some_and(|c| {
                    let c = c.trim();
                    c == "indirect" || c.starts_with("indirect;")
                });
                self.manifest.requires.push(Requirement {
                    path: path.clone(),
                    version: version.clone(),
                    indirect,
                });
            }
            "replace" => {
                let redirect = self.redirect(args, line)?;
                self.manifest.replaces.push(redirect);
            }
            v if PRESERVED_VERBS.contains(&v) => {
                if in_block {
                    if let Some(last) = self.manifest.others.last_mut() {
                        last.entries.push(entry.code.to_string());
                        return Ok(());
                    }
                }
                self.manifest.others.push(OtherDirective {
                    verb: v.to_string(),
                    entries: vec![entry.code.to_string()],
                    block: false,
                });
            }
            v => return Err(self.error(line, format!("unknown directive: {v}"))),
        }
        Ok(())
    }

    fn redirect(&self, args: &[String], line: usize) -> Result<Redirect> {
        let usage = "usage: replace module/path [v1.2.3] => other/module v1.4\n\t or replace module/path [v1.2.3] => ../local/directory";
        let Some(arrow) = args.iter().position(|t| t == "=>") else {
            return Err(self.error(line, usage));
        };
        let (left, right) = (&args[..arrow], &args[arrow + 1..]);

        let old = match left {
            [path] => ModuleVersion {
                path: path.clone(),
                version: None,
            },
            [path, version] => ModuleVersion {
                path: path.clone(),
                version: Some(version.clone()),
            },
            _ => return Err(self.error(line, usage)),
        };

        let new = match right {
            [dir] if is_location(dir) => RedirectTarget::Directory(dir.clone()),
            [module] => {
                return Err(self.error(
                    line,
                    format!("replacement module without version must be directory path (rooted or starting with ./ or ../): {module}"),
                ))
            }
            [path, _] if is_location(path) => {
                return Err(self.error(
                    line,
                    format!("replacement module directory path {path} cannot have version"),
                ))
            }
            [path, version] => RedirectTarget::Module {
                path: path.clone(),
                version: version.clone(),
            },
            _ => return Err(self.error(line, usage)),
        };

        Ok(Redirect { old, new })
    }

    /// Split a line into tokens; also returns where a trailing `//` comment
    /// starts (the line length when there is none).
    fn lex(&self, line: &str, line_no: usize) -> Result<(Vec<String>, usize)> {
        let mut tokens = Vec::new();
        let mut chars = line.char_indices().peekable();

        while let Some(&(start, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }
            if line[start..].starts_with("//") {
                return Ok((tokens, start));
            }
            match c {
                '(' | ')' => {
                    chars.next();
                    tokens.push(c.to_string());
                }
                '"' => {
                    chars.next();
                    let mut token = String::new();
                    let mut closed = false;
                    while let Some((_, c)) = chars.next() {
                        match c {
                            '"' => {
                                closed = true;
                                break;
                            }
                            '\\' => match chars.next() {
                                Some((_, 'n')) => token.push('\n'),
                                Some((_, 't')) => token.push('\t'),
                                Some((_, other)) => token.push(other),
                                None => break,
                            },
                            c => token.push(c),
                        }
                    }
                    if !closed {
                        return Err(self.error(line_no, "unterminated quoted string"));
                    }
                    tokens.push(token);
                }
                '`' => {
                    chars.next();
                    let mut token = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '`' {
                            closed = true;
                            break;
                        }
                        token.push(c);
                    }
                    if !closed {
                        return Err(self.error(line_no, "unterminated raw string"));
                    }
                    tokens.push(token);
                }
                _ => {
                    let mut end = line.len();
                    for (i, c) in line[start..].char_indices() {
                        let rest = &line[start + i..];
                        if c.is_whitespace() || matches!(c, '(' | ')' | '"' | '`') || rest.starts_with("//") {
                            end = start + i;
                            break;
                        }
                    }
                    tokens.push(line[start..end].to_string());
                    while chars.peek().is_some_and(|&(i, _)| i < end) {
                        chars.next();
                    }
                }
            }
        }

        Ok((tokens, line.len()))
    }

    fn error(&self, line: usize, message: impl Into<String>) -> Error {
        parse_error(self.path, line, message)
    }
}

/// One directive entry as seen by the parser.
struct Entry<'a> {
    args: &'a [String],
    /// Entry text without the verb or trailing comment
    code: &'a str,
    comment: Option<&'a str>,
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> Error {
    Error::ManifestParse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

/// Path of the lock data that sits next to a manifest.
pub fn lock_path_for(manifest: &Path) -> PathBuf {
    manifest.with_extension("sum")
}
