//! Config View: a read-only resolved view over the hierarchical
//! configuration, with scope inheritance (global ⊂ `Backup <host>` ⊂
//! `BackupDirectory <path>`).

mod duration;
mod parser;

pub use duration::{parse_bool, parse_duration_seconds};
pub use parser::RawScope;

use crate::error::{Result, SnapbackError};
use std::path::{Path, PathBuf};

/// Search order used when no `-c FILE` is given.
pub const DEFAULT_CONFIG_SEARCH: &[&str] = &[
    "/etc/snapback2.conf",
    "/etc/snapback/snapback2.conf",
    "/etc/snapback.conf",
    "/etc/snapback/snapback.conf",
];

/// A fully parsed configuration document.
pub struct ConfigTree {
    root: RawScope,
}

impl ConfigTree {
    /// Parse a document already read into memory (used by tests and by
    /// `load`/`load_default`).
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed block syntax.
    pub fn parse(path: &Path, input: &str) -> Result<Self> {
        Ok(Self {
            root: parser::parse(path, input)?,
        })
    }

    /// Load from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a parse error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SnapbackError::io(path, e))?;
        Self::parse(path, &text)
    }

    /// Resolve a configuration file the way the engine CLI does: an
    /// explicit `-c FILE`, a positional `NAME` mapped to
    /// `/etc/snapback/NAME.conf`, or the default search order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` if no candidate exists.
    pub fn load_default(explicit: Option<&Path>, name: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(name) = name {
            let candidate = PathBuf::from("/etc/snapback").join(format!("{name}.conf"));
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        let mut searched = Vec::new();
        for candidate in DEFAULT_CONFIG_SEARCH {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Self::load(&path);
            }
            searched.push(path);
        }
        Err(SnapbackError::ConfigNotFound { searched })
    }

    /// All `Backup <host>` block names declared at the top level.
    #[must_use]
    pub fn host_names(&self) -> Vec<&str> {
        self.root
            .backup_blocks
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// All `BackupDirectory`/`BackupDir` block paths within a host.
    #[must_use]
    pub fn directory_paths(&self, host: &str) -> Vec<&str> {
        self.host_scope(host)
            .map(|scope| {
                scope
                    .directory_blocks
                    .iter()
                    .map(|(path, _)| path.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every directory to back up for `host`: the union of explicit
    /// `<BackupDirectory>` block paths (which may carry their own
    /// per-directory overrides) and bare `Directory` list entries
    /// (which inherit only host-level settings), de-duplicated and in
    /// first-seen order with blocks listed first.
    #[must_use]
    pub fn directories_for(&self, host: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let Some(scope) = self.host_scope(host) else {
            return out;
        };
        for (path, _) in &scope.directory_blocks {
            if seen.insert(path.clone()) {
                out.push(path.clone());
            }
        }
        if let Some(values) = scope.entries.get("directory") {
            for value in values {
                if seen.insert(value.clone()) {
                    out.push(value.clone());
                }
            }
        }
        out
    }

    fn host_scope(&self, host: &str) -> Option<&RawScope> {
        self.root
            .backup_blocks
            .iter()
            .find(|(name, _)| name == host)
            .map(|(_, scope)| scope)
    }

    /// Build a lookup chain for a (host, directory) pair: innermost
    /// scope first. Either or both may be absent (global-only lookup,
    /// or host-level lookup with no directory block).
    #[must_use]
    pub fn scope<'a>(&'a self, host: Option<&str>, directory: Option<&str>) -> Scope<'a> {
        let mut chain = Vec::new();
        if let (Some(host), Some(dir)) = (host, directory) {
            if let Some(host_scope) = self.host_scope(host) {
                if let Some((_, dir_scope)) = host_scope
                    .directory_blocks
                    .iter()
                    .find(|(path, _)| path == dir)
                {
                    chain.push(dir_scope);
                }
            }
        }
        if let Some(host) = host {
            if let Some(host_scope) = self.host_scope(host) {
                chain.push(host_scope);
            }
        }
        chain.push(&self.root);
        Scope { chain }
    }
}

/// An ordered, innermost-first chain of scopes to look keys up through.
pub struct Scope<'a> {
    chain: Vec<&'a RawScope>,
}

impl<'a> Scope<'a> {
    /// First value for `key`, searching innermost scope outward.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&'a str> {
        let key = key.to_ascii_lowercase();
        for scope in &self.chain {
            if let Some(values) = scope.entries.get(&key) {
                if let Some(first) = values.first() {
                    return Some(first.as_str());
                }
            }
        }
        None
    }

    /// All values for `key` across every scope in the chain,
    /// innermost-scope entries first, in file order within each scope.
    ///
    /// Use this for genuinely multi-directive keys (`Directory`,
    /// `Exclude`) that accumulate across occurrences. For single
    /// list-valued keys that should instead override as a unit
    /// (`DestinationList`, `RsyncOpts`), use `get_list_innermost`.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<String> {
        let key = key.to_ascii_lowercase();
        let mut out = Vec::new();
        for scope in &self.chain {
            if let Some(values) = scope.entries.get(&key) {
                out.extend(values.iter().cloned());
            }
        }
        out
    }

    /// The values for `key` from the single innermost scope that
    /// defines it at all, without merging in values from outer scopes.
    #[must_use]
    pub fn get_list_innermost(&self, key: &str) -> Option<Vec<String>> {
        let key = key.to_ascii_lowercase();
        for scope in &self.chain {
            if let Some(values) = scope.entries.get(&key) {
                return Some(values.clone());
            }
        }
        None
    }

    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_string(key).map_or(default, parse_bool)
    }

    /// # Errors
    ///
    /// Returns a parse error if the value is present but malformed.
    pub fn get_duration(&self, key: &str, default_seconds: u64) -> Result<u64> {
        match self.get_string(key) {
            Some(value) => parse_duration_seconds(value),
            None => Ok(default_seconds),
        }
    }

    /// # Errors
    ///
    /// Returns a parse error if the value is present but not a valid
    /// non-negative integer.
    pub fn get_uint(&self, key: &str, default: u32) -> Result<u32> {
        match self.get_string(key) {
            Some(value) => value.parse::<u32>().map_err(|_| SnapbackError::ConfigParse {
                path: "<scope>".into(),
                line: 0,
                message: format!("expected non-negative integer for {key}, got {value:?}"),
            }),
            None => Ok(default),
        }
    }
}
