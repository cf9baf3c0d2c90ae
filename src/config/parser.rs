//! Recursive-descent parser for the Apache-style nested block format.
//!
//! ```text
//! Hourlies 4
//! Dailies 7
//!
//! <Backup host1.example.com>
//!     Directory /home/mike
//!     <BackupDirectory /var/www>
//!         Exclude *.log
//!         Destination /backup2
//!     </BackupDirectory>
//! </Backup>
//! ```
//!
//! `#` starts a line comment; directive values are whitespace-split
//! into tokens so both `Directory /a /b` and repeated `Directory`
//! lines populate a multi-valued key.

use crate::error::{Result, SnapbackError};
use std::collections::HashMap;
use std::path::Path;

/// One nesting level: its own directives plus any nested blocks.
#[derive(Debug, Default, Clone)]
pub struct RawScope {
    /// Lower-cased key -> all tokens contributed by directives in this
    /// scope, in file order.
    pub entries: HashMap<String, Vec<String>>,
    /// `<Backup NAME>` children, keyed by the block parameter verbatim.
    pub backup_blocks: Vec<(String, RawScope)>,
    /// `<BackupDirectory PATH>` / `<BackupDir PATH>` children.
    pub directory_blocks: Vec<(String, RawScope)>,
}

impl RawScope {
    fn push(&mut self, key: &str, value: &str) {
        let key = key.to_ascii_lowercase();
        let tokens = self.entries.entry(key).or_default();
        if value.is_empty() {
            tokens.push(String::new());
        } else {
            tokens.extend(value.split_whitespace().map(str::to_string));
        }
    }
}

enum Line<'a> {
    Blank,
    BlockOpen { tag: &'a str, param: &'a str },
    BlockClose { tag: &'a str },
    Directive { key: &'a str, value: &'a str },
}

fn classify(raw: &str) -> Line<'_> {
    let line = match raw.find('#') {
        Some(idx) => raw[..idx].trim(),
        None => raw.trim(),
    };
    if line.is_empty() {
        return Line::Blank;
    }
    if let Some(inner) = line.strip_prefix("</").and_then(|s| s.strip_suffix('>')) {
        return Line::BlockClose { tag: inner.trim() };
    }
    if let Some(inner) = line.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        let mut parts = inner.splitn(2, char::is_whitespace);
        let tag = parts.next().unwrap_or("").trim();
        let param = parts.next().unwrap_or("").trim();
        return Line::BlockOpen { tag, param };
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let key = parts.next().unwrap_or("");
    let value = parts.next().unwrap_or("").trim();
    Line::Directive { key, value }
}

/// Parse a config document into its root scope.
///
/// # Errors
///
/// Returns a parse error on unbalanced or unrecognized block tags.
pub fn parse(path: &Path, input: &str) -> Result<RawScope> {
    let mut stack: Vec<(Option<(bool, String)>, RawScope)> = vec![(None, RawScope::default())];

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        match classify(raw_line) {
            Line::Blank => {}
            Line::Directive { key, value } => {
                stack.last_mut().expect("root scope always present").1.push(key, value);
            }
            Line::BlockOpen { tag, param } => {
                let is_backup = tag.eq_ignore_ascii_case("backup");
                let is_dir = tag.eq_ignore_ascii_case("backupdirectory") || tag.eq_ignore_ascii_case("backupdir");
                if !is_backup && !is_dir {
                    return Err(parse_err(path, line_no, format!("unknown block tag <{tag}>")));
                }
                stack.push((Some((is_backup, param.to_string())), RawScope::default()));
            }
            Line::BlockClose { tag } => {
                let is_backup = tag.eq_ignore_ascii_case("backup");
                let is_dir = tag.eq_ignore_ascii_case("backupdirectory") || tag.eq_ignore_ascii_case("backupdir");
                if !is_backup && !is_dir {
                    return Err(parse_err(path, line_no, format!("unknown closing tag </{tag}>")));
                }
                let (marker, finished) = stack
                    .pop()
                    .ok_or_else(|| parse_err(path, line_no, "unmatched closing tag".to_string()))?;
                let (opened_as_backup, param) = marker
                    .ok_or_else(|| parse_err(path, line_no, "unmatched closing tag at root".to_string()))?;
                if opened_as_backup != is_backup {
                    return Err(parse_err(path, line_no, format!("mismatched closing tag </{tag}>")));
                }
                let parent = stack.last_mut().expect("root scope always present");
                if opened_as_backup {
                    parent.1.backup_blocks.push((param, finished));
                } else {
                    parent.1.directory_blocks.push((param, finished));
                }
            }
        }
    }

    if stack.len() != 1 {
        return Err(parse_err(path, input.lines().count(), "unclosed block at end of file".to_string()));
    }

    Ok(stack.pop().expect("root scope always present").1)
}

fn parse_err(path: &Path, line: usize, message: String) -> SnapbackError {
    SnapbackError::ConfigParse {
        path: path.to_path_buf(),
        line,
        message,
    }
}
