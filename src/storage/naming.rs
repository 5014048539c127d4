//! File name rules
//!
//! Sanitizing, extension allow-listing and collision suffixes for names
//! chosen by clients.

use std::collections::HashSet;

use crate::error::{Result, VaultError};

/// Name used when a client sends an empty one
pub const DEFAULT_FILENAME: &str = "file.dat";

/// Longest stored name, in bytes (typical filesystem NAME_MAX)
pub const MAX_FILENAME_LEN: usize = 255;

/// Collision suffixes are drawn from `0..SUFFIX_RANGE`
pub const SUFFIX_RANGE: u32 = 1_000_000;

/// Replace path separators, control characters and `..` with `_`, then trim
///
/// "../etc/passwd" → "__etc_passwd"
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced.replace("..", "_").trim().to_string()
}

/// Split "report.final.pdf" into ("report.final", ".pdf")
///
/// A leading dot is part of the base name, not an extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}

/// Build `base_<suffix>.ext`, shortening the base so the result fits
/// `MAX_FILENAME_LEN`
pub fn with_suffix(name: &str, suffix: u32) -> String {
    let (base, extension) = split_extension(name);
    let tail = format!("_{}{}", suffix, extension);

    let budget = MAX_FILENAME_LEN.saturating_sub(tail.len());
    let mut cut = base.len().min(budget);
    while !base.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}{}", &base[..cut], tail)
}

/// Which names a client may store under
#[derive(Debug, Clone)]
pub struct NamePolicy {
    allowed_extensions: HashSet<String>,
}

impl NamePolicy {
    /// Build from extensions given with or without a leading dot, any case
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Self { allowed_extensions }
    }

    /// Extension check on an already sanitized name
    ///
    /// No dot at all is fine; a dot that is the first or last character, or
    /// an extension missing from the allow-list, is not.
    pub fn allows(&self, name: &str) -> bool {
        match name.rfind('.') {
            None => true,
            Some(0) => false,
            Some(index) if index == name.len() - 1 => false,
            Some(index) => self
                .allowed_extensions
                .contains(&name[index + 1..].to_ascii_lowercase()),
        }
    }

    /// Turn a client-supplied name into the name to store under
    ///
    /// Empty names become `DEFAULT_FILENAME`, which skips the allow-list.
    pub fn resolve(&self, requested: &str) -> Result<String> {
        let name = sanitize(requested);

        if name.is_empty() {
            return Ok(DEFAULT_FILENAME.to_string());
        }

        if name.len() > MAX_FILENAME_LEN {
            return Err(VaultError::Validation(format!(
                "name is {} bytes long (max {})",
                name.len(),
                MAX_FILENAME_LEN
            )));
        }

        if !self.allows(&name) {
            return Err(VaultError::Validation(format!(
                "extension not allowed: {:?}",
                name
            )));
        }

        Ok(name)
    }
}
