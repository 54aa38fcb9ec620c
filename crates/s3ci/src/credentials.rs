//! 🔑 credentials.rs: reading an s3cmd config without summoning a Python interpreter.
//!
//! The s3cmd file is INI-shaped: `[default]`, then `access_key = ...` and
//! `secret_key = ...`, plus thirty other knobs we will politely ignore.
//!
//! 🧠 Knowledge graph:
//! - `S3cfg` is a figment `Provider`, so the INI file layers like any other source.
//! - `S3CI_ACCESS_KEY` / `S3CI_SECRET_KEY` win over the file when set.
//! - Any failure here is `ResolveError::Credential`, raised before a single byte hits the network.
//!
//! 🦆 The duck does not have AWS credentials. The duck has never needed them.

use std::path::{Path, PathBuf};

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::Env,
    value::{Dict, Map, Value},
};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ResolveError, Result};

// -- 📜 the section s3cmd writes by default, and the only one we read
const DEFAULT_SECTION: &str = "default";

/// 🔐 The two strings standing between us and the bucket.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

// 🐛 Debug impl hides the secret. Logs are forever. Secrets should not be.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// 📄 Figment provider for the `[default]` section of an s3cmd-style INI file.
#[derive(Debug, Clone)]
pub struct S3cfg {
    path: PathBuf,
}

impl S3cfg {
    /// 🎯 Read the `[default]` section of the file at `path`.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Provider for S3cfg {
    fn metadata(&self) -> Metadata {
        Metadata::named(format!("s3cmd config '{}'", self.path.display()))
    }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        let contents = std::fs::read_to_string(&self.path).map_err(|err| {
            figment::Error::from(format!("failed to read '{}': {}", self.path.display(), err))
        })?;

        let the_section = parse_ini_section(&contents, DEFAULT_SECTION).ok_or_else(|| {
            figment::Error::from(format!(
                "no [{}] section in '{}'",
                DEFAULT_SECTION,
                self.path.display()
            ))
        })?;

        let dict: Dict = the_section
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();
        Ok(Profile::Default.collect(dict))
    }
}

/// 🔍 Returns the `key = value` pairs of one INI section, or None if the section never shows up.
///
/// Follows ConfigParser's habits: `=` or `:` separate, `#` and `;` start comments,
/// option names are lowercased, later duplicates win.
pub fn parse_ini_section(contents: &str, section: &str) -> Option<Vec<(String, String)>> {
    let mut in_section = false;
    let mut seen_section = false;
    let mut entries: Vec<(String, String)> = Vec::new();

    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            in_section = header.trim() == section;
            seen_section |= in_section;
            continue;
        }

        if !in_section {
            continue;
        }

        // -- ✂️ first '=' or ':' wins, whichever comes first. secrets may contain either.
        let Some(split_at) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..split_at].trim().to_lowercase();
        let value = line[split_at + 1..].trim().to_string();
        entries.retain(|(existing, _)| existing != &key);
        entries.push((key, value));
    }

    seen_section.then_some(entries)
}

/// 🚀 Load `(access_key, secret_key)` from the s3cmd file, with env overrides on top.
///
/// 💀 Missing file, missing section, or missing key: all `ResolveError::Credential`.
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    debug!("🔑 Reading credentials from {}", path.display());

    Figment::new()
        .merge(S3cfg::file(path))
        .merge(Env::prefixed("S3CI_").only(&["access_key", "secret_key"]))
        .extract()
        .map_err(|err| ResolveError::Credential {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}
