//! 💀 error.rs: the many ways a bucket can let you down.
//!
//! 🧠 Knowledge graph:
//! - `ResolveError` is the one error type the library hands back. Each variant is a
//!   distinct outcome the caller can `match` on. "There is no package yet" is a
//!   very different 3am than "the bucket is full of lies".
//! - `PackageNotFound` is the expected miss. `DataIntegrity` means upstream broke the
//!   key naming contract. Neither is retried here.
//! - The CLI wraps these in `anyhow` for context and exit codes. The library does not.
//!
//! 🦆 The duck has filed a ticket. It was closed as "works as intended".

use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

/// 📦 Library-wide result alias. `E` is overridable for the rare function that
/// wants to speak a different dialect of failure.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

/// 🎭 Everything that can go wrong between "revision build 4242" and "here is your binary".
#[derive(Debug, Error)]
pub enum ResolveError {
    /// 🕳️ Nothing under the job path survived filtering. Try a different build, or try later.
    #[error("💀 Package could not be found under '{job_path}'.")]
    PackageNotFound { job_path: String },

    /// 🧟 A candidate made it through filtering but has no `build-<digits>/` segment.
    #[error(
        "💀 Key '{key}' matched the package filters but carries no build-<n>/ segment. \
         Whoever named this key broke the contract, and we refuse to guess."
    )]
    DataIntegrity { key: String },

    /// 🔑 The credentials file is missing, unreadable, or missing a key.
    #[error("💀 Could not load credentials from '{}': {message}", path.display())]
    Credential { path: PathBuf, message: String },

    /// 📡 Listing, downloading or writing the downloaded bytes failed.
    #[error("💀 {operation} failed for '{key}': {message}")]
    Transport {
        operation: &'static str,
        key: String,
        message: String,
    },

    /// 📁 The local workspace directory could not be prepared. Nothing to do with the network.
    #[error("💀 Could not prepare workspace '{}': {message}", path.display())]
    Workspace { path: PathBuf, message: String },

    /// 📼 The archive would not unpack, or unpacked without the binary in it.
    #[error("💀 Could not extract '{}': {message}", archive.display())]
    Extraction { archive: PathBuf, message: String },

    /// 🚧 A subcommand that parsed but has nobody home.
    #[error("💀 {command} not implemented.")]
    NotImplemented { command: String },
}

impl ResolveError {
    pub fn transport(operation: &'static str, key: impl Into<String>, cause: impl Display) -> Self {
        ResolveError::Transport {
            operation,
            key: key.into(),
            message: cause.to_string(),
        }
    }

    pub fn extraction(archive: impl Into<PathBuf>, cause: impl Display) -> Self {
        ResolveError::Extraction {
            archive: archive.into(),
            message: cause.to_string(),
        }
    }

    /// 🎯 True for the "nothing to fetch (yet)" outcome, the one callers are expected to handle.
    pub fn is_package_not_found(&self) -> bool {
        matches!(self, ResolveError::PackageNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_transport_errors_remember_the_crime_scene() {
        let the_error = ResolveError::transport("GetObject", "juju-ci/x.tgz", "connection reset");
        assert_eq!(
            the_error.to_string(),
            "💀 GetObject failed for 'juju-ci/x.tgz': connection reset"
        );
        assert!(!the_error.is_package_not_found());
    }

    #[test]
    fn the_one_where_package_not_found_is_its_own_thing() {
        let the_miss = ResolveError::PackageNotFound {
            job_path: "juju-ci/products/version-1/build-binary-trusty-amd64".to_string(),
        };
        assert!(the_miss.is_package_not_found());
        assert!(the_miss.to_string().contains("version-1"));
    }
}
