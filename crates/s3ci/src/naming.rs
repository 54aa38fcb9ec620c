//! 🏷️ naming.rs: where job names and package suffixes are born.
//!
//! 🎬 COLD OPEN. INT. CI DASHBOARD. ALWAYS 3AM
//!
//! Somewhere a job called `build-binary-trusty-amd64` finished. It dropped a
//! tarball into a bucket under a path nobody will ever type by hand. This module
//! is how we type it by hand without typing it by hand.
//!
//! 🧠 Knowledge graph:
//! - `JobNamer::build_binary_job()` → `build-binary-{series}-{arch}`
//! - `PackageNamer::release_package_suffix()` → `-{series}-{arch}.tgz`
//! - `Naming::job_path(rev)` → `{namespace}/products/version-{rev}/{job}`
//! - `NamingConfig` comes from `AppConfig.naming`; defaults sniff the host.
//! - Pure functions, no I/O, except the one-time peek at `/etc/os-release` for defaults.

use serde::{Deserialize, Serialize};

use crate::app_config::AppConfig;

// -- 🐧 the series we assume when the host refuses to tell us who it is
const FALLBACK_SERIES: &str = "trusty";
const OS_RELEASE_PATH: &str = "/etc/os-release";

/// 🔧 Which series/arch flavour of the build we are hunting for.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    /// 🐧 Distro series codename, e.g. `trusty`, `xenial`.
    #[serde(default = "default_series")]
    pub series: String,
    /// 🖥️ Debian-style architecture name, e.g. `amd64`, `arm64`.
    #[serde(default = "default_arch")]
    pub arch: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            series: default_series(),
            arch: default_arch(),
        }
    }
}

fn default_series() -> String {
    std::fs::read_to_string(OS_RELEASE_PATH)
        .ok()
        .and_then(|contents| parse_os_release_codename(&contents))
        .unwrap_or_else(|| FALLBACK_SERIES.to_string())
}

fn default_arch() -> String {
    debian_arch(std::env::consts::ARCH).to_string()
}

/// 🔍 Pulls `VERSION_CODENAME` out of an os-release file. Quotes optional, dignity required.
pub fn parse_os_release_codename(contents: &str) -> Option<String> {
    contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("VERSION_CODENAME="))
        .map(|value| value.trim().trim_matches('"').trim_matches('\''))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// 🗺️ Rust's idea of an architecture name → Debian's idea of an architecture name.
/// Two communities, one CPU, zero agreement.
pub fn debian_arch(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64el",
        "x86" => "i386",
        "arm" => "armhf",
        other => other,
    }
}

/// 🏗️ Names the CI job that builds binaries for a given series/arch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNamer {
    series: String,
    arch: String,
}

impl JobNamer {
    pub fn new(series: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            arch: arch.into(),
        }
    }

    pub fn from_config(config: &NamingConfig) -> Self {
        Self::new(&config.series, &config.arch)
    }

    pub fn build_binary_job(&self) -> String {
        format!("build-binary-{}-{}", self.series, self.arch)
    }
}

/// 📦 Knows what the tail end of a release package key looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNamer {
    series: String,
    arch: String,
}

impl PackageNamer {
    pub fn new(series: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            arch: arch.into(),
        }
    }

    pub fn from_config(config: &NamingConfig) -> Self {
        Self::new(&config.series, &config.arch)
    }

    pub fn release_package_suffix(&self) -> String {
        format!("-{}-{}.tgz", self.series, self.arch)
    }
}

/// 🧭 Everything the resolver needs to know about where things live and what they're called.
///
/// Built once from `AppConfig`, then passed by reference. No globals. No ambient state.
/// The resolver asks, this answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub namespace: String,
    pub job: JobNamer,
    pub package: PackageNamer,
}

impl Naming {
    pub fn new(namespace: impl Into<String>, naming_config: &NamingConfig) -> Self {
        Self {
            namespace: namespace.into(),
            job: JobNamer::from_config(naming_config),
            package: PackageNamer::from_config(naming_config),
        }
    }

    pub fn from_config(app_config: &AppConfig) -> Self {
        Self::new(&app_config.namespace, &app_config.naming)
    }

    /// 🗝️ The listing prefix for one revision build. Never persisted, only listed under.
    pub fn job_path(&self, revision_build: u64) -> String {
        format!(
            "{}/products/version-{}/{}",
            self.namespace,
            revision_build,
            self.job.build_binary_job()
        )
    }
}
