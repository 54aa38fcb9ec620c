//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." -- every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - Layers, lowest priority first: built-in defaults → optional TOML settings → `S3CI_*` env.
//! - Nested keys in env use `__`: `S3CI_NAMING__SERIES=xenial`.
//! - Credentials are NOT here. They live in the s3cmd file, see `credentials.rs`.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::naming::NamingConfig;

// -- 🪣 where the QA team keeps the goods
const DEFAULT_BUCKET: &str = "juju-qa-data";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_NAMESPACE: &str = "juju-ci";

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    /// 🪣 Bucket that holds the CI products.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// 🌎 Defaults to "us-east-1" because that's where data goes to retire.
    #[serde(default = "default_region")]
    pub region: String,
    /// 🔌 Point at an S3-compatible store instead of AWS. Path-style addressing kicks in when set.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// 🗂️ First segment of every job path.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub naming: NamingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
            namespace: default_namespace(),
            naming: NamingConfig::default(),
        }
    }
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_region() -> String {
    // -- 🏖️ If you don't choose a region, the region chooses you. And it chose Florida.
    DEFAULT_REGION.to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// 🚀 Load the config from defaults, a TOML file if you brought one, and `S3CI_*` env vars.
///
/// 📐 DESIGN NOTE (no cap, this is tribal knowledge):
///   - `settings_file` None  → defaults + env. Perfectly valid. Most CI jobs live here.
///   - `settings_file` Some  → defaults + TOML + env. Env wins, because CI jobs override things.
///
/// 💀 Returns an error if config is unparseable. The message says which file, so you
/// don't have to guess at 3am.
pub fn load_config(settings_file: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        settings_file.unwrap_or(Path::new(""))
    );

    let config = Figment::from(Serialized::defaults(AppConfig::default()));

    // 🎯 Conditionally layer in TOML only if a file was actually provided.
    // Ancient proverb: "He who defaults to config.toml uninvited, deploys to production alone."
    let config = match settings_file {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let config = config.merge(Env::prefixed("S3CI_").split("__"));

    let context_msg = match settings_file {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (S3CI_*). \
             The file exists in our hearts, but apparently not in valid TOML.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (S3CI_*). \
                 No file was provided, so this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
