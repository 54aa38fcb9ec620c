//! 🪣 s3ci: find the CI build's binary in the bucket, bring it home.
//!
//! Given a revision build, list the job's products, keep the `juju-core_` tarballs
//! for our series/arch, pick the highest `build-<n>/`, download it, unpack it,
//! and hand back the path of the binary inside.
//!
//! 🧠 Knowledge graph:
//! - `resolver`: the decision procedure (filter → select). Pure, lazy, testable.
//! - `fetch`: the orchestrator (resolve → download → extract).
//! - `backends`: `ObjectStore` trait, S3 and in-memory implementations.
//! - `credentials` / `app_config` / `naming` / `logging`: the ambient stuff.
//!
//! 🦆

use std::path::{Path, PathBuf};

use tracing::debug;

pub mod app_config;
pub mod backends;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod naming;
pub(crate) mod progress;
pub mod resolver;

pub use app_config::AppConfig;
pub use error::{ResolveError, Result};

use crate::backends::S3Bucket;
use crate::credentials::load_credentials;
use crate::naming::Naming;

/// 🚀 `get-juju-bin`: credentials → S3 client → resolve, download, extract.
pub async fn get_juju_bin(
    app_config: &AppConfig,
    credentials_file: &Path,
    revision_build: u64,
    workspace: &Path,
) -> Result<PathBuf> {
    let the_credentials = load_credentials(credentials_file)?;
    debug!("🔑 Credentials loaded: {:?}", the_credentials);

    let the_bucket = S3Bucket::connect(app_config, &the_credentials).await;
    let the_naming = Naming::from_config(app_config);
    fetch::fetch_juju_binary(&the_bucket, &the_naming, revision_build, workspace).await
}

/// 🔎 `find-package`: same resolution as `get_juju_bin`, but stops before downloading.
/// Returns the selected key's full name.
pub async fn find_package(
    app_config: &AppConfig,
    credentials_file: &Path,
    revision_build: u64,
) -> Result<String> {
    let the_credentials = load_credentials(credentials_file)?;
    let the_bucket = S3Bucket::connect(app_config, &the_credentials).await;
    let the_naming = Naming::from_config(app_config);
    let the_candidate = resolver::find_package_key(&the_bucket, &the_naming, revision_build).await?;
    Ok(the_candidate.key.name)
}
