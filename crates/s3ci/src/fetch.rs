//! 🚀 fetch.rs: from revision build number to a binary you can actually run.
//!
//! Resolve the key, download it into the workspace, unpack it, point at the binary.
//! Four steps, no retries, no parallelism. Whatever breaks gets reported exactly as it broke.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::backends::ObjectStore;
use crate::error::{ResolveError, Result};
use crate::extract::acquire_binary;
use crate::naming::Naming;
use crate::resolver::find_package_key;

/// 🎯 Resolve, download and extract the package for `revision_build`. Returns the binary path.
///
/// The archive lands at `workspace/<file name>`, the contents under `workspace/extracted-bin`.
/// The workspace is created if it doesn't exist yet.
pub async fn fetch_juju_binary<S>(
    store: &S,
    naming: &Naming,
    revision_build: u64,
    workspace: &Path,
) -> Result<PathBuf>
where
    S: ObjectStore + ?Sized,
{
    let the_selected = find_package_key(store, naming, revision_build).await?;
    info!("🎯 Selected: {}", the_selected.key.name);

    tokio::fs::create_dir_all(workspace)
        .await
        .map_err(|err| ResolveError::Workspace {
            path: workspace.to_path_buf(),
            message: err.to_string(),
        })?;
    store
        .download(std::slice::from_ref(&the_selected.key), workspace)
        .await?;

    let the_package_path = workspace.join(&the_selected.file_name);
    info!("📦 Extracting: {}", the_package_path.display());
    acquire_binary(&the_package_path, workspace).await
}
