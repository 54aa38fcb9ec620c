//! 📼 extract.rs: unboxing the tarball, finding the binary.
//!
//! The package is a gzip'd tarball with the `juju` binary somewhere inside, usually
//! under `juju-core-<version>/bin/`. Usually. We walk the whole tree to be sure.
//!
//! 🧠 Knowledge graph:
//! - Unpacks into `<workspace>/extracted-bin`. Whatever a previous run left there is
//!   removed first, so the binary always comes from this archive.
//! - Returns the first regular file named `juju`, walking directories in sorted order
//!   so the answer doesn't depend on the filesystem's mood.
//! - flate2 + tar are blocking, so the whole thing runs on `spawn_blocking`.
//! - Everything that goes wrong is `ResolveError::Extraction`, including "unpacked fine,
//!   but there's no binary in here".

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::error::{ResolveError, Result};

/// 📁 Where the archive contents land, relative to the workspace.
pub const EXTRACTED_DIR: &str = "extracted-bin";
/// 🎯 The file we came here for.
pub const BINARY_NAME: &str = "juju";

/// 🚀 Unpack `archive` under `workspace/extracted-bin` and return the path of the binary.
pub async fn acquire_binary(archive: &Path, workspace: &Path) -> Result<PathBuf> {
    let the_archive = archive.to_path_buf();
    let the_destination = workspace.join(EXTRACTED_DIR);

    tokio::task::spawn_blocking(move || acquire_binary_blocking(&the_archive, &the_destination))
        .await
        .map_err(|err| ResolveError::extraction(archive, err))?
}

fn acquire_binary_blocking(archive: &Path, destination: &Path) -> Result<PathBuf> {
    unpack_tarball(archive, destination).map_err(|err| ResolveError::extraction(archive, err))?;
    debug!("📼 unpacked {} into {}", archive.display(), destination.display());

    let the_binary = find_file_named(destination, BINARY_NAME)
        .map_err(|err| ResolveError::extraction(archive, err))?
        .ok_or_else(|| {
            ResolveError::extraction(
                archive,
                format!("no '{}' binary inside {}", BINARY_NAME, destination.display()),
            )
        })?;

    info!("🎯 Found binary: {}", the_binary.display());
    Ok(the_binary)
}

fn unpack_tarball(archive: &Path, destination: &Path) -> io::Result<()> {
    // -- 🧹 a reused workspace still holds the last run's tree. one package per extracted-bin.
    if destination.try_exists()? {
        debug!("🧹 clearing previous extraction at {}", destination.display());
        std::fs::remove_dir_all(destination)?;
    }
    std::fs::create_dir_all(destination)?;
    let the_decoder = GzDecoder::new(File::open(archive)?);
    tar::Archive::new(the_decoder).unpack(destination)
}

/// 🔍 Depth-first, sorted, regular files only. Symlinks are not followed.
fn find_file_named(root: &Path, name: &str) -> io::Result<Option<PathBuf>> {
    let mut the_entries = std::fs::read_dir(root)?.collect::<io::Result<Vec<_>>>()?;
    the_entries.sort_by_key(|entry| entry.file_name());

    let mut the_subdirectories = Vec::new();
    for entry in the_entries {
        let file_type = entry.file_type()?;
        if file_type.is_file() && entry.file_name() == name {
            return Ok(Some(entry.path()));
        }
        if file_type.is_dir() {
            the_subdirectories.push(entry.path());
        }
    }

    for directory in the_subdirectories {
        if let Some(found) = find_file_named(&directory, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
