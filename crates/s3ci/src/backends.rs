//! 🔌 Backends: where the real I/O happens.
//!
//! 🪣 A backend lists keys under a prefix and downloads the ones we pick.
//! That is the whole job. No uploads. No deletes. No opinions about which key wins;
//! that's the resolver's burden to carry.
//!
//! 🧠 Knowledge graph:
//! - Pattern: `ObjectStore` trait → concrete impls (`S3Bucket`, `InMemoryBucket`).
//! - `list()` is a lazy, finite stream. Pages are fetched as the consumer pulls.
//!   Not restartable mid-stream. Want a second pass? Call `list()` again.
//! - `download()` writes `destination/<file name>` for each key. Transport failures come
//!   back as `ResolveError::Transport`, unretried by us (the SDK does its own thing).
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

pub mod in_mem;
pub mod s3;

pub use in_mem::InMemoryBucket;
pub use s3::S3Bucket;

/// 🗝️ A handle to one stored object. The resolver only ever reads `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    /// 📍 Full key, e.g. `juju-ci/products/version-1/build-binary-trusty-amd64/build-7/juju-core_1.2.3-trusty-amd64.tgz`
    pub name: String,
    /// 📏 Size in bytes, when the listing bothered to say.
    pub size: Option<u64>,
}

impl ObjectKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// 📄 The last `/` segment. This is what lands on disk.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// 🌊 The lazy listing. One `ObjectKey` at a time, errors inline.
pub type KeyStream<'a> = BoxStream<'a, Result<ObjectKey>>;

/// 🪣 A bucket, abstractly.
///
/// # Contract 📜
/// - `list` yields every key under `prefix`, in whatever order the store feels like.
/// - `download` fetches each key into `destination/<file name>` and returns those paths, in order.
/// - Nothing here retries. If the store blinks, the error goes straight up.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    fn list<'a>(&'a self, prefix: &'a str) -> KeyStream<'a>;

    async fn download(&self, keys: &[ObjectKey], destination: &Path) -> Result<Vec<PathBuf>>;
}
