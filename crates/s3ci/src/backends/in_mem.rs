//! # Previously, on s3ci...
//!
//! 🎬 The bucket was in another region. The credentials were in another file.
//! The tests were in a hurry. Someone had to be a bucket without being a bucket.
//!
//! That someone was this module.
//!
//! `InMemoryBucket` is an [`ObjectStore`] that keeps its objects in a `Vec`, in
//! insertion order, so tests can shuffle listings on purpose and watch the resolver
//! not care. It can also be told to fail its listing partway through, for tests
//! that want to watch a transport error travel up the stack untouched.
//!
//! ✅ No network calls. No heartbeat. No mortgage on the line.
//! Just vibes and heap memory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::backends::{KeyStream, ObjectKey, ObjectStore};
use crate::error::{ResolveError, Result};

/// 📦 A bucket that fits in RAM and forgets everything on drop.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBucket {
    objects: Vec<(ObjectKey, Vec<u8>)>,
    // -- 💣 when set, listing yields this error after the matching keys run out
    listing_failure: Option<String>,
}

impl InMemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// ➕ Store `bytes` under `name`. Same name twice? Last write wins, like real S3.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        let bytes = bytes.into();
        let key = ObjectKey::new(name).with_size(bytes.len() as u64);
        self.objects.retain(|(existing, _)| existing.name != key.name);
        self.objects.push((key, bytes));
        self
    }

    /// 💣 Make every listing end in a transport error. For testing the sad path.
    pub fn fail_listing_with(&mut self, message: impl Into<String>) -> &mut Self {
        self.listing_failure = Some(message.into());
        self
    }

    fn bytes_for(&self, name: &str) -> Option<&[u8]> {
        self.objects
            .iter()
            .find(|(key, _)| key.name == name)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

#[async_trait]
impl ObjectStore for InMemoryBucket {
    fn list<'a>(&'a self, prefix: &'a str) -> KeyStream<'a> {
        let the_matches = self
            .objects
            .iter()
            .filter(move |(key, _)| key.name.starts_with(prefix))
            .map(|(key, _)| Ok(key.clone()));

        let the_failure = self
            .listing_failure
            .iter()
            .map(move |message| Err(ResolveError::transport("list", prefix, message)));

        stream::iter(the_matches.chain(the_failure)).boxed()
    }

    async fn download(&self, keys: &[ObjectKey], destination: &Path) -> Result<Vec<PathBuf>> {
        let mut the_written = Vec::with_capacity(keys.len());
        for key in keys {
            let bytes = self
                .bytes_for(&key.name)
                .ok_or_else(|| ResolveError::transport("download", &key.name, "NoSuchKey"))?;
            let target = destination.join(key.file_name());
            tokio::fs::write(&target, bytes)
                .await
                .map_err(|err| ResolveError::transport("write", target.display().to_string(), err))?;
            the_written.push(target);
        }
        Ok(the_written)
    }
}
