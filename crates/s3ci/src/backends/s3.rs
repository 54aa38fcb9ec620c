//! 🪣📡 S3 Backend: the cloud-to-ground artifact paratrooper.
//!
//! INT. AWS CONSOLE. NIGHT. A lone bucket sits in us-east-1, bloated with
//! CI products. Thousands of tarballs. Every build of every series of every arch.
//! Someone typed `PUT` once and walked away. The tarballs have been waiting.
//!
//! This module wraps the AWS S3 SDK behind [`ObjectStore`]:
//! - `list()` pages `ListObjectsV2` lazily: the next page is requested only when the
//!   consumer runs out of keys from the current one.
//! - `download()` streams `GetObject` bodies chunk by chunk into a `BufWriter`,
//!   feeding a progress bar on stderr as it goes.
//!
//! 🧠 Knowledge graph:
//! - Credentials: from the s3cmd file (see `credentials.rs`), handed to the SDK as static keys.
//! - Region / endpoint: from `AppConfig`. A custom endpoint flips on path-style addressing,
//!   because MinIO and friends don't do virtual hosts.
//! - Retries: the SDK's standard policy. We add none.
//!
//! 🦆 The duck has no clearance for AWS. It watches from the edge of the VPC.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, trace};

use crate::app_config::AppConfig;
use crate::backends::{KeyStream, ObjectKey, ObjectStore};
use crate::credentials::Credentials;
use crate::error::{ResolveError, Result};
use crate::progress::DownloadProgress;

// -- 🏷️ shows up in SDK debug logs as the credential source
const CREDENTIALS_PROVIDER_NAME: &str = "s3cfg";

/// 🪣 One S3 bucket, one SDK client, zero caching.
#[derive(Debug, Clone)]
pub struct S3Bucket {
    client: Client,
    bucket: String,
}

impl S3Bucket {
    /// 🚀 Build an SDK client from the app config and the s3cmd keys.
    ///
    /// No network traffic happens here. The first request is the first `list()` page.
    pub async fn connect(app_config: &AppConfig, credentials: &Credentials) -> Self {
        let the_static_credentials = aws_sdk_s3::config::Credentials::new(
            credentials.access_key.clone(),
            credentials.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let mut the_loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(app_config.region.clone()))
            .credentials_provider(the_static_credentials);
        if let Some(endpoint_url) = &app_config.endpoint_url {
            the_loader = the_loader.endpoint_url(endpoint_url.clone());
        }
        let the_sdk_config = the_loader.load().await;

        let the_s3_config = aws_sdk_s3::config::Builder::from(&the_sdk_config)
            .force_path_style(app_config.endpoint_url.is_some())
            .build();

        debug!(
            "🪣 S3 client ready for bucket '{}' in region '{}'",
            app_config.bucket, app_config.region
        );

        Self {
            client: Client::from_conf(the_s3_config),
            bucket: app_config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Bucket {
    fn list<'a>(&'a self, prefix: &'a str) -> KeyStream<'a> {
        let the_pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        // 🔄 one page per pull, flattened into one key per item. The paginator tracks the
        // continuation token; we just keep asking until it says no.
        stream::unfold(the_pages, move |mut pages| async move {
            let the_page = pages.next().await?;
            let the_keys = the_page
                .map(|output| {
                    let keys: Vec<ObjectKey> = output
                        .contents()
                        .iter()
                        .filter_map(|object| {
                            object.key().map(|name| ObjectKey {
                                name: name.to_string(),
                                size: object.size().and_then(|size| u64::try_from(size).ok()),
                            })
                        })
                        .collect();
                    trace!("🪣 listed a page of {} keys under {}", keys.len(), prefix);
                    keys
                })
                .map_err(|err| {
                    ResolveError::transport("ListObjectsV2", prefix, DisplayErrorContext(&err))
                });
            Some((the_keys, pages))
        })
        .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<ObjectKey, ResolveError>)))
        .try_flatten()
        .boxed()
    }

    async fn download(&self, keys: &[ObjectKey], destination: &Path) -> Result<Vec<PathBuf>> {
        let mut the_written = Vec::with_capacity(keys.len());

        for key in keys {
            let the_target = destination.join(key.file_name());

            let the_response = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key.name)
                .send()
                .await
                .map_err(|err| {
                    ResolveError::transport("GetObject", &key.name, DisplayErrorContext(&err))
                })?;

            let the_total_size = the_response
                .content_length()
                .and_then(|length| u64::try_from(length).ok())
                .or(key.size)
                .unwrap_or(0);
            let mut the_progress =
                DownloadProgress::new(format!("s3://{}/{}", self.bucket, key.name), the_total_size);

            let the_write_error = |err: std::io::Error| {
                ResolveError::transport("write", the_target.display().to_string(), err)
            };

            let the_file = File::create(&the_target).await.map_err(the_write_error)?;
            let mut the_writer = BufWriter::new(the_file);
            let mut the_body = the_response.body;

            while let Some(chunk) = the_body
                .try_next()
                .await
                .map_err(|err| ResolveError::transport("GetObject", &key.name, err))?
            {
                the_writer.write_all(&chunk).await.map_err(the_write_error)?;
                the_progress.update(chunk.len() as u64);
            }
            the_writer.flush().await.map_err(the_write_error)?;
            the_progress.finish();

            debug!("📦 wrote {} to {}", key.name, the_target.display());
            the_written.push(the_target);
        }

        Ok(the_written)
    }
}
