//! # mirror-s3
//!
//! S3-compatible implementation of the mirror-sync remote traits.
//!
//! Every trait call blocks on exactly one SDK request (or one paginated
//! listing) on a private current-thread runtime, so callers stay synchronous.

use std::collections::BTreeSet;
use std::path::Path;

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::runtime::Runtime;

use mirror_core::config::DEFAULT_REGION;
use mirror_core::{BucketName, MirrorConfig, ObjectKey, RemoteTimestamp};
use mirror_sync::{RemoteError, RemoteInventory, RemoteMutator};

/// Name attached to the static credentials handed to the SDK.
const CREDENTIALS_SOURCE: &str = "mirror-config";

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("failed to start I/O runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Object store reached over the S3 API.
#[derive(Debug)]
pub struct S3Store {
    client: Client,
    runtime: Runtime,
    region: String,
}

impl S3Store {
    /// Build a client for `config`'s endpoint, region and credentials.
    ///
    /// Uses path-style addressing so self-hosted endpoints work without
    /// per-bucket DNS. No request is sent.
    pub fn connect(config: &MirrorConfig) -> Result<Self, S3Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(S3Error::Runtime)?;

        let credentials = Credentials::new(
            config.credentials.access_key.clone(),
            config.credentials.secret_key.clone(),
            None,
            None,
            CREDENTIALS_SOURCE,
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint_url)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        tracing::debug!(endpoint = %config.endpoint_url, region = %config.region, "configured S3 client");
        Ok(Self {
            client: Client::from_conf(sdk_config),
            runtime,
            region: config.region.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Full error chain, including the service error code and message.
fn describe(err: impl std::error::Error) -> String {
    DisplayErrorContext(err).to_string()
}

fn is_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool {
    err.raw_response()
        .is_some_and(|response| response.status().as_u16() == 404)
}

/// Convert the store's last-modified value to UTC.
///
/// S3 reports whole seconds while local mtimes carry nanoseconds, so a file
/// written in the same second it was uploaded compares as newer on the next
/// run and is uploaded once more. The comparison itself stays strict.
fn to_remote_timestamp(last_modified: Option<&SdkDateTime>) -> RemoteTimestamp {
    last_modified
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
        .into()
}

/// `us-east-1` buckets are created without a location constraint.
fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    if region.is_empty() || region == DEFAULT_REGION {
        None
    } else {
        Some(BucketLocationConstraint::from(region))
    }
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

impl RemoteInventory for S3Store {
    fn list_keys(&self, bucket: &BucketName) -> Result<BTreeSet<ObjectKey>, RemoteError> {
        self.runtime.block_on(async {
            let mut keys = BTreeSet::new();
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(bucket.as_str())
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| RemoteError::Access(describe(e)))?;
                keys.extend(page.contents().iter().filter_map(|o| o.key()).map(ObjectKey::from));
            }
            Ok(keys)
        })
    }

    fn head_timestamp(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<RemoteTimestamp, RemoteError> {
        let request = self
            .client
            .head_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .send();
        match self.runtime.block_on(request) {
            Ok(output) => Ok(to_remote_timestamp(output.last_modified())),
            Err(err) if is_not_found(&err) => {
                tracing::warn!(key = %key, "object vanished between listing and head");
                Ok(RemoteTimestamp::Unknown)
            }
            Err(err) => Err(RemoteError::Access(describe(err))),
        }
    }
}

impl RemoteMutator for S3Store {
    fn bucket_exists(&self, bucket: &BucketName) -> Result<bool, RemoteError> {
        let request = self.client.head_bucket().bucket(bucket.as_str()).send();
        match self.runtime.block_on(request) {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(RemoteError::Access(describe(err))),
        }
    }

    fn create_bucket(&self, bucket: &BucketName) -> Result<(), RemoteError> {
        let mut request = self.client.create_bucket().bucket(bucket.as_str());
        if let Some(constraint) = location_constraint(&self.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }
        self.runtime
            .block_on(request.send())
            .map(|_| ())
            .map_err(|e| RemoteError::Permission(describe(e)))
    }

    fn upload(
        &self,
        local_path: &Path,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<(), RemoteError> {
        if !local_path.exists() {
            return Err(RemoteError::NotFound {
                path: local_path.to_path_buf(),
            });
        }
        self.runtime.block_on(async {
            let body = ByteStream::from_path(local_path)
                .await
                .map_err(|e| RemoteError::Transfer(format!("{}: {e}", local_path.display())))?;
            self.client
                .put_object()
                .bucket(bucket.as_str())
                .key(key.as_str())
                .body(body)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| RemoteError::Transfer(describe(e)))
        })
    }

    fn delete(&self, bucket: &BucketName, key: &ObjectKey) -> Result<(), RemoteError> {
        let request = self
            .client
            .delete_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .send();
        self.runtime
            .block_on(request)
            .map(|_| ())
            .map_err(|e| RemoteError::Transfer(describe(e)))
    }
}
