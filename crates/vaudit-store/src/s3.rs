//! S3-compatible object storage backend.
//!
//! Endpoint, region and credentials are resolved once per resource from
//! the resource's catalog context string and cached with the backend for
//! the lifetime of a run. The engine is a single logical thread, so the
//! async S3 client is driven to completion behind the synchronous
//! [`StorageBackend`] trait by a current-thread runtime owned here.

use std::time::Duration;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::Client;
use tracing::debug;

use vaudit_model::{ResourceRecord, Status};

use crate::digest::{ChecksumAlgorithm, DigestState};
use crate::{Result, StorageBackend, StoreError};

/// Context keys a storage resource of this kind must carry.
const CONTEXT_HOSTNAME: &str = "S3_DEFAULT_HOSTNAME";
const CONTEXT_AUTH_FILE: &str = "S3_AUTH_FILE";
const CONTEXT_REGION: &str = "S3_REGIONNAME";

/// Fixed key prefix under which the vault stores object bodies.
const VAULT_KEY_PREFIX: &str = "Vault";

const DEFAULT_REGION: &str = "us-east-1";

/// Bucket and key an object's physical path translates to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ObjectLocation {
    bucket: String,
    key: String,
}

/// Translate a vault-style physical path into bucket and key.
///
/// The first path segment names the bucket; the object key is the fixed
/// vault prefix followed by everything from the fourth segment on.
fn object_location(path: &str) -> Result<ObjectLocation> {
    let segments: Vec<&str> = path.split('/').collect();
    let bucket = segments
        .get(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::InvalidObjectPath(path.to_string()))?;
    let remainder = if segments.len() > 3 {
        segments[3..].join("/")
    } else {
        String::new()
    };
    Ok(ObjectLocation {
        bucket: bucket.to_string(),
        key: format!("{}/{}", VAULT_KEY_PREFIX, remainder),
    })
}

/// Outcome of a metadata-only existence probe.
enum HeadOutcome {
    Found { size: u64 },
    Missing,
    Denied,
}

/// Backend over an S3-compatible object store.
#[derive(Debug)]
pub struct S3Backend {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl S3Backend {
    /// Resolve connection parameters from the resource's context string
    /// and build a client for its endpoint.
    pub fn connect(resource: &ResourceRecord, operation_timeout: Duration) -> Result<Self> {
        let hostname = require_context(resource, CONTEXT_HOSTNAME)?;
        let auth_file = require_context(resource, CONTEXT_AUTH_FILE)?;
        let region = resource
            .context_value(CONTEXT_REGION)
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        let (access_key, secret_key) = read_auth_file(&resource.name, auth_file)?;
        let credentials = Credentials::new(access_key, secret_key, None, None, "vaudit");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(format!("https://{hostname}"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(operation_timeout)
                    .build(),
            )
            .build();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StoreError::Io)?;

        debug!(resource = %resource.name, endpoint = hostname, "object storage backend ready");
        Ok(Self {
            client: Client::from_conf(config),
            runtime,
        })
    }

    fn head(&self, path: &str) -> Result<HeadOutcome> {
        let location = object_location(path)?;
        self.runtime.block_on(async {
            let sent = self
                .client
                .head_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .send()
                .await;
            match sent {
                Ok(out) => Ok(HeadOutcome::Found {
                    size: out.content_length().unwrap_or(0).max(0) as u64,
                }),
                Err(SdkError::ServiceError(ctx)) if ctx.err().is_not_found() => {
                    Ok(HeadOutcome::Missing)
                }
                Err(SdkError::ServiceError(ctx)) if ctx.raw().status().as_u16() == 403 => {
                    Ok(HeadOutcome::Denied)
                }
                Err(err) => Err(StoreError::ObjectStore(
                    DisplayErrorContext(&err).to_string(),
                )),
            }
        })
    }
}

impl StorageBackend for S3Backend {
    fn object_exists(&self, path: &str) -> Result<Status> {
        Ok(match self.head(path)? {
            HeadOutcome::Found { .. } => Status::Ok,
            HeadOutcome::Missing => Status::NotExisting,
            HeadOutcome::Denied => Status::AccessDenied,
        })
    }

    /// Collections do not exist separately from objects on object storage.
    fn collection_exists(&self, _path: &str) -> Result<Status> {
        Ok(Status::Unknown)
    }

    fn size(&self, path: &str) -> Result<u64> {
        match self.head(path)? {
            HeadOutcome::Found { size } => Ok(size),
            HeadOutcome::Missing => Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("object vanished: {path}"),
            ))),
            HeadOutcome::Denied => Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("access denied: {path}"),
            ))),
        }
    }

    fn checksum(&self, path: &str, algorithm: ChecksumAlgorithm) -> Result<String> {
        let location = object_location(path)?;
        self.runtime.block_on(async {
            let sent = self
                .client
                .get_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .send()
                .await;
            let resp = match sent {
                Ok(resp) => resp,
                Err(SdkError::ServiceError(ctx)) if ctx.err().is_no_such_key() => {
                    return Err(StoreError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("object vanished: {path}"),
                    )))
                }
                Err(SdkError::ServiceError(ctx)) if ctx.raw().status().as_u16() == 403 => {
                    return Err(StoreError::Io(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        format!("access denied: {path}"),
                    )))
                }
                Err(err) => {
                    return Err(StoreError::ObjectStore(
                        DisplayErrorContext(&err).to_string(),
                    ))
                }
            };

            let mut state = DigestState::new(algorithm);
            let mut body = resp.body;
            while let Some(chunk) = body
                .try_next()
                .await
                .map_err(|e| StoreError::ObjectStore(e.to_string()))?
            {
                state.update(&chunk);
            }
            Ok(state.finalize())
        })
    }
}

fn require_context<'a>(resource: &'a ResourceRecord, key: &str) -> Result<&'a str> {
    resource
        .context_value(key)
        .ok_or_else(|| StoreError::MissingContext {
            resource: resource.name.clone(),
            key: key.to_string(),
        })
}

/// Read the two-line auth file (access key, secret key).
fn read_auth_file(resource_name: &str, path: &str) -> Result<(String, String)> {
    let contents = std::fs::read_to_string(path).map_err(|e| StoreError::Credentials {
        resource: resource_name.to_string(),
        detail: format!("{path}: {e}"),
    })?;
    let mut lines = contents.lines();
    let access = lines.next().unwrap_or("").trim().to_string();
    let secret = lines.next().unwrap_or("").trim().to_string();
    if access.is_empty() || secret.is_empty() {
        return Err(StoreError::Credentials {
            resource: resource_name.to_string(),
            detail: format!("{path}: expected access key and secret key lines"),
        });
    }
    Ok((access, secret))
}
