//! # vaudit-store
//!
//! Storage backend abstraction for the vaudit consistency checker.
//!
//! A [`StorageBackend`] answers four questions about a physical path:
//! does an object exist there, does a collection (directory) exist there,
//! how large is it, and what does its content hash to. Two backends are
//! supported: the local filesystem ([`LocalFsBackend`]) and S3-compatible
//! object storage ([`S3Backend`]). A [`BackendFactory`] resolves and caches
//! one backend per resource name for the lifetime of a run.
//!
//! Existence checks report expected failure modes (`NOT_EXISTING`,
//! `ACCESS_DENIED`) as [`Status`] values; any other I/O error is returned
//! as an [`Err`] and aborts the run, since it points at a misconfigured
//! backend rather than a data inconsistency.

pub mod digest;
pub mod factory;
pub mod local;
pub mod s3;

pub use digest::{ChecksumAlgorithm, ExpectedChecksum};
pub use factory::BackendFactory;
pub use local::LocalFsBackend;
pub use s3::S3Backend;

use std::io;

use thiserror::Error;

use vaudit_model::Status;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("resource {resource} has unsupported backend type {kind:?}")]
    UnsupportedBackend { resource: String, kind: String },

    #[error("resource {resource} is missing context key {key}")]
    MissingContext { resource: String, key: String },

    #[error("could not read credentials for resource {resource}: {detail}")]
    Credentials { resource: String, detail: String },

    #[error("unsupported checksum algorithm prefix {0:?}")]
    UnsupportedChecksum(String),

    #[error("physical path {0:?} does not name a bucket")]
    InvalidObjectPath(String),

    #[error("object storage error: {0}")]
    ObjectStore(String),
}

impl StoreError {
    /// Map an expected I/O failure to its reportable status.
    ///
    /// Not-found and permission-denied are part of the verification
    /// vocabulary; everything else returns `None` and stays fatal.
    pub fn as_status(&self) -> Option<Status> {
        match self {
            StoreError::Io(e) => match e.kind() {
                io::ErrorKind::NotFound => Some(Status::NotExisting),
                io::ErrorKind::PermissionDenied => Some(Status::AccessDenied),
                _ => None,
            },
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The closed set of backend kinds a leaf storage resource can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    UnixFilesystem,
    S3,
}

impl BackendKind {
    /// Parse the catalog's resource type string; `None` for coordinating
    /// or unrecognized types.
    pub fn from_type(resource_type: &str) -> Option<Self> {
        match resource_type {
            "unixfilesystem" => Some(BackendKind::UnixFilesystem),
            "s3" => Some(BackendKind::S3),
            _ => None,
        }
    }
}

/// Existence, size and checksum primitives over one storage backend.
pub trait StorageBackend: std::fmt::Debug {
    /// Whether an object exists at the physical path.
    fn object_exists(&self, path: &str) -> Result<Status>;

    /// Whether a collection (directory) exists at the physical path.
    ///
    /// Backends with no directory concept return [`Status::Unknown`].
    fn collection_exists(&self, path: &str) -> Result<Status>;

    /// Size in bytes of the object at the physical path.
    fn size(&self, path: &str) -> Result<u64>;

    /// Digest of the object's content, encoded the way the catalog encodes
    /// checksums of the given algorithm family.
    fn checksum(&self, path: &str, algorithm: ChecksumAlgorithm) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parsing() {
        assert_eq!(
            BackendKind::from_type("unixfilesystem"),
            Some(BackendKind::UnixFilesystem)
        );
        assert_eq!(BackendKind::from_type("s3"), Some(BackendKind::S3));
        assert_eq!(BackendKind::from_type("passthru"), None);
        assert_eq!(BackendKind::from_type("replication"), None);
    }

    #[test]
    fn io_errors_map_to_statuses() {
        let not_found = StoreError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(not_found.as_status(), Some(Status::NotExisting));

        let denied = StoreError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert_eq!(denied.as_status(), Some(Status::AccessDenied));

        let other = StoreError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(other.as_status(), None);

        let config = StoreError::UnsupportedChecksum("sha3".to_string());
        assert_eq!(config.as_status(), None);
    }
}
