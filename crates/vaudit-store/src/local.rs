//! Local filesystem backend.

use std::fs::File;
use std::io;
use std::path::Path;

use vaudit_model::Status;

use crate::digest::{digest_reader, ChecksumAlgorithm};
use crate::{Result, StorageBackend, StoreError};

/// Backend over the local filesystem, used for unixfilesystem resources
/// whose vault lives on the audited server.
#[derive(Debug, Default, Clone)]
pub struct LocalFsBackend;

impl LocalFsBackend {
    pub fn new() -> Self {
        Self
    }

    fn stat_status(path: &str) -> Result<Status> {
        match std::fs::metadata(Path::new(path)) {
            Ok(_) => Ok(Status::Ok),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Status::NotExisting),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Ok(Status::AccessDenied),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

impl StorageBackend for LocalFsBackend {
    fn object_exists(&self, path: &str) -> Result<Status> {
        Self::stat_status(path)
    }

    fn collection_exists(&self, path: &str) -> Result<Status> {
        Self::stat_status(path)
    }

    fn size(&self, path: &str) -> Result<u64> {
        Ok(std::fs::metadata(Path::new(path))?.len())
    }

    fn checksum(&self, path: &str, algorithm: ChecksumAlgorithm) -> Result<String> {
        let file = File::open(Path::new(path))?;
        digest_reader(algorithm, file)
    }
}
