//! Backend resolution and per-run caching.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use vaudit_model::ResourceRecord;

use crate::{BackendKind, LocalFsBackend, Result, S3Backend, StorageBackend, StoreError};

/// Resolves one [`StorageBackend`] per leaf resource and caches it for the
/// lifetime of a run.
///
/// The cache is owned by the running check, not process-wide: it is built
/// at run start and dropped with the run.
pub struct BackendFactory {
    operation_timeout: Duration,
    cache: HashMap<String, Arc<dyn StorageBackend>>,
}

impl BackendFactory {
    pub fn new(operation_timeout: Duration) -> Self {
        Self {
            operation_timeout,
            cache: HashMap::new(),
        }
    }

    /// Backend for a leaf storage resource, constructed on first use.
    ///
    /// An unrecognized backend type is a fatal configuration error.
    pub fn backend_for(&mut self, resource: &ResourceRecord) -> Result<Arc<dyn StorageBackend>> {
        if let Some(backend) = self.cache.get(&resource.name) {
            return Ok(Arc::clone(backend));
        }

        let backend: Arc<dyn StorageBackend> =
            match BackendKind::from_type(&resource.resource_type) {
                Some(BackendKind::UnixFilesystem) => Arc::new(LocalFsBackend::new()),
                Some(BackendKind::S3) => {
                    Arc::new(S3Backend::connect(resource, self.operation_timeout)?)
                }
                None => {
                    return Err(StoreError::UnsupportedBackend {
                        resource: resource.name.clone(),
                        kind: resource.resource_type.clone(),
                    })
                }
            };

        debug!(resource = %resource.name, kind = %resource.resource_type, "backend constructed");
        self.cache
            .insert(resource.name.clone(), Arc::clone(&backend));
        Ok(backend)
    }
}
