//! Storage-to-catalog direction.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use vaudit_catalog::Catalog;
use vaudit_model::{join_hierarchy, CheckResult, ObjectKind, ResourceRecord, Status};
use vaudit_store::BackendKind;

use crate::check::CheckContext;
use crate::paths::{logical_to_physical, physical_to_logical};
use crate::report::ReportSink;
use crate::resolver::find_root;
use crate::verify::ObjectVerifier;
use crate::{EngineError, Result, RunOptions};

/// Logical path reported for storage entities the catalog does not know.
const UNKNOWN_PATH: &str = "UNKNOWN";

/// Walks a physical vault and checks that every directory and file is
/// registered in the catalog.
pub struct VaultCheck<'a> {
    ctx: CheckContext<'a>,
    /// Vault path to audit; `None` scans the vault of every locally-hosted
    /// filesystem storage resource.
    target: Option<PathBuf>,
}

impl<'a> VaultCheck<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        options: RunOptions,
        target: Option<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            ctx: CheckContext::new(catalog, options)?,
            target,
        })
    }

    pub fn run(&mut self, sink: &mut dyn ReportSink) -> Result<()> {
        sink.head()?;

        match self.target.take() {
            Some(path) => {
                if !path.exists() {
                    return Err(EngineError::VaultPathMissing(
                        path.to_string_lossy().to_string(),
                    ));
                }
                let resource = self.owning_resource(&path)?;
                self.check_vault(&resource, &path, sink)
            }
            None => {
                // Only filesystem-backed vaults can be walked.
                let resources = self
                    .ctx
                    .local_storage_resources(Some(BackendKind::UnixFilesystem))?;
                for resource in resources {
                    let walk_base = PathBuf::from(&resource.vault_path);
                    if !walk_base.exists() {
                        warn!(
                            resource = %resource.name,
                            vault = %resource.vault_path,
                            "vault path missing on this server, skipping"
                        );
                        continue;
                    }
                    self.check_vault(&resource, &walk_base, sink)?;
                }
                Ok(())
            }
        }
    }

    /// Find the storage resource whose vault contains `path`, walking the
    /// path upward until the catalog recognizes a vault path.
    fn owning_resource(&self, path: &Path) -> Result<ResourceRecord> {
        let mut current = path.to_path_buf();
        loop {
            if let Some(resource) = self
                .ctx
                .catalog
                .resource_by_vault_path(&current.to_string_lossy(), &self.ctx.options.fqdn)?
            {
                return Ok(resource);
            }
            match current.parent() {
                Some(parent) if parent != Path::new("/") && !parent.as_os_str().is_empty() => {
                    current = parent.to_path_buf();
                }
                _ => {
                    return Err(EngineError::VaultNotOwned(
                        path.to_string_lossy().to_string(),
                    ))
                }
            }
        }
    }

    fn check_vault(
        &mut self,
        resource: &ResourceRecord,
        walk_base: &Path,
        sink: &mut dyn ReportSink,
    ) -> Result<()> {
        info!(
            resource = %resource.name,
            path = %walk_base.display(),
            "checking vault for consistency"
        );

        let (_, ancestors) = find_root(self.ctx.catalog, resource)?;
        let mut chain = ancestors;
        chain.push(resource.name.clone());
        let hierarchy = join_hierarchy(&chain);

        let backend = self.ctx.backends.backend_for(resource)?;
        let verifier = ObjectVerifier::new(backend.as_ref(), self.ctx.options.verify_checksums);

        // A root collection restriction narrows the walk to its physical
        // counterpart inside this vault.
        let walk_root = match self.ctx.options.root_collection.as_deref() {
            Some(root) => PathBuf::from(logical_to_physical(
                root,
                &resource.zone,
                &resource.vault_path,
            )),
            None => walk_base.to_path_buf(),
        };

        let walker = WalkDir::new(&walk_root).min_depth(1).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if is_skippable_walk_error(&err) {
                        warn!(error = %err, "unreadable entry in vault, skipping");
                        continue;
                    }
                    return Err(EngineError::Io(
                        err.into_io_error()
                            .unwrap_or_else(|| io::Error::other("directory walk failed")),
                    ));
                }
            };
            let physical = entry.path().to_string_lossy().to_string();

            if entry.file_type().is_dir() {
                let collection_name =
                    physical_to_logical(&physical, &resource.zone, &resource.vault_path);
                let (logical, status) = match self
                    .ctx
                    .catalog
                    .collection_on_resource(&collection_name, &resource.name)?
                {
                    Some(collection) => (collection.name, Status::Ok),
                    None => (UNKNOWN_PATH.to_string(), Status::NotRegistered),
                };
                let mut result =
                    CheckResult::bare(ObjectKind::Directory, &logical, &physical, status);
                result.resource = Some(resource.name.clone());
                sink.write(&result)?;
            } else if entry.file_type().is_file() {
                match self
                    .ctx
                    .catalog
                    .replica_by_physical_path(&physical, &hierarchy)?
                {
                    Some(object) => {
                        let mut result = verifier.verify(&object)?;
                        // The walk saw a file, whatever the catalog calls it.
                        result.kind = ObjectKind::File;
                        sink.write(&result)?;
                    }
                    None => {
                        let mut result = CheckResult::bare(
                            ObjectKind::File,
                            UNKNOWN_PATH,
                            &physical,
                            Status::NotRegistered,
                        );
                        result.resource = Some(resource.name.clone());
                        sink.write(&result)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Unreadable entries are skipped like the rest of the expected failure
/// space; anything else aborts the walk.
fn is_skippable_walk_error(err: &walkdir::Error) -> bool {
    err.io_error().is_some_and(|io_err| {
        matches!(
            io_err.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
        )
    })
}
