//! Catalog-to-storage direction.

use tracing::{debug, info};

use vaudit_catalog::Catalog;
use vaudit_model::{join_hierarchy, CheckResult, ObjectKind, ResourceRecord, Status};

use crate::check::CheckContext;
use crate::paths::logical_to_physical;
use crate::report::ReportSink;
use crate::resolver::{find_leaves, find_root, Leaf};
use crate::verify::ObjectVerifier;
use crate::{EngineError, Result, RunOptions};

/// Walks the catalog under a resource and checks that every collection
/// and replica it records is present and consistent in storage.
pub struct ResourceCheck<'a> {
    ctx: CheckContext<'a>,
    /// Resource to audit; `None` scans every locally-hosted storage
    /// resource of a supported type.
    target: Option<String>,
}

impl<'a> ResourceCheck<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        options: RunOptions,
        target: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            ctx: CheckContext::new(catalog, options)?,
            target,
        })
    }

    pub fn run(&mut self, sink: &mut dyn ReportSink) -> Result<()> {
        sink.head()?;

        let targets: Vec<ResourceRecord> = match &self.target {
            Some(name) => {
                let resource = self
                    .ctx
                    .catalog
                    .resource_by_name(name)?
                    .ok_or_else(|| EngineError::ResourceNotFound(name.clone()))?;
                vec![resource]
            }
            None => self.ctx.local_storage_resources(None)?,
        };

        for resource in targets {
            info!(resource = %resource.name, "checking resource for consistency");
            let (_, ancestors) = find_root(self.ctx.catalog, &resource)?;
            let leaves = find_leaves(
                self.ctx.catalog,
                &resource,
                ancestors,
                &self.ctx.options.fqdn,
            )?;
            for leaf in leaves {
                self.check_leaf(&resource, &leaf, sink)?;
            }
        }
        Ok(())
    }

    /// Check every collection holding replicas under the audited resource
    /// against this leaf's vault, then the replicas bound to the leaf's
    /// exact hierarchy.
    fn check_leaf(
        &mut self,
        scope: &ResourceRecord,
        leaf: &Leaf,
        sink: &mut dyn ReportSink,
    ) -> Result<()> {
        let hierarchy = join_hierarchy(&leaf.hierarchy);
        let backend = self.ctx.backends.backend_for(&leaf.resource)?;
        let verifier = ObjectVerifier::new(backend.as_ref(), self.ctx.options.verify_checksums);

        let collections = self.ctx.catalog.collections_with_replicas_under(
            &scope.name,
            self.ctx.options.root_collection.as_deref(),
        )?;

        for collection in collections {
            let physical = logical_to_physical(
                &collection.name,
                &leaf.resource.zone,
                &leaf.resource.vault_path,
            );
            let status = backend.collection_exists(&physical)?;
            let mut result =
                CheckResult::bare(ObjectKind::Collection, &collection.name, &physical, status);
            result.resource = Some(leaf.resource.name.clone());
            sink.write(&result)?;

            if !descend_into(status) {
                continue;
            }

            debug!(
                collection = %collection.name,
                hierarchy = %hierarchy,
                "checking data objects"
            );
            for object in self
                .ctx
                .catalog
                .replicas_in_collection(collection.id, &hierarchy)?
            {
                let result = verifier.verify(&object)?;
                sink.write(&result)?;
            }
        }
        Ok(())
    }
}

/// Whether the objects of a collection are still worth checking after the
/// collection-as-directory probe.
///
/// UNKNOWN means the backend has no directory concept (object storage),
/// so the objects within are checked anyway; an absent or unreadable
/// directory is not descended into.
fn descend_into(status: Status) -> bool {
    matches!(status, Status::Ok | Status::Unknown)
}
