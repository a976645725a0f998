//! The three check directions.
//!
//! Each check owns its per-run state (backend cache, options) and streams
//! results to a caller-supplied sink. `run()` emits the sink header
//! exactly once, even when a scan covers several resources or vaults.

mod objects;
mod resource;
mod vault;

pub use objects::ObjectListCheck;
pub use resource::ResourceCheck;
pub use vault::VaultCheck;

use vaudit_catalog::Catalog;
use vaudit_model::ResourceRecord;
use vaudit_store::{BackendFactory, BackendKind};

use crate::{EngineError, Result, RunOptions};

/// State shared by every check kind for the duration of one run.
pub(crate) struct CheckContext<'a> {
    pub catalog: &'a dyn Catalog,
    pub options: RunOptions,
    pub backends: BackendFactory,
}

impl<'a> CheckContext<'a> {
    /// Validate options against the catalog and set up per-run state.
    pub fn new(catalog: &'a dyn Catalog, options: RunOptions) -> Result<Self> {
        if let Some(root) = options.root_collection.as_deref() {
            if catalog.collection_by_name(root)?.is_none() {
                return Err(EngineError::RootCollectionNotFound(root.to_string()));
            }
        }
        let backends = BackendFactory::new(options.operation_timeout);
        Ok(Self {
            catalog,
            options,
            backends,
        })
    }

    /// Leaf storage resources hosted on the audited server, ordered by
    /// name. `kind` restricts to one backend kind (vault walks only make
    /// sense for filesystem-backed resources).
    pub fn local_storage_resources(
        &self,
        kind: Option<BackendKind>,
    ) -> Result<Vec<ResourceRecord>> {
        Ok(self
            .catalog
            .resources()?
            .into_iter()
            .filter(|r| r.is_leaf() && r.location == self.options.fqdn)
            .filter(|r| match BackendKind::from_type(&r.resource_type) {
                Some(found) => kind.map_or(true, |wanted| found == wanted),
                None => false,
            })
            .collect())
    }
}
