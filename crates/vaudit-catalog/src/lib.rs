//! # vaudit-catalog
//!
//! Catalog query capability for the vaudit consistency checker.
//!
//! The check engine consumes the catalog through the [`Catalog`] trait: a
//! set of filtered lookups over resources, collections and data object
//! replicas. "No result" is an `Ok(None)` / empty `Vec`, distinct from a
//! query error.
//!
//! The shipped implementation is [`SnapshotCatalog`], which answers every
//! query from a JSON export of the catalog tables. The live catalog's wire
//! protocol is out of scope; this trait is the seam where a networked
//! implementation would plug in.

pub mod snapshot;

pub use snapshot::SnapshotCatalog;

use thiserror::Error;

use vaudit_model::{CollectionRecord, DataObjectRecord, ResourceRecord};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("catalog query failed: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Filtered lookups over the catalog tables.
///
/// Multi-row results are returned in a deterministic order so that check
/// output is reproducible across runs.
pub trait Catalog {
    fn resource_by_name(&self, name: &str) -> Result<Option<ResourceRecord>>;

    fn resource_by_id(&self, id: i64) -> Result<Option<ResourceRecord>>;

    /// Resource whose vault path and network location match exactly.
    fn resource_by_vault_path(
        &self,
        vault_path: &str,
        location: &str,
    ) -> Result<Option<ResourceRecord>>;

    /// Every resource in the catalog, ordered by name.
    fn resources(&self) -> Result<Vec<ResourceRecord>>;

    fn collection_by_name(&self, name: &str) -> Result<Option<CollectionRecord>>;

    /// Collection by exact name, scoped to a leaf storage resource: the
    /// collection must hold at least one replica on that resource.
    fn collection_on_resource(
        &self,
        name: &str,
        resource_name: &str,
    ) -> Result<Option<CollectionRecord>>;

    /// Collections holding replicas anywhere under the given resource
    /// (the resource appears in the replica's hierarchy string),
    /// optionally restricted to one collection sub-tree (matched by exact
    /// name or by `name/` path prefix). Ordered by name.
    fn collections_with_replicas_under(
        &self,
        resource_name: &str,
        root_collection: Option<&str>,
    ) -> Result<Vec<CollectionRecord>>;

    /// Replicas in a collection bound to exactly the given resource
    /// hierarchy string. Ordered by object name.
    fn replicas_in_collection(
        &self,
        collection_id: i64,
        hierarchy: &str,
    ) -> Result<Vec<DataObjectRecord>>;

    /// Replica matching an exact physical path and resource hierarchy.
    fn replica_by_physical_path(
        &self,
        physical_path: &str,
        hierarchy: &str,
    ) -> Result<Option<DataObjectRecord>>;

    /// All replicas of a named object within a collection, ordered by
    /// resource name.
    fn replicas_of(&self, collection_id: i64, object_name: &str)
        -> Result<Vec<DataObjectRecord>>;
}
