//! # vaudit-engine
//!
//! Cross-validation engine of the vaudit consistency checker.
//!
//! Three checks cover the two traversal directions plus a targeted
//! spot-check:
//!
//! - [`check::ResourceCheck`] walks the catalog (collections, then
//!   replicas) and asks the storage backend whether each entity exists and
//!   matches.
//! - [`check::VaultCheck`] walks the physical vault and asks the catalog
//!   whether each directory and file is registered.
//! - [`check::ObjectListCheck`] verifies the local replicas of an
//!   externally supplied list of logical object paths.
//!
//! Every inspected entity produces exactly one
//! [`CheckResult`](vaudit_model::CheckResult), pushed to a
//! [`report::ReportSink`]. Each check run is one logical thread of
//! control; per-run state (the backend cache, the resource locality map)
//! is owned by the running check and dropped with it.

pub mod check;
pub mod paths;
pub mod report;
pub mod resolver;
pub mod verify;

pub use check::{ObjectListCheck, ResourceCheck, VaultCheck};
pub use verify::ObjectVerifier;

use std::io;
use std::time::Duration;

use thiserror::Error;

use vaudit_catalog::CatalogError;
use vaudit_model::ModelError;
use vaudit_store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no resource found named {0:?}")]
    ResourceNotFound(String),

    #[error("resource hierarchy has a parent cycle through {0:?}")]
    HierarchyCycle(String),

    #[error("vault path {0:?} does not exist")]
    VaultPathMissing(String),

    #[error("no storage resource owns vault path {0:?}")]
    VaultNotOwned(String),

    #[error("root collection {0:?} not found")]
    RootCollectionNotFound(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Options shared by every check run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// FQDN of the server being audited; storage resources hosted
    /// elsewhere are skipped or treated as remote.
    pub fqdn: String,
    /// Restrict the catalog direction to one collection sub-tree.
    pub root_collection: Option<String>,
    /// Verify registered checksums in addition to presence and size.
    pub verify_checksums: bool,
    /// Applied to object storage operations.
    pub operation_timeout: Duration,
}

impl RunOptions {
    pub fn new(fqdn: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            root_collection: None,
            verify_checksums: true,
            operation_timeout: Duration::from_secs(600),
        }
    }
}
