//! # vaudit-model
//!
//! Shared result and record types for the vaudit consistency checker.
//!
//! The checker compares a logical object catalog against the physical bytes
//! in storage vaults and emits one [`CheckResult`] per inspected entity.
//! This crate defines the outcome taxonomy ([`Status`]), the replica health
//! taxonomy ([`ReplicaHealth`]) and the catalog record types the rest of
//! the workspace operates on.

pub mod records;

pub use records::{CollectionRecord, DataObjectRecord, ResourceRecord};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delimiter between resource names in a resource hierarchy string.
pub const HIERARCHY_DELIMITER: &str = ";";

/// Join root-to-leaf resource names into a resource hierarchy string.
pub fn join_hierarchy<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(HIERARCHY_DELIMITER)
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("unknown replica state {0}")]
    UnknownReplicaState(i32),
}

/// Outcome of checking a single entity.
///
/// Anything other than `Ok` is a reportable discrepancy, not an error:
/// discrepancies are the product of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Catalog and storage agree.
    Ok,
    /// Registered in the catalog but absent from storage.
    NotExisting,
    /// Present in storage but unknown to the catalog.
    NotRegistered,
    /// Declared and observed sizes differ.
    FileSizeMismatch,
    /// Declared and computed checksums differ.
    ChecksumMismatch,
    /// Storage denied access to the entity.
    AccessDenied,
    /// The catalog has no checksum registered for the object.
    NoChecksum,
    /// No replica of the object lives on the audited server.
    NoLocalReplica,
    /// The object could not be resolved in the catalog at all.
    NotFound,
    /// The replica is in a state other than good.
    ReplicaNotGood,
    /// The backend cannot answer the question (e.g. directories on object
    /// storage).
    Unknown,
}

impl Status {
    /// Wire name of the status, as consumed by reporting.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotExisting => "NOT_EXISTING",
            Status::NotRegistered => "NOT_REGISTERED",
            Status::FileSizeMismatch => "FILE_SIZE_MISMATCH",
            Status::ChecksumMismatch => "CHECKSUM_MISMATCH",
            Status::AccessDenied => "ACCESS_DENIED",
            Status::NoChecksum => "NO_CHECKSUM",
            Status::NoLocalReplica => "NO_LOCAL_REPLICA",
            Status::NotFound => "NOT_FOUND",
            Status::ReplicaNotGood => "REPLICA_NOT_GOOD",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of a single replica as recorded by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaHealth {
    StaleReplica,
    GoodReplica,
    IntermediateReplica,
    ReadLocked,
    WriteLocked,
}

impl ReplicaHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaHealth::StaleReplica => "STALE_REPLICA",
            ReplicaHealth::GoodReplica => "GOOD_REPLICA",
            ReplicaHealth::IntermediateReplica => "INTERMEDIATE_REPLICA",
            ReplicaHealth::ReadLocked => "READ_LOCKED",
            ReplicaHealth::WriteLocked => "WRITE_LOCKED",
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, ReplicaHealth::GoodReplica)
    }
}

impl TryFrom<i32> for ReplicaHealth {
    type Error = ModelError;

    /// Decode the catalog's raw replica state.
    ///
    /// A value outside the known taxonomy is an error, not a silent
    /// fallback: it means the catalog schema has grown a lifecycle state
    /// this checker does not understand yet.
    fn try_from(raw: i32) -> Result<Self, ModelError> {
        match raw {
            0 => Ok(ReplicaHealth::StaleReplica),
            1 => Ok(ReplicaHealth::GoodReplica),
            2 => Ok(ReplicaHealth::IntermediateReplica),
            3 => Ok(ReplicaHealth::ReadLocked),
            4 => Ok(ReplicaHealth::WriteLocked),
            other => Err(ModelError::UnknownReplicaState(other)),
        }
    }
}

impl fmt::Display for ReplicaHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity a [`CheckResult`] describes.
///
/// `Collection` and `DataObject` are catalog-side entities seen by the
/// catalog-to-storage direction; `Directory` and `File` are storage-side
/// entities seen by the storage-to-catalog direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Collection,
    DataObject,
    File,
    Directory,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Collection => "collection",
            ObjectKind::DataObject => "dataobject",
            ObjectKind::File => "file",
            ObjectKind::Directory => "directory",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed-versus-expected facts gathered while checking one object.
///
/// Fields are populated only when the corresponding comparison actually
/// ran; an absent object carries no observations at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedValues {
    pub expected_filesize: Option<u64>,
    pub observed_filesize: Option<u64>,
    pub expected_checksum: Option<String>,
    pub observed_checksum: Option<String>,
}

impl ObservedValues {
    pub fn is_empty(&self) -> bool {
        self.expected_filesize.is_none()
            && self.observed_filesize.is_none()
            && self.expected_checksum.is_none()
            && self.observed_checksum.is_none()
    }

    /// Populated fields in a fixed presentation order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = self.expected_filesize {
            out.push(("expected_filesize", v.to_string()));
        }
        if let Some(v) = self.observed_filesize {
            out.push(("observed_filesize", v.to_string()));
        }
        if let Some(v) = &self.expected_checksum {
            out.push(("expected_checksum", v.clone()));
        }
        if let Some(v) = &self.observed_checksum {
            out.push(("observed_checksum", v.clone()));
        }
        out
    }
}

/// One check outcome, constructed once per inspected entity and handed to
/// the report sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: ObjectKind,
    /// Logical catalog path, or `"UNKNOWN"` for unregistered storage
    /// entities.
    pub logical_path: String,
    /// Physical path in the vault; empty when the entity never resolved to
    /// storage.
    pub physical_path: String,
    pub status: Status,
    /// Health of the inspected replica; `None` where the notion does not
    /// apply (collections, unregistered files).
    pub replica_health: Option<ReplicaHealth>,
    pub observed: ObservedValues,
    /// Name of the owning leaf storage resource, when known.
    pub resource: Option<String>,
}

impl CheckResult {
    /// Result for an entity that never made it to a per-object comparison.
    pub fn bare(kind: ObjectKind, logical_path: &str, physical_path: &str, status: Status) -> Self {
        Self {
            kind,
            logical_path: logical_path.to_string(),
            physical_path: physical_path.to_string(),
            status,
            replica_health: None,
            observed: ObservedValues::default(),
            resource: None,
        }
    }
}
