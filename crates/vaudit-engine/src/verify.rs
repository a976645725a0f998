//! Per-object verification.

use vaudit_model::{
    CheckResult, DataObjectRecord, ObjectKind, ObservedValues, ReplicaHealth, Status,
};
use vaudit_store::{ExpectedChecksum, StorageBackend, StoreError};

use crate::Result;

/// Compares one catalog replica record against the bytes its backend
/// holds.
///
/// Verification is a pure function of (record, backend state): verifying
/// the same pair twice with no change to underlying storage yields
/// identical results.
pub struct ObjectVerifier<'a> {
    backend: &'a dyn StorageBackend,
    verify_checksums: bool,
}

impl<'a> ObjectVerifier<'a> {
    pub fn new(backend: &'a dyn StorageBackend, verify_checksums: bool) -> Self {
        Self {
            backend,
            verify_checksums,
        }
    }

    /// Check existence, size, checksum and replica health for one record.
    ///
    /// An unknown replica state in the catalog is a hard failure: it means
    /// a lifecycle state this checker does not understand yet, not a data
    /// inconsistency.
    pub fn verify(&self, object: &DataObjectRecord) -> Result<CheckResult> {
        let health = ReplicaHealth::try_from(object.replica_status)?;
        let mut observed = ObservedValues::default();

        let mut status = self.backend.object_exists(&object.physical_path)?;
        if status == Status::Ok {
            status = self.compare_size(object, &mut observed)?;
            if status == Status::Ok && self.verify_checksums {
                status = self.compare_checksum(object, &mut observed)?;
            }
            if !health.is_good() {
                // Override the status but keep the gathered observations:
                // size and checksum facts stay useful even for an
                // unhealthy replica.
                status = Status::ReplicaNotGood;
            }
        }

        Ok(CheckResult {
            kind: ObjectKind::DataObject,
            logical_path: object.logical_path(),
            physical_path: object.physical_path.clone(),
            status,
            replica_health: Some(health),
            observed,
            resource: Some(object.resource_name.clone()),
        })
    }

    fn compare_size(
        &self,
        object: &DataObjectRecord,
        observed: &mut ObservedValues,
    ) -> Result<Status> {
        let size = match self.backend.size(&object.physical_path) {
            Ok(size) => size,
            Err(err) => return reportable_or_fatal(err),
        };
        observed.expected_filesize = Some(object.size);
        observed.observed_filesize = Some(size);
        if size != object.size {
            return Ok(Status::FileSizeMismatch);
        }
        Ok(Status::Ok)
    }

    fn compare_checksum(
        &self,
        object: &DataObjectRecord,
        observed: &mut ObservedValues,
    ) -> Result<Status> {
        let Some(raw) = object.checksum.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(Status::NoChecksum);
        };
        let expected = ExpectedChecksum::parse(raw)?;
        let computed = match self.backend.checksum(&object.physical_path, expected.algorithm) {
            Ok(digest) => digest,
            Err(err) => return reportable_or_fatal(err),
        };
        observed.expected_checksum = Some(expected.value.clone());
        observed.observed_checksum = Some(computed.clone());
        if computed != expected.value {
            return Ok(Status::ChecksumMismatch);
        }
        Ok(Status::Ok)
    }
}

/// Storage races (vanished object) and permission failures are part of
/// the verification vocabulary; anything else aborts the run.
fn reportable_or_fatal(err: StoreError) -> Result<Status> {
    match err.as_status() {
        Some(status) => Ok(status),
        None => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use vaudit_store::LocalFsBackend;

    fn object(dir: &std::path::Path, name: &str, size: u64, checksum: Option<&str>) -> DataObjectRecord {
        DataObjectRecord {
            id: 1,
            collection_id: 10,
            collection_name: "/tempZone/home/alice".to_string(),
            name: name.to_string(),
            size,
            checksum: checksum.map(str::to_string),
            physical_path: dir.join(name).to_string_lossy().to_string(),
            resource_name: "leafResc".to_string(),
            resource_hierarchy: "rootResc;leafResc".to_string(),
            replica_status: 1,
        }
    }

    #[test]
    fn matching_object_with_no_checksum_registered() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("a.bin")).unwrap();
        f.write_all(&[0u8; 100]).unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let result = verifier.verify(&object(dir.path(), "a.bin", 100, None)).unwrap();

        assert_eq!(result.status, Status::NoChecksum);
        assert_eq!(result.observed.expected_filesize, Some(100));
        assert_eq!(result.observed.observed_filesize, Some(100));
        assert_eq!(result.replica_health, Some(ReplicaHealth::GoodReplica));
        assert_eq!(result.logical_path, "/tempZone/home/alice/a.bin");
    }

    #[test]
    fn size_mismatch_skips_the_checksum_step() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.bin"), [0u8; 40]).unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let record = object(dir.path(), "b.bin", 50, Some("sha2:bogus"));
        let result = verifier.verify(&record).unwrap();

        assert_eq!(result.status, Status::FileSizeMismatch);
        assert_eq!(result.observed.observed_filesize, Some(40));
        assert_eq!(result.observed.expected_filesize, Some(50));
        assert!(result.observed.expected_checksum.is_none());
        assert!(result.observed.observed_checksum.is_none());
    }

    #[test]
    fn absent_object_carries_no_observations() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let result = verifier.verify(&object(dir.path(), "ghost.bin", 10, None)).unwrap();

        assert_eq!(result.status, Status::NotExisting);
        assert!(result.observed.is_empty());
    }

    #[test]
    fn checksum_families_compare_in_their_own_encoding() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c.bin"), b"hello world").unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);

        let legacy = object(
            dir.path(),
            "c.bin",
            11,
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3"),
        );
        assert_eq!(verifier.verify(&legacy).unwrap().status, Status::Ok);

        let sha = object(
            dir.path(),
            "c.bin",
            11,
            Some("sha2:uU0nuZNNPgilLlLX2n562+xIT+OnU4DukIj3rOLvzek="),
        );
        assert_eq!(verifier.verify(&sha).unwrap().status, Status::Ok);

        let wrong = object(dir.path(), "c.bin", 11, Some("sha2:AAAA"));
        let result = verifier.verify(&wrong).unwrap();
        assert_eq!(result.status, Status::ChecksumMismatch);
        assert_eq!(result.observed.expected_checksum.as_deref(), Some("AAAA"));
        assert_eq!(
            result.observed.observed_checksum.as_deref(),
            Some("uU0nuZNNPgilLlLX2n562+xIT+OnU4DukIj3rOLvzek=")
        );
    }

    #[test]
    fn unhealthy_replica_overrides_status_but_keeps_observations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("d.bin"), [0u8; 40]).unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let mut record = object(dir.path(), "d.bin", 50, None);
        record.replica_status = 0; // stale
        let result = verifier.verify(&record).unwrap();

        assert_eq!(result.status, Status::ReplicaNotGood);
        assert_eq!(result.replica_health, Some(ReplicaHealth::StaleReplica));
        assert_eq!(result.observed.observed_filesize, Some(40));
        assert_eq!(result.observed.expected_filesize, Some(50));
    }

    #[test]
    fn absent_stale_replica_reports_not_existing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let mut record = object(dir.path(), "ghost.bin", 10, None);
        record.replica_status = 0;
        let result = verifier.verify(&record).unwrap();
        assert_eq!(result.status, Status::NotExisting);
    }

    #[test]
    fn unknown_replica_state_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("e.bin"), b"x").unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let mut record = object(dir.path(), "e.bin", 1, None);
        record.replica_status = 7;
        assert!(verifier.verify(&record).is_err());
    }

    #[test]
    fn unknown_checksum_prefix_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.bin"), b"x").unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let record = object(dir.path(), "f.bin", 1, Some("sha3:deadbeef"));
        assert!(verifier.verify(&record).is_err());
    }

    #[test]
    fn disabled_checksum_verification_stops_at_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("g.bin"), b"hello world").unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, false);
        let record = object(dir.path(), "g.bin", 11, Some("sha2:AAAA"));
        let result = verifier.verify(&record).unwrap();

        assert_eq!(result.status, Status::Ok);
        assert!(result.observed.expected_checksum.is_none());
    }

    #[test]
    fn verification_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("h.bin"), b"hello world").unwrap();

        let backend = LocalFsBackend::new();
        let verifier = ObjectVerifier::new(&backend, true);
        let record = object(
            dir.path(),
            "h.bin",
            11,
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3"),
        );
        let first = verifier.verify(&record).unwrap();
        let second = verifier.verify(&record).unwrap();
        assert_eq!(first, second);
    }
}
