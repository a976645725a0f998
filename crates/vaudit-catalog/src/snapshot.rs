//! JSON snapshot implementation of the catalog capability.
//!
//! A snapshot is an export of the three catalog tables the checker reads:
//!
//! ```json
//! {
//!   "resources":    [ { "id": 1, "name": "rootResc", ... } ],
//!   "collections":  [ { "id": 7, "name": "/tempZone/home" } ],
//!   "data_objects": [ { "id": 9, "collection_id": 7, ... } ]
//! }
//! ```
//!
//! All queries are answered from in-memory indexes built at load time.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use vaudit_model::{CollectionRecord, DataObjectRecord, ResourceRecord, HIERARCHY_DELIMITER};

use crate::{Catalog, Result};

/// On-disk shape of a catalog snapshot export.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub collections: Vec<CollectionRecord>,
    #[serde(default)]
    pub data_objects: Vec<DataObjectRecord>,
}

/// Catalog backed by a JSON snapshot export.
pub struct SnapshotCatalog {
    resources: Vec<ResourceRecord>,
    collections: Vec<CollectionRecord>,
    data_objects: Vec<DataObjectRecord>,
    resource_by_name: HashMap<String, usize>,
    resource_by_id: HashMap<i64, usize>,
    collection_by_name: HashMap<String, usize>,
}

impl SnapshotCatalog {
    /// Load a snapshot from a JSON export file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let snapshot: SnapshotFile = serde_json::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.as_ref().display(),
            resources = snapshot.resources.len(),
            collections = snapshot.collections.len(),
            data_objects = snapshot.data_objects.len(),
            "catalog snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Build a catalog from an already-parsed snapshot.
    pub fn from_snapshot(snapshot: SnapshotFile) -> Self {
        let resource_by_name = snapshot
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        let resource_by_id = snapshot
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        let collection_by_name = snapshot
            .collections
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self {
            resources: snapshot.resources,
            collections: snapshot.collections,
            data_objects: snapshot.data_objects,
            resource_by_name,
            resource_by_id,
            collection_by_name,
        }
    }

    fn collection_by_id(&self, id: i64) -> Option<&CollectionRecord> {
        self.collections.iter().find(|c| c.id == id)
    }
}

/// True when the resource appears anywhere in the hierarchy string.
fn hierarchy_includes(hierarchy: &str, resource_name: &str) -> bool {
    hierarchy
        .split(HIERARCHY_DELIMITER)
        .any(|segment| segment == resource_name)
}

/// True when `name` equals the restriction or lives under it.
fn within_collection(name: &str, root_collection: &str) -> bool {
    name == root_collection
        || name
            .strip_prefix(root_collection)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl Catalog for SnapshotCatalog {
    fn resource_by_name(&self, name: &str) -> Result<Option<ResourceRecord>> {
        Ok(self
            .resource_by_name
            .get(name)
            .map(|&i| self.resources[i].clone()))
    }

    fn resource_by_id(&self, id: i64) -> Result<Option<ResourceRecord>> {
        Ok(self
            .resource_by_id
            .get(&id)
            .map(|&i| self.resources[i].clone()))
    }

    fn resource_by_vault_path(
        &self,
        vault_path: &str,
        location: &str,
    ) -> Result<Option<ResourceRecord>> {
        Ok(self
            .resources
            .iter()
            .find(|r| r.vault_path == vault_path && r.location == location)
            .cloned())
    }

    fn resources(&self) -> Result<Vec<ResourceRecord>> {
        let mut out = self.resources.clone();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn collection_by_name(&self, name: &str) -> Result<Option<CollectionRecord>> {
        Ok(self
            .collection_by_name
            .get(name)
            .map(|&i| self.collections[i].clone()))
    }

    fn collection_on_resource(
        &self,
        name: &str,
        resource_name: &str,
    ) -> Result<Option<CollectionRecord>> {
        let Some(&i) = self.collection_by_name.get(name) else {
            return Ok(None);
        };
        let collection = &self.collections[i];
        let held = self
            .data_objects
            .iter()
            .any(|d| d.collection_id == collection.id && d.resource_name == resource_name);
        Ok(held.then(|| collection.clone()))
    }

    fn collections_with_replicas_under(
        &self,
        resource_name: &str,
        root_collection: Option<&str>,
    ) -> Result<Vec<CollectionRecord>> {
        let mut seen = Vec::new();
        for object in &self.data_objects {
            if !hierarchy_includes(&object.resource_hierarchy, resource_name) {
                continue;
            }
            if seen.contains(&object.collection_id) {
                continue;
            }
            seen.push(object.collection_id);
        }
        let mut out: Vec<CollectionRecord> = seen
            .into_iter()
            .filter_map(|id| self.collection_by_id(id))
            .filter(|c| root_collection.map_or(true, |root| within_collection(&c.name, root)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn replicas_in_collection(
        &self,
        collection_id: i64,
        hierarchy: &str,
    ) -> Result<Vec<DataObjectRecord>> {
        let mut out: Vec<DataObjectRecord> = self
            .data_objects
            .iter()
            .filter(|d| d.collection_id == collection_id && d.resource_hierarchy == hierarchy)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn replica_by_physical_path(
        &self,
        physical_path: &str,
        hierarchy: &str,
    ) -> Result<Option<DataObjectRecord>> {
        Ok(self
            .data_objects
            .iter()
            .find(|d| d.physical_path == physical_path && d.resource_hierarchy == hierarchy)
            .cloned())
    }

    fn replicas_of(
        &self,
        collection_id: i64,
        object_name: &str,
    ) -> Result<Vec<DataObjectRecord>> {
        let mut out: Vec<DataObjectRecord> = self
            .data_objects
            .iter()
            .filter(|d| d.collection_id == collection_id && d.name == object_name)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.resource_name.cmp(&b.resource_name));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> SnapshotCatalog {
        let json = r#"{
            "resources": [
                {"id": 1, "name": "rootResc", "type": "passthru",
                 "children": "leafA{};leafB{}", "location": "server.example.org",
                 "zone": "tempZone"},
                {"id": 2, "name": "leafA", "type": "unixfilesystem",
                 "parent_id": 1, "vault_path": "/vault/a",
                 "location": "server.example.org", "zone": "tempZone"},
                {"id": 3, "name": "leafB", "type": "unixfilesystem",
                 "parent_id": 1, "vault_path": "/vault/b",
                 "location": "other.example.org", "zone": "tempZone"}
            ],
            "collections": [
                {"id": 10, "name": "/tempZone/home/alice"},
                {"id": 11, "name": "/tempZone/home/alice/sub"},
                {"id": 12, "name": "/tempZone/home/bob"}
            ],
            "data_objects": [
                {"id": 100, "collection_id": 10,
                 "collection_name": "/tempZone/home/alice", "name": "a.txt",
                 "size": 5, "physical_path": "/vault/a/home/alice/a.txt",
                 "resource_name": "leafA",
                 "resource_hierarchy": "rootResc;leafA", "replica_status": 1},
                {"id": 101, "collection_id": 11,
                 "collection_name": "/tempZone/home/alice/sub", "name": "b.txt",
                 "size": 7, "physical_path": "/vault/a/home/alice/sub/b.txt",
                 "resource_name": "leafA",
                 "resource_hierarchy": "rootResc;leafA", "replica_status": 1},
                {"id": 102, "collection_id": 12,
                 "collection_name": "/tempZone/home/bob", "name": "c.txt",
                 "size": 9, "physical_path": "/vault/b/home/bob/c.txt",
                 "resource_name": "leafB",
                 "resource_hierarchy": "rootResc;leafB", "replica_status": 0}
            ]
        }"#;
        SnapshotCatalog::from_snapshot(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn resource_lookups() {
        let catalog = sample();
        let root = catalog.resource_by_name("rootResc").unwrap().unwrap();
        assert_eq!(root.child_names(), vec!["leafA", "leafB"]);
        assert!(catalog.resource_by_name("nope").unwrap().is_none());

        let leaf = catalog.resource_by_id(2).unwrap().unwrap();
        assert_eq!(leaf.name, "leafA");

        let by_vault = catalog
            .resource_by_vault_path("/vault/a", "server.example.org")
            .unwrap()
            .unwrap();
        assert_eq!(by_vault.name, "leafA");
        assert!(catalog
            .resource_by_vault_path("/vault/a", "elsewhere.example.org")
            .unwrap()
            .is_none());
    }

    #[test]
    fn collections_with_replicas_cover_all_leaves() {
        let catalog = sample();
        let names: Vec<String> = catalog
            .collections_with_replicas_under("rootResc", None)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "/tempZone/home/alice",
                "/tempZone/home/alice/sub",
                "/tempZone/home/bob"
            ]
        );
    }

    #[test]
    fn collection_restriction_is_prefix_aware() {
        let catalog = sample();
        let names: Vec<String> = catalog
            .collections_with_replicas_under("rootResc", Some("/tempZone/home/alice"))
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["/tempZone/home/alice", "/tempZone/home/alice/sub"]);

        // A sibling sharing the prefix without the separator must not match.
        assert!(catalog
            .collections_with_replicas_under("rootResc", Some("/tempZone/home/ali"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn replica_queries() {
        let catalog = sample();
        let replicas = catalog
            .replicas_in_collection(10, "rootResc;leafA")
            .unwrap();
        assert_eq!(replicas.len(), 1);
        assert_eq!(replicas[0].name, "a.txt");
        assert!(catalog
            .replicas_in_collection(10, "rootResc;leafB")
            .unwrap()
            .is_empty());

        let hit = catalog
            .replica_by_physical_path("/vault/a/home/alice/a.txt", "rootResc;leafA")
            .unwrap();
        assert!(hit.is_some());
        let miss = catalog
            .replica_by_physical_path("/vault/a/home/alice/a.txt", "rootResc;leafB")
            .unwrap();
        assert!(miss.is_none());

        let all = catalog.replicas_of(10, "a.txt").unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn collection_on_resource_requires_a_replica_there() {
        let catalog = sample();
        assert!(catalog
            .collection_on_resource("/tempZone/home/alice", "leafA")
            .unwrap()
            .is_some());
        assert!(catalog
            .collection_on_resource("/tempZone/home/alice", "leafB")
            .unwrap()
            .is_none());
        assert!(catalog
            .collection_on_resource("/tempZone/home/nobody", "leafA")
            .unwrap()
            .is_none());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut f = File::create(&path).unwrap();
        f.write_all(br#"{"resources": [], "collections": [], "data_objects": []}"#)
            .unwrap();

        let catalog = SnapshotCatalog::load(&path).unwrap();
        assert!(catalog.resources().unwrap().is_empty());

        std::fs::write(&path, b"{ not json").unwrap();
        assert!(SnapshotCatalog::load(&path).is_err());
    }
}
