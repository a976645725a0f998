//! Catalog record types.
//!
//! These mirror the rows the catalog query capability returns: storage
//! resources, collections and data object replicas. They deserialize
//! directly from a catalog snapshot export.

use serde::{Deserialize, Serialize};

/// A node in the resource hierarchy tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: i64,
    pub name: String,
    /// Backend type string, e.g. `"unixfilesystem"`, `"s3"`, or a
    /// coordinating type such as `"passthru"`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Parent resource id; `None` marks the root of a hierarchy.
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Encoded child list. Children are `;`-separated and each name may be
    /// wrapped in `{}` decorations by the catalog.
    #[serde(default)]
    pub children: String,
    /// Base path of the vault; only meaningful for leaf storage resources.
    #[serde(default)]
    pub vault_path: String,
    /// Network location (FQDN) hosting this resource.
    #[serde(default)]
    pub location: String,
    /// Zone the resource belongs to; the zone name is the first segment of
    /// every logical path.
    #[serde(default)]
    pub zone: String,
    /// Free-form `key=value;key=value` context string carrying
    /// backend-specific configuration.
    #[serde(default)]
    pub context: String,
}

impl ResourceRecord {
    /// A resource with no children is a leaf storage resource.
    pub fn is_leaf(&self) -> bool {
        self.children.trim().is_empty()
    }

    /// Parse the encoded child list, stripping the `{}` decorations.
    pub fn child_names(&self) -> Vec<String> {
        self.children
            .split(';')
            .map(|c| c.trim().trim_matches(|ch| ch == '{' || ch == '}'))
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Look up a key in the context string.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim() == key)
            .map(|(_, v)| v.trim())
    }
}

/// A logical directory-like namespace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: i64,
    /// Absolute logical path, e.g. `/zone/home/user/data`.
    pub name: String,
}

/// One replica of a logical data object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObjectRecord {
    pub id: i64,
    pub collection_id: i64,
    /// Logical path of the owning collection.
    pub collection_name: String,
    /// Object name within the collection.
    pub name: String,
    /// Size declared by the catalog, in bytes.
    pub size: u64,
    /// Registered checksum, if any. Either `"sha2:<base64>"` or a bare
    /// legacy hex digest.
    #[serde(default)]
    pub checksum: Option<String>,
    /// Physical path of this replica in its vault.
    pub physical_path: String,
    /// Name of the leaf storage resource holding this replica.
    pub resource_name: String,
    /// Root-to-leaf resource hierarchy string binding this replica.
    pub resource_hierarchy: String,
    /// Raw replica state as stored by the catalog (0-4).
    pub replica_status: i32,
}

impl DataObjectRecord {
    /// Full logical path of the object.
    pub fn logical_path(&self) -> String {
        format!("{}/{}", self.collection_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(children: &str, context: &str) -> ResourceRecord {
        ResourceRecord {
            id: 1,
            name: "demoResc".to_string(),
            resource_type: "unixfilesystem".to_string(),
            parent_id: None,
            children: children.to_string(),
            vault_path: "/var/lib/vault".to_string(),
            location: "server.example.org".to_string(),
            zone: "tempZone".to_string(),
            context: context.to_string(),
        }
    }

    #[test]
    fn child_names_strip_decorations() {
        let r = resource("childA{};childB{}", "");
        assert_eq!(r.child_names(), vec!["childA", "childB"]);
        assert!(!r.is_leaf());

        let plain = resource("childA;childB", "");
        assert_eq!(plain.child_names(), vec!["childA", "childB"]);

        let leaf = resource("", "");
        assert!(leaf.is_leaf());
        assert!(leaf.child_names().is_empty());
    }

    #[test]
    fn context_lookup() {
        let r = resource(
            "",
            "S3_DEFAULT_HOSTNAME=s3.example.org;S3_AUTH_FILE=/etc/s3.auth;S3_REGIONNAME=eu-west-1",
        );
        assert_eq!(r.context_value("S3_DEFAULT_HOSTNAME"), Some("s3.example.org"));
        assert_eq!(r.context_value("S3_REGIONNAME"), Some("eu-west-1"));
        assert_eq!(r.context_value("MISSING"), None);
        assert_eq!(resource("", "").context_value("S3_AUTH_FILE"), None);
    }

    #[test]
    fn records_deserialize_from_snapshot_json() {
        let json = r#"{
            "id": 10014,
            "name": "leafResc",
            "type": "unixfilesystem",
            "parent_id": 10001,
            "vault_path": "/var/lib/vault",
            "location": "server.example.org",
            "zone": "tempZone"
        }"#;
        let r: ResourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.name, "leafResc");
        assert_eq!(r.parent_id, Some(10001));
        assert!(r.is_leaf());
        assert_eq!(r.context, "");
    }

    #[test]
    fn data_object_logical_path() {
        let d = DataObjectRecord {
            id: 1,
            collection_id: 2,
            collection_name: "/tempZone/home/alice".to_string(),
            name: "data.bin".to_string(),
            size: 100,
            checksum: None,
            physical_path: "/var/lib/vault/home/alice/data.bin".to_string(),
            resource_name: "leafResc".to_string(),
            resource_hierarchy: "rootResc;leafResc".to_string(),
            replica_status: 1,
        };
        assert_eq!(d.logical_path(), "/tempZone/home/alice/data.bin");
    }
}
