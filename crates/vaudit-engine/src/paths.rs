//! Translation between the logical and physical path namespaces.
//!
//! Logical paths live under the zone prefix (`/zone/...`), physical paths
//! under the leaf resource's vault path. Translation is a prefix
//! substitution, applied to the first occurrence only so that a vault path
//! which itself contains the zone name cannot corrupt the remainder.

/// Zone prefix of every logical path in a zone.
pub fn zone_prefix(zone: &str) -> String {
    format!("/{zone}")
}

/// Logical collection or object path to its physical location in a vault.
pub fn logical_to_physical(logical: &str, zone: &str, vault_path: &str) -> String {
    logical.replacen(&zone_prefix(zone), vault_path, 1)
}

/// Physical vault path back to its logical name.
pub fn physical_to_logical(physical: &str, zone: &str, vault_path: &str) -> String {
    physical.replacen(vault_path, &zone_prefix(zone), 1)
}
