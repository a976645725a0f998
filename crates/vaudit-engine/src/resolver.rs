//! Resource hierarchy resolution.
//!
//! A hierarchy is a tree of named resources: coordinating resources route
//! to children, leaf storage resources hold the bytes. Checks need both
//! ends: the root (collections are enumerated against it) and the leaves
//! (each one maps to a vault and a backend).

use std::collections::{HashSet, VecDeque};

use tracing::{info, warn};

use vaudit_catalog::Catalog;
use vaudit_model::ResourceRecord;

use crate::{EngineError, Result};

/// A leaf storage resource together with its root-to-leaf name chain.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub resource: ResourceRecord,
    /// Resource names from the hierarchy root down to this leaf.
    pub hierarchy: Vec<String>,
}

/// Climb to the root of the hierarchy containing `resource`.
///
/// Returns the root together with the ordered list of strict ancestors of
/// `resource` (root first). The walk is iterative with a visited set: a
/// parent cycle means the hierarchy is malformed and is a fatal error
/// rather than an endless climb.
pub fn find_root(
    catalog: &dyn Catalog,
    resource: &ResourceRecord,
) -> Result<(ResourceRecord, Vec<String>)> {
    let mut ancestors = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(resource.name.clone());

    let mut current = resource.clone();
    while let Some(parent_id) = current.parent_id {
        let parent = catalog
            .resource_by_id(parent_id)?
            .ok_or_else(|| EngineError::ResourceNotFound(format!("resource id {parent_id}")))?;
        if !visited.insert(parent.name.clone()) {
            return Err(EngineError::HierarchyCycle(parent.name));
        }
        ancestors.push(parent.name.clone());
        current = parent;
    }
    ancestors.reverse();
    info!(root = %current.name, "hierarchy root resolved");
    Ok((current, ancestors))
}

/// Enumerate the leaf storage resources reachable from `start`,
/// breadth-first.
///
/// `ancestors` is the chain above `start` (as returned by [`find_root`]).
/// A childless resource hosted on another server is remote: it is
/// reported and skipped, so hierarchies spanning several servers can be
/// audited server by server.
pub fn find_leaves(
    catalog: &dyn Catalog,
    start: &ResourceRecord,
    ancestors: Vec<String>,
    fqdn: &str,
) -> Result<Vec<Leaf>> {
    let mut leaves = Vec::new();
    let mut to_visit = VecDeque::new();
    to_visit.push_back((start.clone(), ancestors));

    while let Some((node, ancestors)) = to_visit.pop_front() {
        if !node.is_leaf() {
            let mut chain = ancestors.clone();
            chain.push(node.name.clone());
            for child in node.child_names() {
                let child_resource = catalog
                    .resource_by_name(&child)?
                    .ok_or_else(|| EngineError::ResourceNotFound(child.clone()))?;
                to_visit.push_back((child_resource, chain.clone()));
            }
        } else if node.location == fqdn {
            info!(
                resource = %node.name,
                vault = %node.vault_path,
                "storage resource selected"
            );
            let mut hierarchy = ancestors;
            hierarchy.push(node.name.clone());
            leaves.push(Leaf {
                resource: node,
                hierarchy,
            });
        } else {
            warn!(
                resource = %node.name,
                location = %node.location,
                "storage resource is remote, skipping"
            );
        }
    }
    Ok(leaves)
}
