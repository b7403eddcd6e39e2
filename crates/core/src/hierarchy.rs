//! Group hierarchy resolution.
//!
//! Workers point upward through `parent_group_id`; a worker's own `group_id`
//! is the node its subordinates point at. Walking from a root group therefore
//! alternates between "workers reporting to this group" and "the groups those
//! workers lead".

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::domain::group::GroupId;
use crate::domain::worker::{WorkerId, WorkerLink};
use crate::errors::ApplicationError;
use crate::ports::LeadStore;

/// Every worker reachable below `root`. Terminates on cyclic parent links
/// because each group is expanded at most once.
pub fn descendants_of(links: &[WorkerLink], root: &GroupId) -> BTreeSet<WorkerId> {
    let mut reports: HashMap<&GroupId, Vec<&WorkerLink>> = HashMap::new();
    for link in links {
        if let Some(parent) = &link.parent_group_id {
            reports.entry(parent).or_default().push(link);
        }
    }

    let mut visited: HashSet<&GroupId> = HashSet::from([root]);
    let mut frontier: Vec<&GroupId> = vec![root];
    let mut descendants = BTreeSet::new();

    while let Some(group_id) = frontier.pop() {
        let Some(subordinates) = reports.get(group_id) else {
            continue;
        };

        for &link in subordinates {
            descendants.insert(link.worker_id.clone());
            if visited.insert(&link.group_id) {
                frontier.push(&link.group_id);
            }
        }
    }

    descendants
}

/// Reads the reporting tree fresh on every call; nothing is cached between
/// requests.
#[derive(Clone)]
pub struct HierarchyResolver {
    store: Arc<dyn LeadStore>,
}

impl HierarchyResolver {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    pub async fn descendants(&self, root: &GroupId) -> Result<BTreeSet<WorkerId>, ApplicationError> {
        let links = self.store.worker_links().await?;
        let descendants = descendants_of(&links, root);
        debug!(
            event_name = "hierarchy.descendants_resolved",
            root_group_id = %root,
            descendant_count = descendants.len(),
            "resolved group descendants"
        );
        Ok(descendants)
    }

    pub async fn is_descendant(
        &self,
        root: &GroupId,
        worker_id: &WorkerId,
    ) -> Result<bool, ApplicationError> {
        Ok(self.descendants(root).await?.contains(worker_id))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::descendants_of;
    use crate::domain::group::GroupId;
    use crate::domain::worker::{WorkerId, WorkerLink};

    fn link(worker: &str, group: &str, parent: Option<&str>) -> WorkerLink {
        WorkerLink {
            worker_id: WorkerId(worker.to_string()),
            group_id: GroupId(group.to_string()),
            parent_group_id: parent.map(|parent| GroupId(parent.to_string())),
        }
    }

    fn ids(values: &[&str]) -> BTreeSet<WorkerId> {
        values.iter().map(|value| WorkerId(value.to_string())).collect()
    }

    #[test]
    fn walks_multiple_levels_below_root() {
        let links = vec![
            link("M1", "G1", None),
            link("S1", "G2", Some("G1")),
            link("S2", "G3", Some("G1")),
            link("A1", "G4", Some("G2")),
            link("A2", "G5", Some("G4")),
            link("X1", "G9", Some("G8")),
        ];

        let descendants = descendants_of(&links, &GroupId("G1".to_string()));
        assert_eq!(descendants, ids(&["S1", "S2", "A1", "A2"]));
    }

    #[test]
    fn workers_sharing_the_root_group_are_not_descendants() {
        let links = vec![link("M1", "G1", None), link("P1", "G1", Some("G0"))];

        let descendants = descendants_of(&links, &GroupId("G1".to_string()));
        assert!(descendants.is_empty());
    }

    #[test]
    fn terminates_when_parent_links_form_a_cycle() {
        let links = vec![
            link("A", "GA", Some("GB")),
            link("B", "GB", Some("GC")),
            link("C", "GC", Some("GA")),
        ];

        let descendants = descendants_of(&links, &GroupId("GA".to_string()));
        assert_eq!(descendants, ids(&["A", "B", "C"]));
    }

    #[test]
    fn self_referencing_group_resolves_to_its_own_reports() {
        let links = vec![link("S", "G1", Some("G1")), link("T", "G2", Some("G1"))];

        let descendants = descendants_of(&links, &GroupId("G1".to_string()));
        assert_eq!(descendants, ids(&["S", "T"]));
    }
}
