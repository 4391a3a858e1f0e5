use std::collections::BTreeSet;

use serde::Serialize;

/// What a merge pass did to the document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Elements with children that were examined as parents.
    pub parents_visited: usize,
    /// Groups of two or more members that were folded into a survivor.
    pub groups_merged: usize,
    /// Donor elements removed from the tree.
    pub donors_removed: usize,
    /// Donor children moved under a survivor.
    pub children_migrated: usize,
    /// Donor children discarded by the policy or the child-tag filter.
    pub children_dropped: usize,
    /// Elements without a usable key, each kept in a group of its own.
    pub singletons: usize,
    /// Tags for which at least one group was merged.
    pub tags: BTreeSet<String>,
}

impl MergeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the document was left unchanged.
    pub fn is_noop(&self) -> bool {
        self.groups_merged == 0
    }
}
