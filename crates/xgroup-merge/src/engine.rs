//! The group-merge pass.
//!
//! Both entry points walk the document pre-order with an explicit stack.
//! At each parent the sibling groups are merged first, and only then are the
//! parent's (updated) children pushed, so elements migrated into a survivor
//! are themselves visited.
//!
//! # Invariants
//!
//! - Groups never span parents.
//! - The survivor is the first member in document order and keeps its
//!   position; donors are removed after their children are migrated, all
//!   donors of one parent in a single pass over its child list.
//! - Migrated children follow the survivor's own children, donor by donor,
//!   each donor's children in their original order.
//! - The pass never fails as a whole: a group that cannot be merged is
//!   logged and skipped, earlier groups stay merged.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use xgroup_analyze::repeating_child_tags;
use xgroup_tree::{Document, ElementId, TreeResult};

use crate::key::{derive_key, GroupKey, KeyMatch};
use crate::options::{GenericMergeOptions, MergeOptions, MergePolicy};
use crate::report::MergeReport;

/// Merge every group of same-key `options.tag` siblings in the document.
///
/// A tag or key field that does not occur leaves the document untouched and
/// yields a report with zero merged groups.
pub fn merge(doc: &mut Document, options: &MergeOptions) -> MergeReport {
    let mut report = MergeReport::new();
    let plan = GroupPlan {
        tag: &options.tag,
        key_field: options.key_field.as_deref(),
        allowed: options.allowed_child_tags.as_ref(),
        policy: options.policy,
        key_match: options.key_match,
    };

    walk(doc, &mut report, |doc, parent, report| {
        plan.apply(doc, parent, report);
    });

    info!(
        tag = %options.tag,
        key_field = options.key_field.as_deref().unwrap_or("<heuristic>"),
        policy = %options.policy,
        groups = report.groups_merged,
        donors = report.donors_removed,
        "merge complete"
    );
    report
}

/// Merge every tag that repeats under a parent, using heuristic keys and no
/// child-tag filter.
pub fn merge_all(doc: &mut Document, options: &GenericMergeOptions) -> MergeReport {
    let mut report = MergeReport::new();

    walk(doc, &mut report, |doc, parent, report| {
        for tag in repeating_child_tags(doc, parent) {
            let plan = GroupPlan {
                tag: &tag,
                key_field: None,
                allowed: None,
                policy: options.policy,
                key_match: options.key_match,
            };
            plan.apply(doc, parent, report);
        }
    });

    info!(
        policy = %options.policy,
        tags = report.tags.len(),
        groups = report.groups_merged,
        donors = report.donors_removed,
        "whole-document merge complete"
    );
    report
}

fn walk<F>(doc: &mut Document, report: &mut MergeReport, mut visit: F)
where
    F: FnMut(&mut Document, ElementId, &mut MergeReport),
{
    let mut stack = vec![doc.root()];
    while let Some(parent) = stack.pop() {
        if doc.children(parent).is_empty() {
            continue;
        }
        report.parents_visited += 1;
        visit(doc, parent, report);
        stack.extend(doc.children(parent).iter().rev().copied());
    }
}

struct GroupPlan<'a> {
    tag: &'a str,
    key_field: Option<&'a str>,
    allowed: Option<&'a BTreeSet<String>>,
    policy: MergePolicy,
    key_match: KeyMatch,
}

#[derive(Default)]
struct GroupOutcome {
    migrated: usize,
    dropped: usize,
    donors: usize,
}

impl GroupPlan<'_> {
    fn apply(&self, doc: &mut Document, parent: ElementId, report: &mut MergeReport) {
        let members: Vec<ElementId> = doc.children_by_tag(parent, self.tag).collect();
        if members.len() < 2 {
            return;
        }

        let groups = self.partition(doc, &members, report);
        let mut emptied = Vec::new();

        for (key, group) in groups {
            let [survivor, donors @ ..] = group.as_slice() else {
                continue;
            };
            if donors.is_empty() {
                continue;
            }

            let mut outcome = GroupOutcome::default();
            let result = self.fold(doc, *survivor, donors, &mut outcome);

            emptied.extend_from_slice(&donors[..outcome.donors]);
            report.children_migrated += outcome.migrated;
            report.children_dropped += outcome.dropped;

            match result {
                Ok(()) => {
                    report.groups_merged += 1;
                    report.tags.insert(self.tag.to_string());
                    debug!(
                        tag = self.tag,
                        %key,
                        survivor = %survivor,
                        donors = donors.len(),
                        migrated = outcome.migrated,
                        dropped = outcome.dropped,
                        "merged group"
                    );
                }
                Err(err) => {
                    warn!(tag = self.tag, %key, error = %err, "group merge aborted");
                }
            }
        }

        if emptied.is_empty() {
            return;
        }
        // Donors are dropped together so the parent's child list is
        // rewritten once, however many groups it holds.
        match doc.remove_children(parent, &emptied) {
            Ok(removed) => report.donors_removed += removed,
            Err(err) => warn!(tag = self.tag, parent = %parent, error = %err, "donor removal failed"),
        }
    }

    /// Split `members` into key groups, preserving first-occurrence order.
    fn partition(
        &self,
        doc: &Document,
        members: &[ElementId],
        report: &mut MergeReport,
    ) -> Vec<(GroupKey, Vec<ElementId>)> {
        let mut groups: Vec<(GroupKey, Vec<ElementId>)> = Vec::new();
        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut next_ordinal = 0;

        for &member in members {
            let key = match derive_key(doc, member, self.key_field) {
                Some(raw) => GroupKey::Value(self.key_match.normalize(raw)),
                None => {
                    next_ordinal += 1;
                    report.singletons += 1;
                    GroupKey::Ordinal(next_ordinal - 1)
                }
            };

            match index.get(&key) {
                Some(&slot) => groups[slot].1.push(member),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![member]));
                }
            }
        }

        groups
    }

    fn fold(
        &self,
        doc: &mut Document,
        survivor: ElementId,
        donors: &[ElementId],
        outcome: &mut GroupOutcome,
    ) -> TreeResult<()> {
        for &donor in donors {
            for child in doc.take_children(donor)? {
                if self.accepts(doc, survivor, child) {
                    doc.append_child(survivor, child)?;
                    outcome.migrated += 1;
                } else {
                    doc.remove(child)?;
                    outcome.dropped += 1;
                }
            }
            outcome.donors += 1;
        }
        Ok(())
    }

    fn accepts(&self, doc: &Document, survivor: ElementId, child: ElementId) -> bool {
        let Some(tag) = doc.tag(child) else {
            return false;
        };
        if let Some(allowed) = self.allowed {
            if !allowed.contains(tag) {
                return false;
            }
        }
        match self.policy {
            MergePolicy::AppendAll => true,
            MergePolicy::FirstWins => doc.first_child_by_tag(survivor, tag).is_none(),
        }
    }
}
