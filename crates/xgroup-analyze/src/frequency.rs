//! Tag-frequency analysis: which tags repeat directly under a parent.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use xgroup_tree::{Document, ElementId};

/// One parent under which a tag occurs more than once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepeatSite {
    /// Arena index of the parent element.
    pub parent: usize,
    /// Tag of the parent element.
    pub parent_tag: String,
    /// The repeating child tag.
    pub tag: String,
    /// How many direct children carry that tag.
    pub count: usize,
}

/// Every tag that occurs more than once directly under at least one parent
/// (the root included).
pub fn candidate_tags(doc: &Document) -> BTreeSet<String> {
    let tags: BTreeSet<String> = repeat_sites(doc).into_iter().map(|s| s.tag).collect();
    debug!(candidates = tags.len(), "computed candidate tags");
    tags
}

/// Per-parent detail behind [`candidate_tags`], in document order of the
/// parents and tag order within one parent.
pub fn repeat_sites(doc: &Document) -> Vec<RepeatSite> {
    let mut sites = Vec::new();

    for parent in doc.iter() {
        for (tag, count) in child_tag_counts(doc, parent) {
            if count > 1 {
                sites.push(RepeatSite {
                    parent: parent.index(),
                    parent_tag: doc.tag(parent).unwrap_or_default().to_string(),
                    tag: tag.to_string(),
                    count,
                });
            }
        }
    }

    sites
}

/// Tags occurring more than once directly under `parent`, in tag order.
pub fn repeating_child_tags(doc: &Document, parent: ElementId) -> Vec<String> {
    child_tag_counts(doc, parent)
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

fn child_tag_counts(doc: &Document, parent: ElementId) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for &child in doc.children(parent) {
        if let Some(tag) = doc.tag(child) {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        Document::parse_str(xml).unwrap()
    }

    #[test]
    fn finds_repeats_under_root() {
        let doc = parse("<r><Employee/><Employee/><Header/></r>");
        let tags = candidate_tags(&doc);
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["Employee"]);
    }

    #[test]
    fn finds_repeats_at_any_depth() {
        let doc = parse(
            "<r><Employee><Job/><Job/></Employee><Employee><Job/></Employee><Meta><Tag/><Tag/></Meta></r>",
        );
        let tags: Vec<_> = candidate_tags(&doc).into_iter().collect();
        assert_eq!(tags, vec!["Employee", "Job", "Tag"]);
    }

    #[test]
    fn same_tag_under_different_parents_is_not_a_repeat() {
        let doc = parse("<r><a><x/></a><b><x/></b></r>");
        assert!(candidate_tags(&doc).is_empty());
    }

    #[test]
    fn single_element_document_has_no_candidates() {
        assert!(candidate_tags(&parse("<r/>")).is_empty());
    }

    #[test]
    fn repeat_sites_report_parent_and_count() {
        let doc = parse("<r><E><J/><J/><J/></E><E/></r>");
        let sites = repeat_sites(&doc);
        assert_eq!(sites.len(), 2);

        assert_eq!(sites[0].parent_tag, "r");
        assert_eq!(sites[0].tag, "E");
        assert_eq!(sites[0].count, 2);

        assert_eq!(sites[1].parent_tag, "E");
        assert_eq!(sites[1].tag, "J");
        assert_eq!(sites[1].count, 3);
    }

    #[test]
    fn repeating_child_tags_are_parent_local() {
        let doc = parse("<r><b/><a/><b/><a/><c/><w><c/><c/></w></r>");
        assert_eq!(repeating_child_tags(&doc, doc.root()), vec!["a", "b"]);
        let w = doc.first_child_by_tag(doc.root(), "w").unwrap();
        assert_eq!(repeating_child_tags(&doc, w), vec!["c"]);
    }

    #[test]
    fn repeat_site_serializes_to_json() {
        let doc = parse("<r><E/><E/></r>");
        let json = serde_json::to_value(&repeat_sites(&doc)[0]).unwrap();
        assert_eq!(json["tag"], "E");
        assert_eq!(json["count"], 2);
        assert_eq!(json["parent_tag"], "r");
    }
}
