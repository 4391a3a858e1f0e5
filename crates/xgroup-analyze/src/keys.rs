//! Key-field derivation and child-tag enumeration.
//!
//! All lookups are by tag over the whole document; a tag that does not
//! occur yields an empty result rather than an error, so callers can simply
//! re-prompt.

use std::collections::BTreeSet;

use serde::Serialize;

use xgroup_tree::Document;

/// A child field that carries text on the first element of a tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyCandidate {
    /// Tag of the child field.
    pub field: String,
    /// Its trimmed text on the first element, as a preview.
    pub sample: String,
}

/// Tags of the direct children of the first element with `tag`, in their
/// original order. Repeated child tags are listed once each time they occur.
pub fn child_field_names(doc: &Document, tag: &str) -> Vec<String> {
    let Some(first) = doc.find_first(tag) else {
        return Vec::new();
    };
    doc.children(first)
        .iter()
        .filter_map(|&c| doc.tag(c))
        .map(str::to_string)
        .collect()
}

/// Like [`child_field_names`], restricted to children with non-blank text.
/// The first occurrence of each field wins.
pub fn key_candidates(doc: &Document, tag: &str) -> Vec<KeyCandidate> {
    let Some(first) = doc.find_first(tag) else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut candidates = Vec::new();
    for &child in doc.children(first) {
        let Some(element) = doc.element(child) else {
            continue;
        };
        let Some(sample) = element.trimmed_text() else {
            continue;
        };
        if seen.insert(element.tag()) {
            candidates.push(KeyCandidate {
                field: element.tag().to_string(),
                sample: sample.to_string(),
            });
        }
    }
    candidates
}

/// Union of direct-child tags over every element with `tag`.
pub fn child_tags(doc: &Document, tag: &str) -> BTreeSet<String> {
    doc.find_all(tag)
        .into_iter()
        .flat_map(|id| doc.children(id).iter().copied())
        .filter_map(|c| doc.tag(c))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPLOYEES: &str = "<EmployeeImport>\
        <Employee><XRefCode>E1</XRefCode><FirstName>Ann</FirstName><Job>A</Job><Address/></Employee>\
        <Employee><XRefCode>E1</XRefCode><Job>B</Job><Badge>7</Badge></Employee>\
        </EmployeeImport>";

    #[test]
    fn field_names_come_from_first_element_in_order() {
        let doc = Document::parse_str(EMPLOYEES).unwrap();
        assert_eq!(
            child_field_names(&doc, "Employee"),
            vec!["XRefCode", "FirstName", "Job", "Address"]
        );
    }

    #[test]
    fn field_names_for_missing_tag_are_empty() {
        let doc = Document::parse_str(EMPLOYEES).unwrap();
        assert!(child_field_names(&doc, "Manager").is_empty());
        assert!(key_candidates(&doc, "Manager").is_empty());
        assert!(child_tags(&doc, "Manager").is_empty());
    }

    #[test]
    fn key_candidates_skip_empty_fields() {
        let doc = Document::parse_str(EMPLOYEES).unwrap();
        let candidates = key_candidates(&doc, "Employee");
        let fields: Vec<_> = candidates.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["XRefCode", "FirstName", "Job"]);
        assert_eq!(candidates[0].sample, "E1");
    }

    #[test]
    fn child_tags_union_over_all_elements() {
        let doc = Document::parse_str(EMPLOYEES).unwrap();
        let tags: Vec<_> = child_tags(&doc, "Employee").into_iter().collect();
        assert_eq!(tags, vec!["Address", "Badge", "FirstName", "Job", "XRefCode"]);
    }

    #[test]
    fn nested_occurrences_count_towards_first_match() {
        let doc = Document::parse_str("<r><w><Item><Id>1</Id></Item></w><Item><Code>2</Code></Item></r>")
            .unwrap();
        assert_eq!(child_field_names(&doc, "Item"), vec!["Id"]);
        let tags: Vec<_> = child_tags(&doc, "Item").into_iter().collect();
        assert_eq!(tags, vec!["Code", "Id"]);
    }
}
