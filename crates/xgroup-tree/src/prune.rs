//! Empty-node pruning.

use tracing::debug;

use crate::document::Document;

/// Remove every non-root element that has no children and no non-blank
/// text. Attributes do not keep an element alive.
///
/// Runs bottom-up, so a parent whose children were all pruned is pruned as
/// well. Returns the number of removed elements.
pub fn prune_empty(doc: &mut Document) -> usize {
    let root = doc.root();
    let order: Vec<_> = doc.iter().collect();

    let mut removed = 0;
    for id in order.into_iter().rev() {
        if id == root {
            continue;
        }
        let Some(element) = doc.element(id) else {
            continue;
        };
        if element.children().is_empty() && element.trimmed_text().is_none() && doc.remove(id).is_ok() {
            removed += 1;
        }
    }

    debug!(removed, "pruned empty elements");
    removed
}
