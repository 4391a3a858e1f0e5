//! The arena document and its navigation/mutation primitives.
//!
//! [`Document`] stores every element in a slot vector. Removing an element
//! empties its slot (and the slots of its whole subtree); ids are never
//! reused, so a stale id simply resolves to `None`.
//!
//! # Invariants
//!
//! - The root is always live and never has a parent.
//! - An element appears in at most one children list, and `parents` maps it
//!   to exactly that list's owner.
//! - Attached elements are never their own ancestor.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{TreeError, TreeResult};

/// Index of an element inside one [`Document`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the document tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    tag: String,
    text: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<ElementId>,
}

impl Element {
    pub(crate) fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The raw text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The text with surrounding whitespace removed, or `None` when it is
    /// absent or blank.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child ids in document order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ElementId> {
        &mut self.children
    }

    pub(crate) fn push_text(&mut self, fragment: &str) {
        match &mut self.text {
            Some(text) => text.push_str(fragment),
            None => self.text = Some(fragment.to_string()),
        }
    }

    /// Trim the joined text once all fragments are in; blank becomes `None`.
    pub(crate) fn trim_text(&mut self) {
        self.text = self
            .text
            .take()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }

    pub(crate) fn push_attribute(&mut self, name: String, value: String) {
        self.attributes.push((name, value));
    }
}

/// The XML declaration carried by a parsed document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for Declaration {
    fn default() -> Self {
        Self {
            version: "1.0".into(),
            encoding: Some("UTF-8".into()),
            standalone: None,
        }
    }
}

/// An ordered, rooted element tree stored in an arena.
#[derive(Clone, Debug)]
pub struct Document {
    slots: Vec<Option<Element>>,
    parents: HashMap<ElementId, ElementId>,
    root: ElementId,
    declaration: Option<Declaration>,
}

impl Document {
    /// Create a document holding a single empty root element.
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            slots: vec![Some(Element::new(root_tag))],
            parents: HashMap::new(),
            root: ElementId(0),
            declaration: None,
        }
    }

    pub(crate) fn from_parts(
        slots: Vec<Option<Element>>,
        parents: HashMap<ElementId, ElementId>,
        root: ElementId,
        declaration: Option<Declaration>,
    ) -> Self {
        Self {
            slots,
            parents,
            root,
            declaration,
        }
    }

    /// The root element id.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// The declaration read from the input, if there was one.
    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<Declaration>) {
        self.declaration = declaration;
    }

    /// Number of live elements.
    pub fn element_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if `id` refers to a live element.
    pub fn contains(&self, id: ElementId) -> bool {
        self.element(id).is_some()
    }

    // ---------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn tag(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(Element::tag)
    }

    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.element(id).and_then(Element::text)
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    /// Children of `id` in document order; empty for unknown ids.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.element(id).map(Element::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.parents.get(&id).copied()
    }

    /// Walk from the parent of `id` up to the root.
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Pre-order traversal of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: ElementId) -> Descendants<'_> {
        let stack = if self.contains(id) { vec![id] } else { Vec::new() };
        Descendants { doc: self, stack }
    }

    /// Pre-order traversal of the whole document.
    pub fn iter(&self) -> Descendants<'_> {
        self.descendants(self.root)
    }

    /// The first direct child of `id` with the given tag.
    pub fn first_child_by_tag(&self, id: ElementId, tag: &str) -> Option<ElementId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.tag(c) == Some(tag))
    }

    /// Direct children of `id` with the given tag, in document order.
    pub fn children_by_tag<'a>(
        &'a self,
        id: ElementId,
        tag: &'a str,
    ) -> impl Iterator<Item = ElementId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.tag(c) == Some(tag))
    }

    /// The first element with the given tag in document order (root included).
    pub fn find_first(&self, tag: &str) -> Option<ElementId> {
        self.iter().find(|&id| self.tag(id) == Some(tag))
    }

    /// Every element with the given tag in document order (root included).
    pub fn find_all(&self, tag: &str) -> Vec<ElementId> {
        self.iter().filter(|&id| self.tag(id) == Some(tag)).collect()
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Allocate a new, unattached element.
    pub fn create_element(&mut self, tag: impl Into<String>) -> ElementId {
        let id = ElementId(self.slots.len());
        self.slots.push(Some(Element::new(tag)));
        id
    }

    /// Append an unattached element as the last child of `parent`.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> TreeResult<()> {
        if !self.contains(parent) {
            return Err(TreeError::UnknownElement(parent));
        }
        if !self.contains(child) {
            return Err(TreeError::UnknownElement(child));
        }
        if child == self.root {
            return Err(TreeError::RootMutation);
        }
        if self.parents.contains_key(&child) {
            return Err(TreeError::AlreadyAttached(child));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::Cycle { parent, child });
        }

        self.element_mut(parent)?.children.push(child);
        self.parents.insert(child, parent);
        Ok(())
    }

    /// Unlink `id` from its parent. The element and its subtree stay in the
    /// arena and can be attached elsewhere.
    pub fn detach(&mut self, id: ElementId) -> TreeResult<()> {
        if !self.contains(id) {
            return Err(TreeError::UnknownElement(id));
        }
        if id == self.root {
            return Err(TreeError::RootMutation);
        }
        if let Some(parent) = self.parents.remove(&id) {
            self.element_mut(parent)?.children.retain(|&c| c != id);
        }
        Ok(())
    }

    /// Move `id` to the end of `new_parent`'s children.
    pub fn reparent(&mut self, id: ElementId, new_parent: ElementId) -> TreeResult<()> {
        if self.ancestors(new_parent).any(|a| a == id) || new_parent == id {
            return Err(TreeError::Cycle {
                parent: new_parent,
                child: id,
            });
        }
        self.detach(id)?;
        self.append_child(new_parent, id)
    }

    /// Detach `id` and free its whole subtree.
    pub fn remove(&mut self, id: ElementId) -> TreeResult<()> {
        self.detach(id)?;
        self.free_subtree(id);
        Ok(())
    }

    /// Detach every child of `id` at once and return them in order. The
    /// children stay in the arena, unattached.
    pub fn take_children(&mut self, id: ElementId) -> TreeResult<Vec<ElementId>> {
        let children = std::mem::take(&mut self.element_mut(id)?.children);
        for child in &children {
            self.parents.remove(child);
        }
        Ok(children)
    }

    /// Remove several children of `parent` and free their subtrees, with a
    /// single pass over the parent's child list. Returns how many were
    /// removed.
    pub fn remove_children(&mut self, parent: ElementId, ids: &[ElementId]) -> TreeResult<usize> {
        if !self.contains(parent) {
            return Err(TreeError::UnknownElement(parent));
        }
        for &child in ids {
            if self.parents.get(&child) != Some(&parent) {
                return Err(TreeError::NotAChild { parent, child });
            }
        }

        let doomed: HashSet<ElementId> = ids.iter().copied().collect();
        self.element_mut(parent)?
            .children
            .retain(|c| !doomed.contains(c));
        for &child in &doomed {
            self.parents.remove(&child);
            self.free_subtree(child);
        }
        Ok(doomed.len())
    }

    fn free_subtree(&mut self, id: ElementId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(element) = self.slots.get_mut(current.0).and_then(Option::take) {
                stack.extend(element.children);
            }
            self.parents.remove(&current);
        }
    }

    pub fn set_text(&mut self, id: ElementId, text: Option<String>) -> TreeResult<()> {
        self.element_mut(id)?.text = text;
        Ok(())
    }

    /// Set an attribute, replacing an existing value with the same name.
    pub fn set_attribute(
        &mut self,
        id: ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        let name = name.into();
        let value = value.into();
        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => element.attributes.push((name, value)),
        }
        Ok(())
    }

    fn element_mut(&mut self, id: ElementId) -> TreeResult<&mut Element> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownElement(id))
    }
}

/// Iterator over the ancestors of an element, nearest first.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<ElementId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<ElementId>,
}

impl Iterator for Descendants<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
