//! Building a [`Document`] from XML bytes.
//!
//! Text and CDATA fragments inside an element are joined verbatim and the
//! joined text is trimmed once when parsing finishes, so whitespace between
//! elements never becomes content while the spacing inside mixed content is
//! kept. General entities declared in an internal DTD subset are resolved to
//! their literal replacement text; the rest of the DOCTYPE, comments and
//! processing instructions are skipped.

use std::collections::HashMap;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::document::{Declaration, Document, Element, ElementId};
use crate::error::{TreeError, TreeResult};

impl Document {
    /// Parse a document from raw bytes. The bytes must be UTF-8.
    pub fn parse(input: &[u8]) -> TreeResult<Self> {
        let text = std::str::from_utf8(input)?;
        Self::parse_str(text)
    }

    /// Parse a document from a string.
    pub fn parse_str(input: &str) -> TreeResult<Self> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(false);

        let mut builder = Builder::default();

        loop {
            let position = reader.buffer_position() as u64;
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(TreeError::Malformed {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })
                }
            };

            match event {
                Event::Start(ref e) => {
                    let id = builder.open(e, position)?;
                    builder.stack.push(id);
                }
                Event::Empty(ref e) => {
                    builder.open(e, position)?;
                }
                Event::End(_) => {
                    if builder.stack.pop().is_none() {
                        return Err(TreeError::Malformed {
                            position,
                            message: "end tag without a matching start tag".into(),
                        });
                    }
                }
                Event::Text(ref e) => {
                    let text = e
                        .unescape_with(|name: &str| resolve_entity(&builder.entities, name))
                        .map_err(|err| TreeError::Malformed {
                            position,
                            message: err.to_string(),
                        })?;
                    builder.text(&text, position)?;
                }
                Event::CData(ref e) => {
                    let raw = e.clone().into_inner();
                    builder.text(std::str::from_utf8(&raw)?, position)?;
                }
                Event::Decl(ref e) => {
                    builder.declaration = Some(read_declaration(e, position)?);
                }
                Event::DocType(ref e) => {
                    let raw = e.clone().into_inner();
                    builder.entities = entity_declarations(std::str::from_utf8(&raw)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        builder.finish()
    }
}

#[derive(Default)]
struct Builder {
    slots: Vec<Option<Element>>,
    parents: HashMap<ElementId, ElementId>,
    stack: Vec<ElementId>,
    root: Option<ElementId>,
    declaration: Option<Declaration>,
    entities: HashMap<String, String>,
}

impl Builder {
    fn open(&mut self, start: &BytesStart<'_>, position: u64) -> TreeResult<ElementId> {
        let tag = std::str::from_utf8(start.name().as_ref())?.to_string();

        let mut element = Element::new(tag.clone());
        for attr in start.attributes() {
            let attr = attr.map_err(|e| TreeError::Malformed {
                position,
                message: e.to_string(),
            })?;
            let name = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr
                .unescape_value_with(|name: &str| resolve_entity(&self.entities, name))
                .map_err(|e| TreeError::Malformed {
                    position,
                    message: e.to_string(),
                })?;
            element.push_attribute(name, value.into_owned());
        }

        let id = ElementId::from_index(self.slots.len());
        self.slots.push(Some(element));

        match self.stack.last().copied() {
            Some(parent) => {
                if let Some(Some(p)) = self.slots.get_mut(parent.index()) {
                    p.children_mut().push(id);
                }
                self.parents.insert(id, parent);
            }
            None if self.root.is_some() => return Err(TreeError::MultipleRoots(tag)),
            None => self.root = Some(id),
        }

        Ok(id)
    }

    fn text(&mut self, text: &str, position: u64) -> TreeResult<()> {
        match self.stack.last() {
            Some(current) => {
                if let Some(Some(element)) = self.slots.get_mut(current.index()) {
                    element.push_text(text);
                }
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(TreeError::TextOutsideRoot(position)),
        }
    }

    fn finish(mut self) -> TreeResult<Document> {
        if let Some(open) = self.stack.last() {
            let tag = self
                .slots
                .get(open.index())
                .and_then(Option::as_ref)
                .map(|e| e.tag().to_string())
                .unwrap_or_default();
            return Err(TreeError::UnclosedElement(tag));
        }
        let root = self.root.ok_or(TreeError::EmptyDocument)?;

        for element in self.slots.iter_mut().flatten() {
            element.trim_text();
        }

        debug!(elements = self.slots.len(), root = %root, "parsed document");
        Ok(Document::from_parts(
            self.slots,
            self.parents,
            root,
            self.declaration,
        ))
    }
}

fn resolve_entity<'e>(declared: &'e HashMap<String, String>, name: &str) -> Option<&'e str> {
    resolve_predefined_entity(name).or_else(|| declared.get(name).map(String::as_str))
}

/// Internal general entities (`<!ENTITY name "value">`) from a DOCTYPE body.
/// Parameter entities and external (`SYSTEM`/`PUBLIC`) entities are skipped.
fn entity_declarations(doctype: &str) -> HashMap<String, String> {
    let mut entities = HashMap::new();
    let mut rest = doctype;

    while let Some(start) = rest.find("<!ENTITY") {
        rest = rest[start + "<!ENTITY".len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }

        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') else {
            continue;
        };
        let Some(len) = rest[1..].find(quote) else {
            break;
        };
        let raw = &rest[1..1 + len];
        rest = &rest[1 + len + 1..];

        if name.is_empty() {
            continue;
        }
        // Character and predefined references inside the value are expanded.
        let value = unescape(raw).map_or_else(|_| raw.to_string(), |v| v.into_owned());
        entities.entry(name.to_string()).or_insert(value);
    }

    entities
}

fn read_declaration(decl: &BytesDecl<'_>, position: u64) -> TreeResult<Declaration> {
    let malformed = |e: quick_xml::Error| TreeError::Malformed {
        position,
        message: e.to_string(),
    };

    let version = decl.version().map_err(malformed)?;
    let encoding = decl.encoding().transpose().map_err(malformed)?;
    let standalone = decl.standalone().transpose().map_err(malformed)?;

    Ok(Declaration {
        version: String::from_utf8_lossy(&version).into_owned(),
        encoding: encoding.map(|e| String::from_utf8_lossy(&e).into_owned()),
        standalone: standalone.map(|s| String::from_utf8_lossy(&s).into_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_text_and_attributes() {
        let doc = Document::parse(
            br#"<EmployeeImport batch="7">
                 <Employee id="1"><XRefCode>E1</XRefCode><Job>A</Job></Employee>
               </EmployeeImport>"#,
        )
        .unwrap();

        let root = doc.root();
        assert_eq!(doc.tag(root), Some("EmployeeImport"));
        assert_eq!(doc.attribute(root, "batch"), Some("7"));
        assert!(doc.text(root).is_none());

        let employee = doc.first_child_by_tag(root, "Employee").unwrap();
        assert_eq!(doc.attribute(employee, "id"), Some("1"));
        let tags: Vec<_> = doc
            .children(employee)
            .iter()
            .map(|&c| doc.tag(c).unwrap())
            .collect();
        assert_eq!(tags, vec!["XRefCode", "Job"]);

        let xref = doc.first_child_by_tag(employee, "XRefCode").unwrap();
        assert_eq!(doc.text(xref), Some("E1"));
        assert_eq!(doc.parent(xref), Some(employee));
    }

    #[test]
    fn unescapes_entities_and_reads_cdata() {
        let doc = Document::parse_str(
            "<r><a>Smith &amp; Sons</a><b><![CDATA[<raw>]]></b><c k=\"&lt;x&gt;\"/></r>",
        )
        .unwrap();
        let root = doc.root();
        let a = doc.first_child_by_tag(root, "a").unwrap();
        let b = doc.first_child_by_tag(root, "b").unwrap();
        let c = doc.first_child_by_tag(root, "c").unwrap();
        assert_eq!(doc.text(a), Some("Smith & Sons"));
        assert_eq!(doc.text(b), Some("<raw>"));
        assert_eq!(doc.attribute(c, "k"), Some("<x>"));
    }

    #[test]
    fn mixed_content_keeps_interior_spacing() {
        let doc = Document::parse_str("<r><Note>Hello <b>big</b> world</Note></r>").unwrap();
        let note = doc.first_child_by_tag(doc.root(), "Note").unwrap();
        assert_eq!(doc.text(note), Some("Hello  world"));
        let b = doc.first_child_by_tag(note, "b").unwrap();
        assert_eq!(doc.text(b), Some("big"));
    }

    #[test]
    fn text_is_trimmed_once_per_element() {
        let doc = Document::parse_str(
            "<r>\n  <a>  one <![CDATA[two]]> three  </a>\n  <b>\n</b>\n</r>",
        )
        .unwrap();
        let root = doc.root();
        let a = doc.first_child_by_tag(root, "a").unwrap();
        let b = doc.first_child_by_tag(root, "b").unwrap();
        assert!(doc.text(root).is_none());
        assert_eq!(doc.text(a), Some("one two three"));
        assert!(doc.text(b).is_none());
    }

    #[test]
    fn resolves_internal_entity_declarations() {
        let doc = Document::parse_str(
            r#"<!DOCTYPE r [<!ENTITY foo "bar"> <!ENTITY % skip "x"> <!ENTITY co 'A&amp;B'>]><r k="&foo;">&foo; &co; &lt;</r>"#,
        )
        .unwrap();
        let root = doc.root();
        assert_eq!(doc.text(root), Some("bar A&B <"));
        assert_eq!(doc.attribute(root, "k"), Some("bar"));
    }

    #[test]
    fn undeclared_entity_is_malformed() {
        let err = Document::parse_str("<r>&nope;</r>").unwrap_err();
        assert!(matches!(err, TreeError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn records_declaration() {
        let doc = Document::parse_str(
            r#"<?xml version="1.0" encoding="ISO-8859-1" standalone="yes"?><r/>"#,
        )
        .unwrap();
        let decl = doc.declaration().unwrap();
        assert_eq!(decl.version, "1.0");
        assert_eq!(decl.encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(decl.standalone.as_deref(), Some("yes"));
    }

    #[test]
    fn skips_comments_and_processing_instructions() {
        let doc = Document::parse_str("<!-- c --><r><?pi x?><a/><!-- d --></r>").unwrap();
        assert_eq!(doc.element_count(), 2);
    }

    #[test]
    fn rejects_mismatched_end_tag() {
        let err = Document::parse_str("<r><a></b></r>").unwrap_err();
        assert!(matches!(err, TreeError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn rejects_unclosed_element() {
        let err = Document::parse_str("<r><a>").unwrap_err();
        assert!(
            matches!(err, TreeError::UnclosedElement(_) | TreeError::Malformed { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn rejects_multiple_roots() {
        let err = Document::parse_str("<a/><b/>").unwrap_err();
        assert!(matches!(err, TreeError::MultipleRoots(ref t) if t == "b"));
    }

    #[test]
    fn rejects_text_outside_root() {
        let err = Document::parse_str("<a/>trailing").unwrap_err();
        assert!(matches!(err, TreeError::TextOutsideRoot(_)));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(Document::parse(b"   "), Err(TreeError::EmptyDocument)));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(matches!(
            Document::parse(&[b'<', b'r', 0xff, b'/', b'>']),
            Err(TreeError::InvalidUtf8(_))
        ));
    }
}
