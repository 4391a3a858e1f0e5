//! Serializing a [`Document`] back to XML bytes.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::{Declaration, Document, ElementId};
use crate::error::{TreeError, TreeResult};

const OUTPUT_ENCODING: &str = "UTF-8";

/// Output formatting options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indent nested elements on their own lines.
    pub pretty: bool,
    /// Spaces per nesting level when `pretty` is set.
    pub indent: usize,
    /// Emit an XML declaration: the one read from the input (with any
    /// declared encoding rewritten to UTF-8), or
    /// `<?xml version="1.0" encoding="UTF-8"?>` when there was none.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::compact()
    }
}

impl WriteOptions {
    /// Single-line output without a declaration.
    pub fn compact() -> Self {
        Self {
            pretty: false,
            indent: 2,
            declaration: false,
        }
    }

    /// Two-space indented output with a declaration.
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            indent: 2,
            declaration: true,
        }
    }
}

enum Step {
    Open(ElementId),
    Close(ElementId),
}

impl Document {
    /// Serialize the document.
    pub fn to_bytes(&self, options: &WriteOptions) -> TreeResult<Vec<u8>> {
        let mut writer = if options.pretty {
            Writer::new_with_indent(Vec::new(), b' ', options.indent)
        } else {
            Writer::new(Vec::new())
        };

        if options.declaration {
            let fallback = Declaration::default();
            let decl = self.declaration().unwrap_or(&fallback);
            // Output is always UTF-8, whatever the input declared.
            let encoding = decl.encoding.as_ref().map(|_| OUTPUT_ENCODING);
            write(
                &mut writer,
                Event::Decl(BytesDecl::new(
                    &decl.version,
                    encoding,
                    decl.standalone.as_deref(),
                )),
            )?;
        }

        let mut stack = vec![Step::Open(self.root())];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id) => {
                    let Some(element) = self.element(id) else {
                        continue;
                    };
                    let mut start = BytesStart::new(element.tag());
                    for (name, value) in element.attributes() {
                        start.push_attribute((name.as_str(), value.as_str()));
                    }

                    if element.children().is_empty() && element.text().is_none() {
                        write(&mut writer, Event::Empty(start))?;
                        continue;
                    }

                    write(&mut writer, Event::Start(start))?;
                    if let Some(text) = element.text() {
                        write(&mut writer, Event::Text(BytesText::new(text)))?;
                    }
                    stack.push(Step::Close(id));
                    stack.extend(element.children().iter().rev().map(|&c| Step::Open(c)));
                }
                Step::Close(id) => {
                    if let Some(tag) = self.tag(id) {
                        write(&mut writer, Event::End(BytesEnd::new(tag)))?;
                    }
                }
            }
        }

        Ok(writer.into_inner())
    }

    /// Serialize the document into a `String`.
    pub fn to_xml_string(&self, options: &WriteOptions) -> TreeResult<String> {
        let bytes = self.to_bytes(options)?;
        String::from_utf8(bytes).map_err(|e| TreeError::Write(e.to_string()))
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> TreeResult<()> {
    writer
        .write_event(event)
        .map_err(|e| TreeError::Write(e.to_string()))
}
