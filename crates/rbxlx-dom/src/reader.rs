//! XML reader for checking emitted place files.
//!
//! Wraps `quick_xml`'s pull parser and builds a small element tree. On top of
//! the tokenizer it enforces a single root element, rejects DOCTYPE
//! declarations, stray `]]>` in character data, and characters outside the
//! XML `Char` production.

use std::str;

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::cdata::{CDATA_CLOSE, CDATA_OPEN};
use crate::chars::find_invalid_char;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {offset}: {source}")]
    Syntax {
        offset: usize,
        #[source]
        source: quick_xml::Error,
    },
    /// For attribute values the offset is that of the start tag.
    #[error("character {character:?} at byte {offset} is not allowed in XML")]
    InvalidChar { offset: usize, character: char },
    #[error("element <{name}> is never closed")]
    Unclosed { name: String },
    #[error("']]>' is not allowed in character data (byte {offset})")]
    StrayCdataClose { offset: usize },
    #[error("content outside the root element at byte {offset}")]
    ContentOutsideRoot { offset: usize },
    #[error("XML declaration at byte {offset} is not at the start of the document")]
    MisplacedDeclaration { offset: usize },
    #[error("document has no root element")]
    MissingRoot,
    #[error("DOCTYPE declarations are not supported (byte {offset})")]
    Doctype { offset: usize },
    #[error("invalid UTF-8 at byte {offset}")]
    Utf8 { offset: usize },
}

/// Parsed document: optional declaration plus exactly one root element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlDocument {
    pub declaration: Option<Declaration>,
    pub root: Element,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Byte offset of the opening `<`.
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    CData(String),
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |element| element.name == name)
    }

    /// Concatenated character data, with CDATA sections joined verbatim.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(value) | XmlNode::CData(value) => text.push_str(value),
                XmlNode::Element(_) => {}
            }
        }
        text
    }

    /// Depth-first walk over this element and every descendant element.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            found.push(element);
            let children: Vec<_> = element.elements().collect();
            stack.extend(children.into_iter().rev());
        }
        found
    }
}

/// Parses `input` into an [`XmlDocument`], enforcing well-formedness.
pub fn parse(input: &str) -> Result<XmlDocument, XmlError> {
    let body = input.strip_prefix('\u{feff}').unwrap_or(input);
    let base = input.len() - body.len();

    let mut reader = Reader::from_str(body);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = true;

    let mut declaration = None;
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut seen_markup = false;

    loop {
        let offset = base + reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(XmlError::Syntax {
                    offset: base + reader.error_position() as usize,
                    source,
                })
            }
        };

        match event {
            Event::Decl(decl) => {
                if seen_markup {
                    return Err(XmlError::MisplacedDeclaration { offset });
                }
                declaration = Some(read_declaration(&decl, offset)?);
            }
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::ContentOutsideRoot { offset });
                }
                stack.push(open_element(&start, offset)?);
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::ContentOutsideRoot { offset });
                }
                let element = open_element(&start, offset)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => match stack.pop() {
                Some(element) => attach(&mut stack, &mut root, element),
                None => return Err(XmlError::ContentOutsideRoot { offset }),
            },
            Event::Text(text) => {
                let raw = utf8(&text, offset)?;
                let Some(parent) = stack.last_mut() else {
                    let content = raw.trim_start_matches([' ', '\t', '\r', '\n']);
                    if !content.is_empty() {
                        return Err(XmlError::ContentOutsideRoot {
                            offset: offset + raw.len() - content.len(),
                        });
                    }
                    continue;
                };
                if let Some(stray) = raw.find(CDATA_CLOSE) {
                    return Err(XmlError::StrayCdataClose {
                        offset: offset + stray,
                    });
                }
                check_chars(raw, offset)?;
                let value = text
                    .unescape()
                    .map_err(|source| XmlError::Syntax { offset, source })?;
                // Character references can still name a forbidden character.
                if let Some((_, character)) = find_invalid_char(&value) {
                    return Err(XmlError::InvalidChar { offset, character });
                }
                parent.children.push(XmlNode::Text(value.into_owned()));
            }
            Event::CData(section) => {
                let content_offset = offset + CDATA_OPEN.len();
                let Some(parent) = stack.last_mut() else {
                    return Err(XmlError::ContentOutsideRoot { offset });
                };
                let value = utf8(&section, content_offset)?;
                check_chars(value, content_offset)?;
                parent.children.push(XmlNode::CData(value.to_string()));
            }
            Event::DocType(_) => return Err(XmlError::Doctype { offset }),
            Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
        seen_markup = true;
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed { name: open.name });
    }
    let root = root.ok_or(XmlError::MissingRoot)?;
    Ok(XmlDocument { declaration, root })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => *root = Some(element),
    }
}

fn open_element(start: &BytesStart<'_>, offset: usize) -> Result<Element, XmlError> {
    let name = utf8(start.name().as_ref(), offset)?.to_string();
    let mut attributes = Vec::new();

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| XmlError::Syntax {
            offset,
            source: err.into(),
        })?;
        let key = utf8(attribute.key.as_ref(), offset)?.to_string();
        let value = attribute
            .unescape_value()
            .map_err(|source| XmlError::Syntax { offset, source })?;
        if let Some((_, character)) = find_invalid_char(&value) {
            return Err(XmlError::InvalidChar { offset, character });
        }
        attributes.push((key, value.into_owned()));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        offset,
    })
}

fn read_declaration(decl: &BytesDecl<'_>, offset: usize) -> Result<Declaration, XmlError> {
    let version = decl.version().map_err(|err| XmlError::Syntax {
        offset,
        source: err.into(),
    })?;
    let encoding = match decl.encoding() {
        Some(encoding) => {
            let encoding = encoding.map_err(|err| XmlError::Syntax {
                offset,
                source: err.into(),
            })?;
            Some(utf8(&encoding, offset)?.to_string())
        }
        None => None,
    };

    Ok(Declaration {
        version: utf8(&version, offset)?.to_string(),
        encoding,
    })
}

fn utf8(bytes: &[u8], offset: usize) -> Result<&str, XmlError> {
    str::from_utf8(bytes).map_err(|err| XmlError::Utf8 {
        offset: offset + err.valid_up_to(),
    })
}

fn check_chars(text: &str, offset: usize) -> Result<(), XmlError> {
    match find_invalid_char(text) {
        Some((index, character)) => Err(XmlError::InvalidChar {
            offset: offset + index,
            character,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_cdata() {
        let doc = parse(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<a x=\"1\"><b>t &amp; u</b><c><![CDATA[]]]]><![CDATA[>]]></c><d/></a>\n",
        )
        .unwrap();

        assert_eq!(
            doc.declaration,
            Some(Declaration {
                version: "1.0".into(),
                encoding: Some("utf-8".into()),
            })
        );
        assert_eq!(doc.root.name, "a");
        assert_eq!(doc.root.attribute("x"), Some("1"));
        let names: Vec<_> = doc.root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
        assert_eq!(doc.root.elements_named("b").next().unwrap().text(), "t & u");
        assert_eq!(doc.root.elements_named("c").next().unwrap().text(), "]]>");
    }

    #[test]
    fn descendants_are_depth_first_in_document_order() {
        let doc = parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<_> = doc
            .root
            .descendants()
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn character_reference_between_sections_decodes_to_carriage_return() {
        let doc = parse("<s><![CDATA[a]]>&#13;<![CDATA[\nb]]></s>").unwrap();
        assert_eq!(doc.root.text(), "a\r\nb");
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(matches!(
            parse("<a><b></a></b>"),
            Err(XmlError::Syntax { .. })
        ));
    }

    #[test]
    fn rejects_unclosed_elements() {
        // quick_xml may flag the missing end tag itself before `Eof`.
        assert!(matches!(
            parse("<a><b></b>"),
            Err(XmlError::Unclosed { .. } | XmlError::Syntax { .. })
        ));
    }

    #[test]
    fn rejects_second_root() {
        assert!(matches!(
            parse("<a/><b/>"),
            Err(XmlError::ContentOutsideRoot { offset: 4 })
        ));
    }

    #[test]
    fn rejects_stray_cdata_terminator_in_text() {
        assert!(matches!(
            parse("<a>x]]>y</a>"),
            Err(XmlError::StrayCdataClose { offset: 4 })
        ));
    }

    #[test]
    fn rejects_duplicate_attributes() {
        assert!(matches!(
            parse("<a k=\"1\" k=\"2\"/>"),
            Err(XmlError::Syntax { offset: 0, .. })
        ));
    }

    #[test]
    fn rejects_control_characters_in_cdata_and_text() {
        assert!(matches!(
            parse("<a><![CDATA[x\u{1b}]]></a>"),
            Err(XmlError::InvalidChar {
                offset: 13,
                character: '\u{1b}'
            })
        ));
        assert!(matches!(
            parse("<a>\u{c}</a>"),
            Err(XmlError::InvalidChar {
                offset: 3,
                character: '\u{c}'
            })
        ));
    }

    #[test]
    fn rejects_control_characters_in_attributes() {
        assert!(matches!(
            parse("<a>\n<b name=\"x\u{7}\"/></a>"),
            Err(XmlError::InvalidChar {
                offset: 4,
                character: '\u{7}'
            })
        ));
    }

    #[test]
    fn rejects_doctype() {
        assert!(matches!(
            parse("<!DOCTYPE a><a/>"),
            Err(XmlError::Doctype { offset: 0 })
        ));
    }

    #[test]
    fn empty_input_has_no_root() {
        assert!(matches!(parse("  \n"), Err(XmlError::MissingRoot)));
    }
}
