use std::borrow::Cow;

use quick_xml::escape::{escape, partial_escape};

use crate::cdata::{wrap_cdata, CR_REFERENCE};
use crate::node::{Item, PlaceDocument, Property, EXTERNAL_PLACEHOLDERS, ROOT_ATTRIBUTES, ROOT_ELEMENT};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

const INDENT: &str = "  ";

/// Serializes a place document with two-space indentation per depth and a
/// trailing newline.
pub fn write_document(document: &PlaceDocument) -> String {
    let mut out = String::new();
    out.push_str(XML_DECLARATION);
    out.push('\n');

    out.push('<');
    out.push_str(ROOT_ELEMENT);
    for (key, value) in ROOT_ATTRIBUTES {
        push_attribute(&mut out, key, value);
    }
    out.push_str(">\n");

    for placeholder in EXTERNAL_PLACEHOLDERS {
        push_indent(&mut out, 1);
        out.push_str("<External>");
        out.push_str(placeholder);
        out.push_str("</External>\n");
    }

    for item in &document.items {
        write_item(&mut out, item, 1);
    }

    out.push_str("</");
    out.push_str(ROOT_ELEMENT);
    out.push_str(">\n");
    out
}

fn write_item(out: &mut String, item: &Item, depth: usize) {
    push_indent(out, depth);
    out.push_str("<Item");
    push_attribute(out, "class", &item.class_name);
    push_attribute(out, "referent", item.referent.as_str());
    out.push_str(">\n");

    if !item.properties.is_empty() {
        push_indent(out, depth + 1);
        out.push_str("<Properties>\n");
        for property in &item.properties {
            push_indent(out, depth + 2);
            write_property(out, property);
            out.push('\n');
        }
        push_indent(out, depth + 1);
        out.push_str("</Properties>\n");
    }

    for child in &item.children {
        write_item(out, child, depth + 1);
    }

    push_indent(out, depth);
    out.push_str("</Item>\n");
}

fn write_property(out: &mut String, property: &Property) {
    let tag = match property {
        Property::String { .. } => "string",
        Property::ProtectedString { .. } => "ProtectedString",
    };
    out.push('<');
    out.push_str(tag);
    push_attribute(out, "name", property.name());
    out.push('>');
    match property {
        Property::String { value, .. } => out.push_str(&escape_text(value)),
        Property::ProtectedString { value, .. } => out.push_str(&wrap_cdata(value)),
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_attribute(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(&escape_attribute(value));
    out.push('"');
}

/// Escapes markup characters and writes CR as a reference so line-end
/// normalization leaves it intact.
fn escape_text(value: &str) -> Cow<'_, str> {
    let escaped = partial_escape(value);
    if escaped.contains('\r') {
        Cow::Owned(escaped.replace('\r', CR_REFERENCE))
    } else {
        escaped
    }
}

/// Like [`escape_text`], also quoting `"`/`'` and keeping tab and LF from
/// attribute-value normalization.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if !escaped.contains(['\r', '\n', '\t']) {
        return escaped;
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for ch in escaped.chars() {
        match ch {
            '\r' => out.push_str(CR_REFERENCE),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
