//! Document model for Roblox XML place files (`.rbxlx`).
//!
//! Documents are built as a tree of [`Item`]s and serialized in a separate
//! pass by [`write_document`]. The [`parse`] reader, built on `quick_xml`,
//! turns emitted text back into a generic element tree so structure can be
//! inspected without string scraping.

mod cdata;
mod chars;
mod node;
mod reader;
mod referent;
mod writer;

pub use cdata::{
    decode_cdata, encode_cdata, wrap_cdata, CdataError, CDATA_CLOSE, CDATA_OPEN, CR_REFERENCE,
};
pub use chars::{find_invalid_char, is_xml_char};
pub use node::{
    Item, PlaceDocument, Property, StructureError, EXTERNAL_PLACEHOLDERS, FORMAT_VERSION,
    ROOT_ATTRIBUTES, ROOT_ELEMENT,
};
pub use reader::{parse, Declaration, Element, XmlDocument, XmlError, XmlNode};
pub use referent::{Referent, ReferentError, ReferentGenerator};
pub use writer::{write_document, XML_DECLARATION};
