use std::borrow::Cow;
use std::str;

use quick_xml::errors::{Error as QuickXmlError, SyntaxError};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

pub const CDATA_OPEN: &str = "<![CDATA[";
pub const CDATA_CLOSE: &str = "]]>";

/// Character reference emitted between sections for each carriage return.
pub const CR_REFERENCE: &str = "&#13;";

/// Closes the current section after `]]` and reopens a new one for `>`.
const SPLIT_CLOSE: &str = "]]]]><![CDATA[>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CdataError {
    #[error("expected '<![CDATA[' at byte {offset}")]
    ExpectedSection { offset: usize },
    #[error("unterminated CDATA section starting at byte {offset}")]
    Unterminated { offset: usize },
    #[error("malformed CDATA run at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },
}

/// Makes `text` safe to place between `<![CDATA[` and `]]>`.
///
/// Carriage returns are left alone; [`wrap_cdata`] moves them out of the
/// section.
pub fn encode_cdata(text: &str) -> Cow<'_, str> {
    if text.contains(CDATA_CLOSE) {
        Cow::Owned(text.replace(CDATA_CLOSE, SPLIT_CLOSE))
    } else {
        Cow::Borrowed(text)
    }
}

/// Returns `text` as one or more complete CDATA sections.
///
/// A raw CR inside CDATA would be normalized to LF by any conforming parser,
/// so each one is written as [`CR_REFERENCE`] between sections.
pub fn wrap_cdata(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + CDATA_OPEN.len() + CDATA_CLOSE.len());
    for (index, segment) in text.split('\r').enumerate() {
        if index > 0 {
            out.push_str(CR_REFERENCE);
        }
        if !segment.is_empty() {
            out.push_str(CDATA_OPEN);
            out.push_str(&encode_cdata(segment));
            out.push_str(CDATA_CLOSE);
        }
    }
    if out.is_empty() {
        out.push_str(CDATA_OPEN);
        out.push_str(CDATA_CLOSE);
    }
    out
}

/// Concatenates a run of adjacent CDATA sections, decoding the carriage
/// return references [`wrap_cdata`] places between them.
pub fn decode_cdata(input: &str) -> Result<String, CdataError> {
    if input.is_empty() {
        return Err(CdataError::ExpectedSection { offset: 0 });
    }

    let mut reader = Reader::from_str(input);
    let mut output = String::with_capacity(input.len());

    loop {
        let offset = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::CData(section)) => {
                let content = str::from_utf8(&section).map_err(|err| CdataError::Malformed {
                    offset,
                    message: err.to_string(),
                })?;
                output.push_str(content);
            }
            Ok(Event::Text(text)) => {
                let value = text.unescape().map_err(|err| CdataError::Malformed {
                    offset,
                    message: err.to_string(),
                })?;
                if value.is_empty() || value.chars().any(|ch| ch != '\r') {
                    return Err(CdataError::ExpectedSection { offset });
                }
                output.push_str(&value);
            }
            Ok(Event::Eof) => return Ok(output),
            Ok(_) => return Err(CdataError::ExpectedSection { offset }),
            Err(QuickXmlError::Syntax(SyntaxError::UnclosedCData)) => {
                return Err(CdataError::Unterminated { offset })
            }
            Err(err) => {
                return Err(CdataError::Malformed {
                    offset,
                    message: err.to_string(),
                })
            }
        }
    }
}
