use thiserror::Error;

use crate::reader::{Element, XmlDocument};
use crate::referent::{Referent, ReferentError};
use crate::writer::write_document;

pub const ROOT_ELEMENT: &str = "roblox";
pub const FORMAT_VERSION: &str = "4";

/// Attributes of the `<roblox>` root, in emission order.
pub const ROOT_ATTRIBUTES: &[(&str, &str)] = &[
    ("xmlns:xmime", "http://www.w3.org/2005/05/xmlmime"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    (
        "xsi:noNamespaceSchemaLocation",
        "http://www.roblox.com/roblox.xsd",
    ),
    ("version", FORMAT_VERSION),
];

/// Bodies of the two `<External>` placeholder references.
pub const EXTERNAL_PLACEHOLDERS: [&str; 2] = ["null", "nil"];

/// A complete place file: the ordered top-level items under `<roblox>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaceDocument {
    pub items: Vec<Item>,
}

/// One `<Item>` node: a service, sub-container, or script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub class_name: String,
    pub referent: Referent,
    pub properties: Vec<Property>,
    pub children: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Property {
    /// Escaped character data, e.g. `Name`.
    String { name: String, value: String },
    /// Raw text carried in CDATA, e.g. a script's `Source`.
    ProtectedString { name: String, value: String },
}

/// Ways a parsed XML tree can fail to describe a place file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("root element is <{0}>, expected <roblox>")]
    UnexpectedRoot(String),
    #[error("unexpected <{element}> inside <{parent}> at byte {offset}")]
    UnexpectedElement {
        parent: String,
        element: String,
        offset: usize,
    },
    #[error("<Item> at byte {offset} is missing the '{attribute}' attribute")]
    MissingAttribute {
        attribute: &'static str,
        offset: usize,
    },
    #[error("<{element}> at byte {offset} is missing the 'name' attribute")]
    UnnamedProperty { element: String, offset: usize },
    #[error("invalid referent at byte {offset}: {source}")]
    InvalidReferent {
        offset: usize,
        #[source]
        source: ReferentError,
    },
}

impl PlaceDocument {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Serializes the document, see [`write_document`].
    pub fn to_xml(&self) -> String {
        write_document(self)
    }

    /// Every item in the document, depth-first in emission order.
    pub fn walk(&self) -> Vec<&Item> {
        let mut found = Vec::new();
        for item in &self.items {
            item.collect_into(&mut found);
        }
        found
    }

    /// Finds a top-level item by its `Name` property.
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name() == Some(name))
    }

    /// Rebuilds the typed tree from parsed XML. `<External>` placeholders are
    /// accepted and dropped since the writer always emits them.
    pub fn from_xml(document: &XmlDocument) -> Result<Self, StructureError> {
        let root = &document.root;
        if root.name != ROOT_ELEMENT {
            return Err(StructureError::UnexpectedRoot(root.name.clone()));
        }

        let mut items = Vec::new();
        for element in root.elements() {
            match element.name.as_str() {
                "External" => {}
                "Item" => items.push(Item::from_element(element)?),
                other => {
                    return Err(StructureError::UnexpectedElement {
                        parent: ROOT_ELEMENT.to_string(),
                        element: other.to_string(),
                        offset: element.offset,
                    })
                }
            }
        }
        Ok(Self { items })
    }
}

impl Item {
    pub fn new(class_name: impl Into<String>, referent: Referent) -> Self {
        Self {
            class_name: class_name.into(),
            referent,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Value of the `Name` string property, if present.
    pub fn name(&self) -> Option<&str> {
        self.string_property("Name")
    }

    pub fn string_property(&self, name: &str) -> Option<&str> {
        self.properties.iter().find_map(|property| match property {
            Property::String { name: key, value } if key == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn protected_string(&self, name: &str) -> Option<&str> {
        self.properties.iter().find_map(|property| match property {
            Property::ProtectedString { name: key, value } if key == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Finds a direct child by its `Name` property.
    pub fn child(&self, name: &str) -> Option<&Item> {
        self.children.iter().find(|item| item.name() == Some(name))
    }

    fn collect_into<'a>(&'a self, found: &mut Vec<&'a Item>) {
        found.push(self);
        for child in &self.children {
            child.collect_into(found);
        }
    }

    fn from_element(element: &Element) -> Result<Self, StructureError> {
        let class_name = element
            .attribute("class")
            .ok_or(StructureError::MissingAttribute {
                attribute: "class",
                offset: element.offset,
            })?;
        let referent = element
            .attribute("referent")
            .ok_or(StructureError::MissingAttribute {
                attribute: "referent",
                offset: element.offset,
            })?;
        let referent =
            Referent::parse(referent).map_err(|source| StructureError::InvalidReferent {
                offset: element.offset,
                source,
            })?;

        let mut item = Item::new(class_name, referent);
        for child in element.elements() {
            match child.name.as_str() {
                "Properties" => {
                    for property in child.elements() {
                        item.properties.push(Property::from_element(property)?);
                    }
                }
                "Item" => item.children.push(Item::from_element(child)?),
                other => {
                    return Err(StructureError::UnexpectedElement {
                        parent: "Item".to_string(),
                        element: other.to_string(),
                        offset: child.offset,
                    })
                }
            }
        }
        Ok(item)
    }
}

impl Property {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Property::String {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn protected_string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Property::ProtectedString {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Property::String { name, .. } | Property::ProtectedString { name, .. } => name,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Property::String { value, .. } | Property::ProtectedString { value, .. } => value,
        }
    }

    fn from_element(element: &Element) -> Result<Self, StructureError> {
        let name = element
            .attribute("name")
            .ok_or_else(|| StructureError::UnnamedProperty {
                element: element.name.clone(),
                offset: element.offset,
            })?;
        match element.name.as_str() {
            "string" => Ok(Property::string(name, element.text())),
            "ProtectedString" => Ok(Property::protected_string(name, element.text())),
            other => Err(StructureError::UnexpectedElement {
                parent: "Properties".to_string(),
                element: other.to_string(),
                offset: element.offset,
            }),
        }
    }
}
