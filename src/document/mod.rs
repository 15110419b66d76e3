//! Documents submitted for validation.
//!
//! A [`Document`] wraps the parsed tree of a submitted resource. It is
//! immutable once built; narrative backfill and any other enrichment must
//! happen on the raw JSON before the document is constructed.

pub mod coding;
pub mod node;

use serde_json::Value;
use std::str::FromStr;

use crate::core::BUNDLE_RESOURCE_TYPE;
use crate::error::{Result, ValidatorError};

pub use coding::{CodedValue, CodedValues, extract_codings};
pub use node::{Composite, Leaf, Node};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
}

/// One item of `Bundle.entry`.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub index: usize,
    pub resource: Option<&'a Node>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ValidatorError::document(
                "Document root must be a JSON object",
            ));
        }
        Ok(Self::new(Node::from(value)))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// `resourceType` of the root node.
    pub fn resource_type(&self) -> Option<&str> {
        self.root.get_str("resourceType")
    }

    /// Whether the root is a collection-of-records container.
    pub fn is_bundle(&self) -> bool {
        self.resource_type() == Some(BUNDLE_RESOURCE_TYPE)
    }

    /// Direct entries of a Bundle root. Empty for any other root, and for a
    /// Bundle whose `entry` is absent or not a list.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> {
        let items: &[Node] = if self.is_bundle() {
            self.root.get("entry").and_then(Node::as_list).unwrap_or(&[])
        } else {
            &[]
        };

        items.iter().enumerate().map(|(index, entry)| Entry {
            index,
            resource: entry.get("resource").filter(|r| !r.is_null()),
        })
    }

    /// All coded values under `system`, in document order.
    pub fn codings<'a>(&'a self, system: &'a str) -> CodedValues<'a> {
        extract_codings(&self.root, system)
    }

    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }
}

impl<'a> Entry<'a> {
    pub fn resource_type(&self) -> Option<&'a str> {
        self.resource.and_then(|r| r.get_str("resourceType"))
    }
}

impl FromStr for Document {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }
}

impl TryFrom<Value> for Document {
    type Error = ValidatorError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}
