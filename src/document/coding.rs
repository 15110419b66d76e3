//! Coded value extraction.
//!
//! A coded value is any composite node carrying a textual `system` field and
//! none of the fields that mark an Identifier, ContactPoint or Quantity
//! (`value`, `unit`, `comparator`). Extraction walks the whole tree depth first in
//! document order, so nested codings (inside extensions, components, other
//! codings) are all found.

use std::iter::FusedIterator;

use super::node::{Composite, Node};

/// A `(system, code, display)` triple found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedValue<'a> {
    pub system: &'a str,
    pub code: Option<&'a str>,
    pub display: Option<&'a str>,
    /// Element path of the coding, e.g. `Bundle.entry[0].resource.code.coding[1]`
    pub path: String,
}

/// Fields a Coding never has but Identifier, ContactPoint and the Quantity
/// family (Age, Duration, Distance, Count, SimpleQuantity) may carry.
const NON_CODING_FIELDS: &[&str] = &["value", "unit", "comparator"];

impl<'a> CodedValue<'a> {
    fn from_composite(composite: &'a Composite, path: String) -> Option<Self> {
        if NON_CODING_FIELDS.iter().any(|field| composite.contains(field)) {
            return None;
        }
        let system = composite.get("system")?.as_str()?;
        Some(Self {
            system,
            code: composite.get("code").and_then(Node::as_str),
            display: composite.get("display").and_then(Node::as_str),
            path,
        })
    }

    /// Code value when present and not blank.
    pub fn code(&self) -> Option<&'a str> {
        self.code.filter(|c| !c.trim().is_empty())
    }

    /// Location pointer in `Coding(system|code)` form.
    pub fn location(&self) -> String {
        format!("Coding({}|{})", self.system, self.code.unwrap_or_default())
    }
}

/// Lazy iterator over the coded values of one coding system.
#[derive(Debug, Clone)]
pub struct CodedValues<'a> {
    system: &'a str,
    stack: Vec<(String, &'a Node)>,
}

/// Extract every coded value under `system` (exact match) from `root`.
pub fn extract_codings<'a>(root: &'a Node, system: &'a str) -> CodedValues<'a> {
    let root_path = root.get_str("resourceType").unwrap_or("$").to_string();
    CodedValues {
        system,
        stack: vec![(root_path, root)],
    }
}

impl<'a> Iterator for CodedValues<'a> {
    type Item = CodedValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, node)) = self.stack.pop() {
            match node {
                Node::Leaf(_) => {}
                Node::List(items) => {
                    // reversed so the first item is popped first
                    for (index, item) in items.iter().enumerate().rev() {
                        if !matches!(item, Node::Leaf(_)) {
                            self.stack.push((format!("{path}[{index}]"), item));
                        }
                    }
                }
                Node::Composite(composite) => {
                    for (name, child) in composite.fields().rev() {
                        if !matches!(child, Node::Leaf(_)) {
                            self.stack.push((format!("{path}.{name}"), child));
                        }
                    }
                    if let Some(coded) = CodedValue::from_composite(composite, path) {
                        if coded.system == self.system {
                            return Some(coded);
                        }
                    }
                }
            }
        }
        None
    }
}

impl FusedIterator for CodedValues<'_> {}
