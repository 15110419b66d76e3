//! Generic tree representation of a submitted document.
//!
//! Every node is a [`Leaf`] value, a [`Composite`] of named fields, or a list
//! of nodes. Field order of composites follows the order in the source JSON,
//! which keeps traversals deterministic for a fixed input.

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    Composite(Composite),
    List(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

/// Named fields in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    fields: Vec<(String, Node)>,
}

impl Node {
    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Node::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Leaf(Leaf::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Leaf(Leaf::Null))
    }

    /// Shorthand for a field lookup on a composite node.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.as_composite().and_then(|c| c.get(name))
    }

    /// Text value of a field, if present and textual.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Node::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::from(self)
    }
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, node: Node) -> Self {
        self.fields.push((name.into(), node));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, node)| node)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl DoubleEndedIterator<Item = (&str, &Node)> {
        self.fields.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Leaf(Leaf::Null),
            Value::Bool(b) => Node::Leaf(Leaf::Bool(b)),
            Value::Number(n) => Node::Leaf(Leaf::Number(n)),
            Value::String(s) => Node::Leaf(Leaf::Text(s)),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => Node::Composite(Composite {
                fields: map.into_iter().map(|(k, v)| (k, Node::from(v))).collect(),
            }),
        }
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        match node {
            Node::Leaf(Leaf::Null) => Value::Null,
            Node::Leaf(Leaf::Bool(b)) => Value::Bool(*b),
            Node::Leaf(Leaf::Number(n)) => Value::Number(n.clone()),
            Node::Leaf(Leaf::Text(s)) => Value::String(s.clone()),
            Node::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            Node::Composite(composite) => Value::Object(
                composite
                    .fields()
                    .map(|(k, v)| (k.to_string(), Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Leaf(Leaf::Text(text.to_string()))
    }
}

impl From<Composite> for Node {
    fn from(composite: Composite) -> Self {
        Node::Composite(composite)
    }
}
