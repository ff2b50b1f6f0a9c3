use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub(crate) type Map = BTreeMap<String, Node>;

/// A node of a configuration tree.
///
/// Strings of the form `${a.b}` are references to other nodes of the same tree,
/// they're resolved by [`crate::Config::resolve`] before instantiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Node>),
    Map(Map),
}

impl Default for Node {
    fn default() -> Self {
        Self::Map(Map::new())
    }
}

impl Node {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::Str(_) => "string",
            Node::List(_) => "list",
            Node::Map(_) => "map",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Node::List(_) | Node::Map(_))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(val) => Some(*val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_list(&self) -> Option<&Vec<Node>> {
        match self {
            Node::List(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Follows a dotted path, numeric segments index lists.
    /// The empty path is the node itself.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.').try_fold(self, |node, segment| match node {
            Node::Map(map) => map.get(segment),
            Node::List(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
            _ => None,
        })
    }

    #[must_use]
    pub fn get_path_mut(&mut self, path: &str) -> Option<&mut Node> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.').try_fold(self, |node, segment| match node {
            Node::Map(map) => map.get_mut(segment),
            Node::List(items) => segment.parse::<usize>().ok().and_then(|index| items.get_mut(index)),
            _ => None,
        })
    }

    /// Text used when the node is interpolated into a string
    #[must_use]
    pub(crate) fn scalar_text(&self) -> Option<String> {
        match self {
            Node::Null => Some("null".to_owned()),
            Node::Bool(val) => Some(val.to_string()),
            Node::Int(val) => Some(val.to_string()),
            Node::Float(val) => Some(val.to_string()),
            Node::Str(val) => Some(val.clone()),
            Node::List(_) | Node::Map(_) => None,
        }
    }
}

impl From<bool> for Node {
    fn from(val: bool) -> Self {
        Node::Bool(val)
    }
}

impl From<i64> for Node {
    fn from(val: i64) -> Self {
        Node::Int(val)
    }
}

impl From<i32> for Node {
    fn from(val: i32) -> Self {
        Node::Int(val.into())
    }
}

impl From<f64> for Node {
    fn from(val: f64) -> Self {
        Node::Float(val)
    }
}

impl From<&str> for Node {
    fn from(val: &str) -> Self {
        Node::Str(val.to_owned())
    }
}

impl From<String> for Node {
    fn from(val: String) -> Self {
        Node::Str(val)
    }
}

impl From<Vec<Node>> for Node {
    fn from(val: Vec<Node>) -> Self {
        Node::List(val)
    }
}

impl From<BTreeMap<String, Node>> for Node {
    fn from(val: BTreeMap<String, Node>) -> Self {
        Node::Map(val)
    }
}

impl From<serde_json::Value> for Node {
    fn from(val: serde_json::Value) -> Self {
        use serde_json::Value;

        match val {
            Value::Null => Node::Null,
            Value::Bool(val) => Node::Bool(val),
            Value::Number(number) => match number.as_i64() {
                Some(val) => Node::Int(val),
                None => number.as_f64().map_or(Node::Null, Node::Float),
            },
            Value::String(val) => Node::Str(val),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => Node::Map(map.into_iter().map(|(key, val)| (key, Node::from(val))).collect()),
        }
    }
}
