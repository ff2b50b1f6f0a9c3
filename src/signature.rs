use core::fmt::{self, Display, Formatter};

use crate::{
    directive::{self, Once, CONVERT, ONCE, PARTIAL, RECURSIVE, TARGET},
    errors::InstantiateErrorKind,
    node::{Map, Node},
};

/// Hashable and totally ordered form of a node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Frozen {
    Null,
    Bool(bool),
    Int(i64),
    /// Bit pattern of a non-integral float
    Float(u64),
    Str(String),
    Seq(Vec<Frozen>),
    /// Key-sorted pairs
    Map(Vec<(String, Frozen)>),
}

impl From<&Node> for Frozen {
    fn from(node: &Node) -> Self {
        match node {
            Node::Null => Frozen::Null,
            Node::Bool(val) => Frozen::Bool(*val),
            Node::Int(val) => Frozen::Int(*val),
            Node::Float(val) => freeze_float(*val),
            Node::Str(val) => Frozen::Str(val.clone()),
            Node::List(items) => Frozen::Seq(items.iter().map(Frozen::from).collect()),
            Node::Map(map) => Frozen::Map(map.iter().map(|(key, val)| (key.clone(), Frozen::from(val))).collect()),
        }
    }
}

/// Integral floats are equal to the same integer, `-0.0` included
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn freeze_float(val: f64) -> Frozen {
    if val.fract() == 0.0 && val >= i64::MIN as f64 && val < i64::MAX as f64 {
        Frozen::Int(val as i64)
    } else {
        Frozen::Float(val.to_bits())
    }
}

/// Canonical content of a node with `_once_: true`.
///
/// `_partial_` and `_recursive_` are normalized: absent and the default value (`false` and `true`)
/// give the same signature. `_convert_` is taken as written, so an explicit `"none"` differs from an absent one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature {
    target: String,
    partial: Frozen,
    recursive: Frozen,
    convert: Option<Frozen>,
    /// Remaining keys, `_args_` included
    arguments: Vec<(String, Frozen)>,
}

impl Signature {
    pub(crate) fn new(map: &Map) -> Result<Self, InstantiateErrorKind> {
        let target = directive::target(map)?.ok_or(InstantiateErrorKind::MissingTarget)?;

        Ok(Self {
            target: target.to_owned(),
            partial: normalized(map, PARTIAL, false),
            recursive: normalized(map, RECURSIVE, true),
            convert: map.get(CONVERT).map(Frozen::from),
            arguments: map
                .iter()
                .filter(|(key, _)| ![TARGET, ONCE, PARTIAL, RECURSIVE, CONVERT].contains(&key.as_str()))
                .map(|(key, val)| (key.clone(), Frozen::from(val)))
                .collect(),
        })
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

fn normalized(map: &Map, key: &str, default: bool) -> Frozen {
    match map.get(key) {
        None => Frozen::Bool(default),
        Some(node) => Frozen::from(node),
    }
}

/// Key of a cached value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheKey {
    /// Value of `_once_: "<key>"` taken verbatim, the rest of the node is ignored
    Manual(String),
    /// Signature of a node with `_once_: true`
    Automatic(Signature),
}

impl CacheKey {
    /// Derives the key of a node, `None` if once is disabled for it.
    ///
    /// # Errors
    /// Returns the errors of [`Once::of`]
    pub fn of(node: &Node) -> Result<Option<Self>, InstantiateErrorKind> {
        match node {
            Node::Map(map) => Self::derive(Once::parse(map)?, map),
            _ => Ok(None),
        }
    }

    pub(crate) fn derive(once: Once, map: &Map) -> Result<Option<Self>, InstantiateErrorKind> {
        match once {
            Once::Disabled => Ok(None),
            Once::Manual(key) => Ok(Some(Self::Manual(key))),
            Once::Automatic => Signature::new(map).map(|signature| Some(Self::Automatic(signature))),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Manual(key) => write!(f, "manual({key})"),
            CacheKey::Automatic(signature) => write!(f, "automatic({})", signature.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheKey, Frozen};
    use crate::{errors::InstantiateErrorKind, node::Node};

    use serde_json::json;

    fn key(val: serde_json::Value) -> CacheKey {
        CacheKey::of(&Node::from(val)).unwrap().unwrap()
    }

    #[test]
    fn test_disabled_has_no_key() {
        assert_eq!(CacheKey::of(&Node::from(json!({ "_target_": "a" }))).unwrap(), None);
        assert_eq!(CacheKey::of(&Node::from(json!({ "_once_": false }))).unwrap(), None);
        assert_eq!(CacheKey::of(&Node::from(json!("${a}"))).unwrap(), None);
    }

    #[test]
    fn test_manual_key_ignores_content() {
        let base = key(json!({ "_target_": "a", "_once_": "k", "x": 1 }));

        assert_eq!(base, CacheKey::Manual("k".to_owned()));
        assert_eq!(base, key(json!({ "_target_": "b", "_once_": "k", "y": [1, 2] })));
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": "other", "x": 1 })));
    }

    #[test]
    fn test_automatic_key_sensitivity() {
        let base = key(json!({ "_target_": "a", "_once_": true, "x": 1 }));

        assert_eq!(base, key(json!({ "x": 1, "_once_": true, "_target_": "a" })));
        assert_ne!(base, key(json!({ "_target_": "b", "_once_": true, "x": 1 })));
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": true, "x": 2 })));
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": true, "x": 1, "y": 1 })));
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": true, "x": 1, "_args_": [1] })));
        assert_ne!(base, CacheKey::Manual("a".to_owned()));
    }

    #[test]
    fn test_default_normalization() {
        let base = key(json!({ "_target_": "a", "_once_": true }));

        assert_eq!(base, key(json!({ "_target_": "a", "_once_": true, "_partial_": false })));
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": true, "_partial_": true })));

        assert_eq!(base, key(json!({ "_target_": "a", "_once_": true, "_recursive_": true })));
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": true, "_recursive_": false })));

        // `_convert_` isn't normalized, the default value written explicitly changes the key
        let none = key(json!({ "_target_": "a", "_once_": true, "_convert_": "none" }));
        assert_ne!(base, none);
        assert_ne!(none, key(json!({ "_target_": "a", "_once_": true, "_convert_": "partial" })));

        // Invalid values are taken literally
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": true, "_partial_": "false" })));
    }

    #[test]
    fn test_nested_canonical_form() {
        let base = key(json!({ "_target_": "a", "_once_": true, "x": { "b": [1, 2], "a": { "c": null } } }));

        assert_eq!(base, key(json!({ "_target_": "a", "_once_": true, "x": { "a": { "c": null }, "b": [1, 2] } })));
        // Sequences keep their order
        assert_ne!(base, key(json!({ "_target_": "a", "_once_": true, "x": { "b": [2, 1], "a": { "c": null } } })));
    }

    #[test]
    fn test_floats() {
        assert_eq!(Frozen::from(&Node::Float(1.0)), Frozen::Int(1));
        assert_eq!(Frozen::from(&Node::Float(-0.0)), Frozen::Int(0));
        assert_eq!(Frozen::from(&Node::Float(0.5)), Frozen::Float(0.5f64.to_bits()));
        assert_eq!(Frozen::from(&Node::Float(f64::INFINITY)), Frozen::Float(f64::INFINITY.to_bits()));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            CacheKey::of(&Node::from(json!({ "_once_": true }))),
            Err(InstantiateErrorKind::MissingTarget)
        ));
        assert!(matches!(
            CacheKey::of(&Node::from(json!({ "_target_": "a", "_once_": 1.5 }))),
            Err(InstantiateErrorKind::InvalidDirective { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(key(json!({ "_target_": "a", "_once_": "k" })).to_string(), "manual(k)");
        assert_eq!(key(json!({ "_target_": "a", "_once_": true })).to_string(), "automatic(a)");
    }
}
