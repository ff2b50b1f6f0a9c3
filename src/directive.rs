use core::str::FromStr;

use crate::{
    errors::InstantiateErrorKind,
    node::{Map, Node},
};

pub(crate) const TARGET: &str = "_target_";
pub(crate) const ONCE: &str = "_once_";
pub(crate) const PARTIAL: &str = "_partial_";
pub(crate) const RECURSIVE: &str = "_recursive_";
pub(crate) const CONVERT: &str = "_convert_";
pub(crate) const ARGS: &str = "_args_";

/// Keys that are never passed to a factory as named arguments
pub(crate) const RESERVED: [&str; 6] = [TARGET, ONCE, PARTIAL, RECURSIVE, CONVERT, ARGS];

#[inline]
#[must_use]
pub(crate) fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}

/// Named arguments of a node, i.e. all non-reserved keys
#[inline]
pub(crate) fn kwargs(map: &Map) -> impl Iterator<Item = (&String, &Node)> {
    map.iter().filter(|(key, _)| !is_reserved(key))
}

/// The `_once_` directive of a node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Once {
    /// `_once_` is absent or `false`, the node is built on every visit
    #[default]
    Disabled,
    /// `_once_: true`, the cache key is derived from the node content
    Automatic,
    /// `_once_: "<key>"`, the string is the cache key
    Manual(String),
}

impl Once {
    /// Parses the `_once_` directive of a node. Nodes other than maps never have one.
    ///
    /// # Errors
    /// - Returns [`InstantiateErrorKind::UnhashableManualKey`] if `_once_` is a list or a map
    /// - Returns [`InstantiateErrorKind::InvalidDirective`] if `_once_` is neither a bool nor a string,
    ///   or if `_target_` isn't a string while once is enabled
    /// - Returns [`InstantiateErrorKind::MissingTarget`] if once is enabled, but `_target_` is absent
    pub fn of(node: &Node) -> Result<Self, InstantiateErrorKind> {
        match node {
            Node::Map(map) => Self::parse(map),
            _ => Ok(Self::Disabled),
        }
    }

    pub(crate) fn parse(map: &Map) -> Result<Self, InstantiateErrorKind> {
        let once = match map.get(ONCE) {
            None | Some(Node::Bool(false)) => return Ok(Self::Disabled),
            Some(Node::Bool(true)) => Self::Automatic,
            Some(Node::Str(key)) => Self::Manual(key.clone()),
            Some(node @ (Node::List(_) | Node::Map(_))) => {
                return Err(InstantiateErrorKind::UnhashableManualKey { found: node.kind() });
            }
            Some(node) => {
                return Err(InstantiateErrorKind::InvalidDirective {
                    key: ONCE,
                    expected: "a bool or a string",
                    found: node.kind(),
                });
            }
        };

        target(map)?.ok_or(InstantiateErrorKind::MissingTarget)?;
        Ok(once)
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Conversion applied to sub-configs passed to a factory without instantiation (`_recursive_: false`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvertMode {
    /// Sub-configs are passed as [`crate::Value::Config`]
    #[default]
    None,
    /// Sub-configs are converted to plain [`crate::Value::Map`]/[`crate::Value::List`] data
    Partial,
    Object,
    All,
}

impl ConvertMode {
    #[inline]
    #[must_use]
    pub const fn converts(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for ConvertMode {
    type Err = InstantiateErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "null" => Ok(Self::None),
            "partial" => Ok(Self::Partial),
            "object" => Ok(Self::Object),
            "all" => Ok(Self::All),
            _ => Err(InstantiateErrorKind::UnknownConvertMode(s.to_owned())),
        }
    }
}

/// `_target_` of a node, if any
pub(crate) fn target(map: &Map) -> Result<Option<&str>, InstantiateErrorKind> {
    match map.get(TARGET) {
        None => Ok(None),
        Some(Node::Str(target)) => Ok(Some(target)),
        Some(node) => Err(InstantiateErrorKind::InvalidDirective {
            key: TARGET,
            expected: "a string",
            found: node.kind(),
        }),
    }
}

/// Directives the engine needs to construct a node
#[derive(Debug)]
pub(crate) struct Directives<'a> {
    pub(crate) target: Option<&'a str>,
    pub(crate) partial: bool,
    pub(crate) recursive: bool,
    pub(crate) convert: ConvertMode,
    pub(crate) args: &'a [Node],
}

impl<'a> Directives<'a> {
    pub(crate) fn parse(map: &'a Map) -> Result<Self, InstantiateErrorKind> {
        let convert = match map.get(CONVERT) {
            None => ConvertMode::default(),
            Some(Node::Str(mode)) => mode.parse()?,
            Some(node) => {
                return Err(InstantiateErrorKind::InvalidDirective {
                    key: CONVERT,
                    expected: "a string",
                    found: node.kind(),
                })
            }
        };
        let args = match map.get(ARGS) {
            None => &[],
            Some(Node::List(args)) => args.as_slice(),
            Some(node) => {
                return Err(InstantiateErrorKind::InvalidDirective {
                    key: ARGS,
                    expected: "a list",
                    found: node.kind(),
                })
            }
        };

        Ok(Self {
            target: target(map)?,
            partial: flag(map, PARTIAL, false)?,
            recursive: flag(map, RECURSIVE, true)?,
            convert,
            args,
        })
    }
}

fn flag(map: &Map, key: &'static str, default: bool) -> Result<bool, InstantiateErrorKind> {
    match map.get(key) {
        None => Ok(default),
        Some(Node::Bool(val)) => Ok(*val),
        Some(node) => Err(InstantiateErrorKind::InvalidDirective {
            key,
            expected: "a bool",
            found: node.kind(),
        }),
    }
}
