use std::mem;

use crate::{errors::ConfigErrorKind, node::Node};

/// A configuration tree with its root node.
///
/// The tree is kept as written. References (`${a.b}`) and string interpolations (`"x-${a.b}"`)
/// are resolved by [`Config::resolve`], which the instantiator calls on every top-level call,
/// so the tree may be changed between calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    root: Node,
}

impl Config {
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<Node>) -> Self {
        Self { root: root.into() }
    }

    /// # Errors
    /// Returns [`ConfigErrorKind::Json`] if the source isn't valid JSON
    pub fn from_json(source: &str) -> Result<Self, ConfigErrorKind> {
        Ok(Self::new(serde_json::from_str::<Node>(source)?))
    }

    /// # Errors
    /// Returns [`ConfigErrorKind::Yaml`] if the source isn't valid YAML
    pub fn from_yaml(source: &str) -> Result<Self, ConfigErrorKind> {
        Ok(Self::new(serde_yaml::from_str::<Node>(source)?))
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    #[inline]
    #[must_use]
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    #[inline]
    #[must_use]
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Gets the node at a dotted path as written, without resolving references
    #[inline]
    #[must_use]
    pub fn select(&self, path: &str) -> Option<&Node> {
        self.root.get_path(path)
    }

    /// Sets the value at a dotted path, returning the previous one.
    /// The parent of the last segment must be an existing map.
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind::InvalidPath`] if the parent isn't a map
    pub fn set(&mut self, path: &str, value: impl Into<Node>) -> Result<Option<Node>, ConfigErrorKind> {
        let (parent, key) = path.rsplit_once('.').unwrap_or(("", path));
        match self.root.get_path_mut(parent) {
            Some(Node::Map(map)) => Ok(map.insert(key.to_owned(), value.into())),
            _ => Err(ConfigErrorKind::InvalidPath { path: path.to_owned() }),
        }
    }

    /// Removes the value at a dotted path from its parent map
    pub fn remove(&mut self, path: &str) -> Option<Node> {
        let (parent, key) = path.rsplit_once('.').unwrap_or(("", path));
        match self.root.get_path_mut(parent) {
            Some(Node::Map(map)) => map.remove(key),
            _ => None,
        }
    }

    /// Returns a copy of the tree with all references and interpolations resolved.
    ///
    /// # Errors
    /// - Returns [`ConfigErrorKind::UnresolvedReference`] if a reference points to nothing
    /// - Returns [`ConfigErrorKind::CyclicReference`] if references form a cycle
    /// - Returns [`ConfigErrorKind::NonScalarInterpolation`] if a map or a list is interpolated into a string
    /// - Returns [`ConfigErrorKind::UnterminatedInterpolation`] if `${` isn't closed
    pub fn resolve(&self) -> Result<Node, ConfigErrorKind> {
        resolve(&self.root)
    }
}

impl From<Node> for Config {
    fn from(root: Node) -> Self {
        Self::new(root)
    }
}

/// Resolves the tree with `root` as the base for absolute reference paths
pub(crate) fn resolve(root: &Node) -> Result<Node, ConfigErrorKind> {
    Resolver { root, stack: Vec::new() }.resolve_node(root)
}

struct Resolver<'a> {
    root: &'a Node,
    /// Paths of the references being resolved, innermost last
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn resolve_node(&mut self, node: &Node) -> Result<Node, ConfigErrorKind> {
        match node {
            Node::Str(val) => self.resolve_str(val),
            Node::List(items) => items.iter().map(|item| self.resolve_node(item)).collect::<Result<_, _>>().map(Node::List),
            Node::Map(map) => map
                .iter()
                .map(|(key, val)| -> Result<_, ConfigErrorKind> { Ok((key.clone(), self.resolve_node(val)?)) })
                .collect::<Result<_, _>>()
                .map(Node::Map),
            scalar => Ok(scalar.clone()),
        }
    }

    fn resolve_str(&mut self, val: &str) -> Result<Node, ConfigErrorKind> {
        if !val.contains("${") {
            return Ok(Node::Str(val.to_owned()));
        }

        let pieces = parse_pieces(val)?;
        if let [Piece::Reference(path)] = pieces.as_slice() {
            return self.resolve_reference(path);
        }

        let mut text = String::with_capacity(val.len());
        for piece in pieces {
            match piece {
                Piece::Text(part) => text.push_str(&part),
                Piece::Reference(path) => {
                    let node = self.resolve_reference(&path)?;
                    let Some(part) = node.scalar_text() else {
                        return Err(ConfigErrorKind::NonScalarInterpolation { path, found: node.kind() });
                    };
                    text.push_str(&part);
                }
            }
        }
        Ok(Node::Str(text))
    }

    fn resolve_reference(&mut self, path: &str) -> Result<Node, ConfigErrorKind> {
        if self.stack.iter().any(|in_progress| in_progress == path) {
            let mut chain = mem::take(&mut self.stack);
            chain.push(path.to_owned());
            return Err(ConfigErrorKind::CyclicReference { chain });
        }
        let Some(target) = self.root.get_path(path) else {
            return Err(ConfigErrorKind::UnresolvedReference { path: path.to_owned() });
        };

        self.stack.push(path.to_owned());
        let resolved = self.resolve_node(target)?;
        self.stack.pop();

        Ok(resolved)
    }
}

#[derive(Debug, PartialEq)]
enum Piece {
    Text(String),
    Reference(String),
}

/// Splits a string into literal text and `${path}` references. `\${` is a literal `${`.
fn parse_pieces(val: &str) -> Result<Vec<Piece>, ConfigErrorKind> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut rest = val;

    while let Some(pos) = rest.find("${") {
        if rest[..pos].ends_with('\\') {
            text.push_str(&rest[..pos - 1]);
            text.push_str("${");
            rest = &rest[pos + 2..];
            continue;
        }

        text.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigErrorKind::UnterminatedInterpolation { value: val.to_owned() });
        };
        if !text.is_empty() {
            pieces.push(Piece::Text(mem::take(&mut text)));
        }
        pieces.push(Piece::Reference(after[..end].trim().to_owned()));
        rest = &after[end + 1..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::{parse_pieces, Config, Piece};
    use crate::{errors::ConfigErrorKind, node::Node};

    use serde_json::json;

    #[test]
    fn test_parse_pieces() {
        assert_eq!(
            parse_pieces("a-${x.y}-b").unwrap(),
            [
                Piece::Text("a-".to_owned()),
                Piece::Reference("x.y".to_owned()),
                Piece::Text("-b".to_owned()),
            ]
        );
        assert_eq!(parse_pieces("${ x }").unwrap(), [Piece::Reference("x".to_owned())]);
        assert_eq!(parse_pieces(r"\${x}").unwrap(), [Piece::Text("${x}".to_owned())]);
        assert!(matches!(
            parse_pieces("${x"),
            Err(ConfigErrorKind::UnterminatedInterpolation { .. })
        ));
    }

    #[test]
    fn test_resolve_references() {
        let config = Config::new(json!({
            "base": { "_target_": "counter", "key": "k" },
            "ref1": "${base}",
            "nested": { "ref2": "${ref1}" },
            "items": ["${base.key}", "${items.0}"],
        }));

        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.get("ref1"), resolved.get("base"));
        assert_eq!(resolved.get_path("nested.ref2"), resolved.get("base"));
        assert_eq!(resolved.get_path("items.1").and_then(Node::as_str), Some("k"));
        // Tree as written is untouched
        assert_eq!(config.select("ref1").and_then(Node::as_str), Some("${base}"));
    }

    #[test]
    fn test_resolve_interpolation() {
        let config = Config::new(json!({
            "host": "localhost",
            "port": 5432,
            "url": "postgres://${host}:${port}/db",
            "escaped": r"\${host}",
            "map": { "a": 1 },
            "bad": "x-${map}",
        }));

        let err = config.resolve().unwrap_err();
        assert!(matches!(err, ConfigErrorKind::NonScalarInterpolation { ref path, found: "map" } if path == "map"));

        let mut config = config;
        config.remove("bad");
        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.get("url").and_then(Node::as_str), Some("postgres://localhost:5432/db"));
        assert_eq!(resolved.get("escaped").and_then(Node::as_str), Some("${host}"));
    }

    #[test]
    fn test_resolve_errors() {
        let missing = Config::new(json!({ "a": "${missing.path}" }));
        assert!(matches!(
            missing.resolve(),
            Err(ConfigErrorKind::UnresolvedReference { ref path }) if path == "missing.path"
        ));

        let cyclic = Config::new(json!({ "a": "${b}", "b": { "c": "${a}" } }));
        let Err(ConfigErrorKind::CyclicReference { chain }) = cyclic.resolve() else {
            panic!("cycle should be detected");
        };
        assert_eq!(chain.first(), chain.last());
    }

    #[test]
    fn test_set_and_remove() {
        let mut config = Config::new(json!({ "a": { "b": 1 } }));

        assert_eq!(config.set("a.b", 2).unwrap(), Some(Node::Int(1)));
        assert_eq!(config.set("a.c", "x").unwrap(), None);
        assert_eq!(config.set("top", true).unwrap(), None);
        assert!(matches!(config.set("a.b.c", 1), Err(ConfigErrorKind::InvalidPath { .. })));
        assert_eq!(config.remove("a.c"), Some(Node::from("x")));
        assert_eq!(config.select("a.b"), Some(&Node::Int(2)));
    }

    #[test]
    fn test_from_yaml_and_json() {
        let yaml = Config::from_yaml("a:\n  _target_: counter\n  key: ${b}\nb: 1\n").unwrap();
        let json = Config::from_json(r#"{"a": {"_target_": "counter", "key": "${b}"}, "b": 1}"#).unwrap();

        assert_eq!(yaml, json);
        assert!(matches!(Config::from_json("{"), Err(ConfigErrorKind::Json(_))));
        assert!(matches!(Config::from_yaml("a: [1"), Err(ConfigErrorKind::Yaml(_))));
    }
}
