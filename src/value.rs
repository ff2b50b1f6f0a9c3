use core::{
    any::{type_name, Any},
    fmt::{self, Debug, Formatter},
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

use crate::{
    directive::ConvertMode,
    errors::InstantiateErrorKind,
    factory::{Args, BoxedFactory},
    node::Node,
};

/// Shared handle to a constructed object.
/// Clones point to the same object, see [`Instance::ptr_eq`].
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    #[inline]
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    #[inline]
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast().ok()
    }

    #[inline]
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let short_name = self.type_name.rsplit_once("::").map_or(self.type_name, |(_, name)| name);
        write!(f, "Instance<{short_name}>")
    }
}

/// Deferred invocation of a factory with bound arguments, created for `_partial_: true`.
///
/// The factory is invoked on every [`Partial::call`], only the handle itself is cached.
#[derive(Clone)]
pub struct Partial {
    inner: Arc<PartialInner>,
}

struct PartialInner {
    target: String,
    factory: BoxedFactory,
    args: Args,
}

impl Partial {
    #[inline]
    #[must_use]
    pub(crate) fn new(target: &str, factory: BoxedFactory, args: Args) -> Self {
        Self {
            inner: Arc::new(PartialInner {
                target: target.to_owned(),
                factory,
                args,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    #[inline]
    #[must_use]
    pub fn args(&self) -> &Args {
        &self.inner.args
    }

    /// Invokes the factory with the bound arguments
    ///
    /// # Errors
    /// Returns the factory error unchanged
    #[inline]
    pub fn call(&self) -> Result<Value, InstantiateErrorKind> {
        self.call_with(Args::new())
    }

    /// Invokes the factory with the bound arguments extended by `extra`.
    /// Positional arguments are appended, named ones replace the bound ones.
    ///
    /// # Errors
    /// Returns the factory error unchanged
    pub fn call_with(&self, extra: Args) -> Result<Value, InstantiateErrorKind> {
        debug!(factory = %self.inner.target, "Call partial");
        self.inner.factory.call(self.inner.args.clone().merge(extra))
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for Partial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partial")
            .field("target", &self.inner.target)
            .field("args", &self.inner.args)
            .finish()
    }
}

/// Result of an instantiation
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Sub-config passed as written because of `_recursive_: false` and `_convert_: none`
    Config(Node),
    Object(Instance),
    Partial(Partial),
}

impl Value {
    #[inline]
    #[must_use]
    pub fn object<T: Send + Sync + 'static>(value: T) -> Self {
        Value::Object(Instance::new(value))
    }

    /// Plain data copy of a node, maps and lists included
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(val) => Value::Bool(*val),
            Node::Int(val) => Value::Int(*val),
            Node::Float(val) => Value::Float(*val),
            Node::Str(val) => Value::Str(val.clone()),
            Node::List(items) => Value::List(items.iter().map(Value::from_node).collect()),
            Node::Map(map) => Value::Map(map.iter().map(|(key, val)| (key.clone(), Value::from_node(val))).collect()),
        }
    }

    /// A node passed to a factory without instantiation
    #[must_use]
    pub(crate) fn unconverted(node: &Node, convert: ConvertMode) -> Self {
        if node.is_scalar() || convert.converts() {
            Value::from_node(node)
        } else {
            Value::Config(node.clone())
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Config(_) => "config",
            Value::Object(_) => "object",
            Value::Partial(_) => "partial",
        }
    }

    /// Checks that both values are the same cached object or partial, not just equal ones
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Partial(a), Value::Partial(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::List(items) => items.get(index),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(val) => Some(*val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(val) => Some(*val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(val) => Some(*val),
            Value::Int(val) => Some(*val as f64),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(val) => Some(val),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_config(&self) -> Option<&Node> {
        match self {
            Value::Config(node) => Some(node),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_partial(&self) -> Option<&Partial> {
        match self {
            Value::Partial(partial) => Some(partial),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_object().and_then(Instance::downcast_ref)
    }

    #[inline]
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.as_object().and_then(Instance::downcast)
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::Int(val)
    }
}

impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::Int(val.into())
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::Str(val.to_owned())
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::Str(val)
    }
}

impl From<Vec<Value>> for Value {
    fn from(val: Vec<Value>) -> Self {
        Value::List(val)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(val: BTreeMap<String, Value>) -> Self {
        Value::Map(val)
    }
}

impl From<Instance> for Value {
    fn from(val: Instance) -> Self {
        Value::Object(val)
    }
}

impl From<Partial> for Value {
    fn from(val: Partial) -> Self {
        Value::Partial(val)
    }
}
