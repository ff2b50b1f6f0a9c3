use anyhow::anyhow;
use core::fmt::{self, Debug, Formatter};
use std::collections::BTreeMap;
use tracing::debug;

use crate::{directive::ConvertMode, errors::InstantiateErrorKind, value::Value};

/// Constructs a value of a `_target_` from its instantiated arguments.
///
/// Implemented for closures `FnMut(Args) -> Result<T, E>`, where `T: Into<Value>` and `E: Into<InstantiateErrorKind>`.
pub trait Factory: Clone + Send + Sync + 'static {
    type Provides: Into<Value>;
    type Error: Into<InstantiateErrorKind>;

    fn construct(&mut self, args: Args) -> Result<Self::Provides, Self::Error>;
}

impl<F, Response, Err> Factory for F
where
    F: FnMut(Args) -> Result<Response, Err> + Clone + Send + Sync + 'static,
    Response: Into<Value>,
    Err: Into<InstantiateErrorKind>,
{
    type Provides = Response;
    type Error = Err;

    #[inline]
    fn construct(&mut self, args: Args) -> Result<Self::Provides, Self::Error> {
        self(args)
    }
}

/// Object-safe form of [`Factory`] with the provided value and the error erased
trait ErasedFactory: Send + Sync {
    fn construct_value(&mut self, args: Args) -> Result<Value, InstantiateErrorKind>;

    #[must_use]
    fn clone_box(&self) -> Box<dyn ErasedFactory>;
}

impl<F: Factory> ErasedFactory for F {
    fn construct_value(&mut self, args: Args) -> Result<Value, InstantiateErrorKind> {
        match self.construct(args) {
            Ok(value) => {
                debug!("Constructed");
                Ok(value.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    #[inline]
    fn clone_box(&self) -> Box<dyn ErasedFactory> {
        Box::new(self.clone())
    }
}

/// Type-erased factory stored in a registry and captured by partials.
/// Every call runs on a fresh clone, so state captured by the factory is shared only through its own handles.
pub(crate) struct BoxedFactory(Box<dyn ErasedFactory>);

impl BoxedFactory {
    #[inline]
    #[must_use]
    pub(crate) fn new<F: Factory>(factory: F) -> Self {
        Self(Box::new(factory))
    }

    #[inline]
    pub(crate) fn call(&self, args: Args) -> Result<Value, InstantiateErrorKind> {
        self.0.clone_box().construct_value(args)
    }
}

impl Clone for BoxedFactory {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl Debug for BoxedFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedFactory")
    }
}

/// Arguments of a factory call: `_args_` as positional ones and the remaining keys as named ones
#[derive(Debug, Clone, Default)]
pub struct Args {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
    convert: ConvertMode,
}

impl Args {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn with_convert(convert: ConvertMode) -> Self {
        Self {
            convert,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.push(value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub(crate) fn push(&mut self, value: Value) {
        self.positional.push(value);
    }

    #[inline]
    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.named.insert(key, value);
    }

    #[inline]
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    #[inline]
    #[must_use]
    pub const fn named_args(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// Conversion mode of the node the arguments come from
    #[inline]
    #[must_use]
    pub const fn convert(&self) -> ConvertMode {
        self.convert
    }

    #[inline]
    #[must_use]
    pub fn nth(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    #[inline]
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.named.remove(key)
    }

    /// # Errors
    /// Returns [`InstantiateErrorKind::Custom`] if the argument is missing or isn't a string
    pub fn get_str(&self, key: &str) -> Result<&str, InstantiateErrorKind> {
        self.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Missing string argument `{key}`").into())
    }

    /// # Errors
    /// Returns [`InstantiateErrorKind::Custom`] if the argument is missing or isn't an integer
    pub fn get_int(&self, key: &str) -> Result<i64, InstantiateErrorKind> {
        self.get(key)
            .and_then(Value::as_int)
            .ok_or_else(|| anyhow!("Missing integer argument `{key}`").into())
    }

    /// Appends positional arguments of `extra` and replaces named ones with its values
    #[must_use]
    pub(crate) fn merge(mut self, extra: Args) -> Self {
        self.positional.extend(extra.positional);
        self.named.extend(extra.named);
        self
    }
}
