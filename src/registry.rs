use std::collections::BTreeMap;

use crate::factory::{BoxedFactory, Factory};

/// Factories by `_target_` identifier
#[derive(Default, Clone)]
pub struct Registry {
    factories: BTreeMap<String, BoxedFactory>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers the factory of a target. A factory registered earlier for the same target is replaced.
    #[inline]
    #[must_use]
    pub fn provide<F: Factory>(mut self, target: impl Into<String>, factory: F) -> Self {
        self.add_factory(target, factory);
        self
    }

    /// Registers the factory of a target, returning `true` if it replaced another one
    #[inline]
    pub fn add_factory<F: Factory>(&mut self, target: impl Into<String>, factory: F) -> bool {
        self.factories.insert(target.into(), BoxedFactory::new(factory)).is_some()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.factories.contains_key(target)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    #[inline]
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, target: &str) -> Option<&BoxedFactory> {
        self.factories.get(target)
    }
}
