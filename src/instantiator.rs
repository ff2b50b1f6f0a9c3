use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, debug_span, info_span};

use crate::{
    cache::{CacheMode, Store},
    config::{self, Config},
    directive::{self, Directives, Once},
    errors::InstantiateErrorKind,
    factory::Args,
    node::{Map, Node},
    registry::Registry,
    signature::CacheKey,
    value::{Partial, Value},
};

/// Builds config trees through the factories of a [`Registry`].
///
/// Cheap to clone, clones share the registry.
#[derive(Clone)]
pub struct Instantiator {
    registry: Arc<Registry>,
}

impl Instantiator {
    #[inline]
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolves references of the config and instantiates it.
    ///
    /// Nodes with `_once_` enabled are looked up in the cache selected by `cache` and constructed only on a miss.
    /// A construction that fails stores nothing, so a later call constructs the node again.
    ///
    /// # Errors
    /// - Returns [`InstantiateErrorKind::Config`] if references of the config can't be resolved
    /// - Returns directive errors of the visited nodes, see [`InstantiateErrorKind`]
    /// - Returns [`InstantiateErrorKind::NoFactory`] if a target isn't registered
    /// - Returns factory errors unchanged
    pub fn instantiate<'a>(&self, config: &Config, cache: impl Into<CacheMode<'a>>) -> Result<Value, InstantiateErrorKind> {
        self.instantiate_node(config.root(), cache)
    }

    /// Same as [`Self::instantiate`] for a free-standing node.
    /// References are resolved against the node itself.
    ///
    /// # Errors
    /// See [`Self::instantiate`]
    pub fn instantiate_node<'a>(&self, node: &Node, cache: impl Into<CacheMode<'a>>) -> Result<Value, InstantiateErrorKind> {
        let cache = cache.into();

        let span = info_span!("instantiate", cache = cache.name());
        let _guard = span.enter();

        let root = config::resolve(node)?;
        cache.with_store(|store| self.visit(&root, store))
    }

    fn visit(&self, node: &Node, store: &mut Store<'_>) -> Result<Value, InstantiateErrorKind> {
        match node {
            Node::Map(map) => self.visit_map(map, store),
            Node::List(items) => items
                .iter()
                .map(|item| self.visit(item, store))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            _ => Ok(Value::from_node(node)),
        }
    }

    fn visit_map(&self, map: &Map, store: &mut Store<'_>) -> Result<Value, InstantiateErrorKind> {
        match CacheKey::derive(Once::parse(map)?, map)? {
            None => self.build(map, store),
            Some(key) => self.build_once(key, map, store),
        }
    }

    fn build_once(&self, key: CacheKey, map: &Map, store: &mut Store<'_>) -> Result<Value, InstantiateErrorKind> {
        let span = debug_span!("once", key = %key, cache = store.name());
        let _guard = span.enter();

        // Other threads wait here until the value is stored or the construction fails
        let _flight = store.single_flight();

        if let Some(value) = store.get(&key) {
            debug!("Found in cache");
            return Ok(value);
        }
        debug!("Not found in cache");

        let value = self.build(map, store)?;
        let value = store.insert(key, value);
        debug!("Cached");

        Ok(value)
    }

    fn build(&self, map: &Map, store: &mut Store<'_>) -> Result<Value, InstantiateErrorKind> {
        let directives = Directives::parse(map)?;

        let Some(target) = directives.target else {
            return directive::kwargs(map)
                .map(|(key, node)| -> Result<_, InstantiateErrorKind> { Ok((key.clone(), self.visit(node, store)?)) })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Map);
        };

        let span = debug_span!("construct", factory = target);
        let _guard = span.enter();

        let Some(factory) = self.registry.get(target) else {
            return Err(InstantiateErrorKind::NoFactory {
                target: target.to_owned(),
            });
        };

        let mut args = Args::with_convert(directives.convert);
        for node in directives.args {
            args.push(self.argument(node, &directives, store)?);
        }
        for (key, node) in directive::kwargs(map) {
            args.insert(key.clone(), self.argument(node, &directives, store)?);
        }

        if directives.partial {
            debug!("Partial created");
            return Ok(Value::Partial(Partial::new(target, factory.clone(), args)));
        }

        factory.call(args)
    }

    fn argument(&self, node: &Node, directives: &Directives<'_>, store: &mut Store<'_>) -> Result<Value, InstantiateErrorKind> {
        if directives.recursive {
            self.visit(node, store)
        } else {
            Ok(Value::unconverted(node, directives.convert))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Instantiator;
    use crate::{
        cache::{Cache, CacheMode},
        config::Config,
        errors::InstantiateErrorKind,
        factory::Args,
        node::Node,
        registry,
        value::Value,
    };

    use core::sync::atomic::{AtomicUsize, Ordering};
    use serde_json::json;
    use std::sync::Arc;
    use tracing_test::traced_test;

    struct Connection {
        url: String,
        id: usize,
    }

    fn instantiator(call_count: Arc<AtomicUsize>) -> Instantiator {
        Instantiator::new(registry! {
            provide("db.connect", move |args: Args| {
                let id = call_count.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, InstantiateErrorKind>(Value::object(Connection {
                    url: args.get_str("url")?.to_owned(),
                    id,
                }))
            }),
            provide("sum", |args: Args| {
                Ok::<_, InstantiateErrorKind>(Value::Int(args.positional().iter().filter_map(Value::as_int).sum()))
            }),
        })
    }

    fn config(val: serde_json::Value) -> Config {
        Config::new(Node::from(val))
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Instantiator>();
    }

    #[test]
    #[traced_test]
    fn test_plain_data() {
        let instantiator = instantiator(Arc::default());

        let value = instantiator
            .instantiate(&config(json!({ "a": [1, "x", null], "b": { "c": 1.5 } })), CacheMode::Ephemeral)
            .unwrap();

        assert_eq!(value.get("a").and_then(|a| a.index(1)).and_then(Value::as_str), Some("x"));
        assert!(value.get("a").and_then(|a| a.index(2)).unwrap().is_null());
        assert_eq!(value.get("b").and_then(|b| b.get("c")).and_then(Value::as_float), Some(1.5));
    }

    #[test]
    #[traced_test]
    fn test_without_once_constructs_every_visit() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let instantiator = instantiator(call_count.clone());
        let config = config(json!({
            "conn": { "_target_": "db.connect", "url": "db://" },
            "a": "${conn}",
            "b": "${conn}",
        }));

        let value = instantiator.instantiate(&config, CacheMode::Ephemeral).unwrap();

        assert!(!value.get("a").unwrap().is_same(value.get("b").unwrap()));
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(logs_contain("Constructed"));
        assert!(!logs_contain("Cached"));
    }

    #[test]
    #[traced_test]
    fn test_once_collapses_shared_references() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let instantiator = instantiator(call_count.clone());
        let config = config(json!({
            "conn": { "_target_": "db.connect", "_once_": true, "url": "db://" },
            "a": "${conn}",
            "b": "${conn}",
        }));

        let value = instantiator.instantiate(&config, CacheMode::Ephemeral).unwrap();

        let conn = value.get("conn").unwrap();
        assert!(conn.is_same(value.get("a").unwrap()));
        assert!(conn.is_same(value.get("b").unwrap()));
        assert_eq!(conn.downcast_ref::<Connection>().unwrap().url, "db://");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Not found in cache"));
        assert!(logs_contain("Found in cache"));
        assert!(logs_contain("Cached"));
    }

    #[test]
    #[traced_test]
    fn test_local_cache_lives_across_calls() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let instantiator = instantiator(call_count.clone());
        let config = config(json!({ "_target_": "db.connect", "_once_": "conn", "url": "db://" }));
        let mut cache = Cache::new();

        let first = instantiator.instantiate(&config, &mut cache).unwrap();
        let second = instantiator.instantiate(&config, &mut cache).unwrap();
        let ephemeral = instantiator.instantiate(&config, CacheMode::Ephemeral).unwrap();

        assert!(first.is_same(&second));
        assert!(!first.is_same(&ephemeral));
        assert_eq!(ephemeral.downcast_ref::<Connection>().unwrap().id, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_cache_hit_skips_validation_of_other_fields() {
        let instantiator = instantiator(Arc::default());
        let mut cache = Cache::new();

        instantiator
            .instantiate(&config(json!({ "_target_": "db.connect", "_once_": "conn", "url": "db://" })), &mut cache)
            .unwrap();
        // Unknown target and invalid `_partial_`, but the manual key is already cached
        let value = instantiator
            .instantiate(&config(json!({ "_target_": "unknown", "_once_": "conn", "_partial_": 1 })), &mut cache)
            .unwrap();

        assert_eq!(value.downcast_ref::<Connection>().unwrap().url, "db://");
    }

    #[test]
    #[traced_test]
    fn test_positional_args() {
        let instantiator = instantiator(Arc::default());

        let value = instantiator
            .instantiate(
                &config(json!({ "_target_": "sum", "_args_": [1, { "_target_": "sum", "_args_": [2, 3] }] })),
                CacheMode::Ephemeral,
            )
            .unwrap();

        assert_eq!(value.as_int(), Some(6));
    }

    #[test]
    #[traced_test]
    fn test_partial() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let instantiator = instantiator(call_count.clone());

        let value = instantiator
            .instantiate(
                &config(json!({ "_target_": "db.connect", "_partial_": true, "url": "db://" })),
                CacheMode::Ephemeral,
            )
            .unwrap();
        let partial = value.as_partial().unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert_eq!(partial.target(), "db.connect");

        let conn = partial.call_with(Args::new().named("url", "db://other")).unwrap();
        assert_eq!(conn.downcast_ref::<Connection>().unwrap().url, "db://other");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Partial created"));
    }

    #[test]
    #[traced_test]
    fn test_errors() {
        let instantiator = instantiator(Arc::default());

        assert!(matches!(
            instantiator.instantiate(&config(json!({ "_target_": "unknown" })), CacheMode::Ephemeral),
            Err(InstantiateErrorKind::NoFactory { target }) if target == "unknown"
        ));
        assert!(matches!(
            instantiator.instantiate(&config(json!({ "_target_": "db.connect" })), CacheMode::Ephemeral),
            Err(InstantiateErrorKind::Custom(_))
        ));
        assert!(matches!(
            instantiator.instantiate(&config(json!({ "a": "${missing}" })), CacheMode::Ephemeral),
            Err(InstantiateErrorKind::Config(_))
        ));
        assert!(matches!(
            instantiator.instantiate(&config(json!({ "a": { "_once_": true } })), CacheMode::Ephemeral),
            Err(InstantiateErrorKind::MissingTarget)
        ));
    }
}
