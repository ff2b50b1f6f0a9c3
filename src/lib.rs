//! Construct-at-most-once memoization for config-driven instantiation.
//!
//! A [`Config`] tree names constructible targets with `_target_` and their
//! arguments with the remaining keys. [`Instantiator`] builds the tree through the
//! factories of a [`Registry`]. Nodes carrying `_once_: true` (automatic key) or
//! `_once_: "<key>"` (manual key) are built at most once per [`Cache`]:
//!
//! ```rust
//! use instantiate_once::{registry, Args, CacheMode, Config, InstantiateErrorKind, Instantiator, Value};
//!
//! struct Pool(String);
//!
//! let instantiator = Instantiator::new(registry! {
//!     provide("db.pool", |args: Args| {
//!         Ok::<_, InstantiateErrorKind>(Value::object(Pool(args.get_str("url")?.to_owned())))
//!     }),
//! });
//! let config = Config::from_yaml(concat!(
//!     "pool: { _target_: db.pool, _once_: true, url: 'postgres://localhost' }\n",
//!     "primary: ${pool}\n",
//!     "replica: ${pool}\n",
//! ))
//! .unwrap();
//!
//! let value = instantiator.instantiate(&config, CacheMode::Ephemeral).unwrap();
//! let primary = value.get("primary").unwrap();
//! let replica = value.get("replica").unwrap();
//!
//! assert!(primary.is_same(replica));
//! assert_eq!(primary.downcast_ref::<Pool>().unwrap().0, "postgres://localhost");
//! ```

pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod directive;
pub(crate) mod errors;
pub(crate) mod factory;
pub(crate) mod instantiator;
pub(crate) mod node;
pub(crate) mod registry;
pub(crate) mod registry_macros;
pub(crate) mod signature;
pub(crate) mod value;

pub use cache::{clear, Cache, CacheMode, GlobalCache};
pub use config::Config;
pub use directive::{ConvertMode, Once};
pub use errors::{ConfigErrorKind, InstantiateErrorKind, InstantiateResult};
pub use factory::{Args, Factory};
pub use instantiator::Instantiator;
pub use node::Node;
pub use registry::Registry;
pub use signature::{CacheKey, Signature};
pub use value::{Instance, Partial, Value};
