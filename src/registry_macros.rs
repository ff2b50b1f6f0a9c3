/// Builds a [`crate::Registry`] from `provide(target, factory)` entries.
///
/// # Examples
/// ```rust
/// use instantiate_once::{registry, Args, InstantiateErrorKind, Value};
///
/// let registry = registry! {
///     provide("answer", |_: Args| Ok::<_, InstantiateErrorKind>(Value::Int(42))),
///     provide("echo", |args: Args| Ok::<_, InstantiateErrorKind>(args.nth(0).cloned().unwrap_or(Value::Null))),
/// };
///
/// assert!(registry.contains("answer"));
/// assert!(registry.contains("echo"));
/// ```
#[macro_export]
macro_rules! registry {
    (
        $( provide($target:expr, $factory:expr) ),* $(,)?
    ) => {{
        #[allow(unused_mut)]
        let mut registry = $crate::Registry::new();
        $(
            registry.add_factory($target, $factory);
        )*
        registry
    }};
}
