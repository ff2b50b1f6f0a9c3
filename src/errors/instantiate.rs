use super::config::ConfigErrorKind;

/// The single error kind reported by instantiation.
///
/// Factories report their own failures through [`InstantiateErrorKind::Custom`] (or any other variant),
/// and those errors are returned to the caller of [`crate::Instantiator::instantiate`] unchanged.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Invalid `{key}` directive: expected {expected}, found {found}")]
    InvalidDirective {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Invalid `_convert_` directive: unknown mode `{0}`, expected one of `none`, `partial`, `object`, `all`")]
    UnknownConvertMode(String),
    #[error("`_once_` is set, but `_target_` is missing. Only nodes with `_target_` can be constructed once")]
    MissingTarget,
    #[error("Invalid `_once_` directive: {found} can't be used as a manual cache key")]
    UnhashableManualKey { found: &'static str },
    #[error("Factory not found in registry for target `{target}`")]
    NoFactory { target: String },
    #[error(transparent)]
    Config(#[from] ConfigErrorKind),
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
