mod config;
mod instantiate;

pub use config::ConfigErrorKind;
pub use instantiate::InstantiateErrorKind;

pub type InstantiateResult<T> = Result<T, InstantiateErrorKind>;
