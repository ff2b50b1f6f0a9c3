#[derive(thiserror::Error, Debug)]
pub enum ConfigErrorKind {
    #[error("Reference `${{{path}}}` doesn't point to any node")]
    UnresolvedReference { path: String },
    #[error("Cyclic reference detected: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },
    #[error("Reference `${{{path}}}` points to a {found}, which can't be interpolated into a string")]
    NonScalarInterpolation { path: String, found: &'static str },
    #[error("Unterminated interpolation in `{value}`")]
    UnterminatedInterpolation { value: String },
    #[error("Path `{path}` doesn't point into a map")]
    InvalidPath { path: String },
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
