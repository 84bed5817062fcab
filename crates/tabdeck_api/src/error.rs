use tabdeck_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("no tab id given and no tab is currently active")]
    NoActiveTab,
    #[error("only one highlighted tab is supported at a time")]
    MultipleHighlight,
    #[error("highlight needs a tab id")]
    EmptyHighlight,
    #[error("the \"{0}\" permission is required")]
    PermissionDenied(&'static str),
    #[error("invalid match pattern '{0}'")]
    InvalidPattern(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
