use thiserror::Error;

use crate::model::TabId;

/// Failures surfaced synchronously to the caller of a registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `update`/`remove` referenced an id the registry does not hold.
    #[error("no tab with id {0}")]
    NotFound(TabId),
    /// An update carried no tab id to target.
    #[error("tab update is missing an id")]
    MissingId,
    /// The identity source has no fresh tab ids left.
    #[error("tab ids are exhausted")]
    IdsExhausted,
    /// A freshly allocated id already names a tab in the registry.
    #[error("allocated tab id {0} is already in use")]
    IdInUse(TabId),
    /// The registry was disposed; it accepts no further mutations.
    #[error("tab registry has been disposed")]
    Disposed,
}

pub type RegistryResult<T> = Result<T, RegistryError>;
