//! Error types for the `stronghold-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`].

use stronghold_types::{CityId, UserId};

/// Errors that can occur while creating or looking up world entities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// No user is registered under this username.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// No user has this identifier.
    #[error("user id not found: {0}")]
    UserIdNotFound(UserId),

    /// No city has this identifier.
    #[error("city not found: {0}")]
    CityNotFound(CityId),

    /// The username is already registered.
    #[error("username already exists: {0}")]
    AlreadyExists(String),

    /// A city was requested for an owner that does not exist. Nothing was
    /// created and no identifier was consumed.
    #[error("owner {0} does not exist")]
    OwnerNotFound(UserId),

    /// An identifier counter reached `u64::MAX`.
    #[error("{0} identifier space exhausted")]
    IdExhausted(&'static str),
}

impl WorldError {
    /// Whether this error means the requested entity does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_) | Self::UserIdNotFound(_) | Self::CityNotFound(_)
        )
    }
}
