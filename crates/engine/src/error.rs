//! The module contains the errors the engine can return.
//!
//! Every operation returns a typed [`EngineError`]; nothing is thrown across the
//! store boundary as an opaque transport error. Backend failures are folded
//! into [`StoreUnavailable`] and handed back unchanged.
//!
//! - [`Validation`] caller-correctable input (amount, payer, split, email).
//! - [`PermissionDenied`] the actor is not a participant of the trip.
//! - [`TripArchived`] mutation attempted on a read-only trip.
//! - [`Corrupt`] a stored row no longer decodes; retrying will not help.
//!
//!  [`StoreUnavailable`]: EngineError::StoreUnavailable
//!  [`Validation`]: EngineError::Validation
//!  [`PermissionDenied`]: EngineError::PermissionDenied
//!  [`TripArchived`]: EngineError::TripArchived
//!  [`Corrupt`]: EngineError::Corrupt
use sea_orm::DbErr;
use thiserror::Error;

/// The first rule an expense, invite or trip write violated.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("amount {0} exceeds the per-expense limit")]
    AmountTooLarge(String),
    #[error("payer {0} is not a participant")]
    PayerNotParticipant(String),
    #[error("split must include at least one participant")]
    EmptySplit,
    #[error("split member {0} is not a participant")]
    SplitNotParticipant(String),
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("invalid date range: {0}")]
    InvalidDates(String),
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// Coarse classification used by the presentation layer to pick how an error
/// is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    Duplicate,
    Policy,
    Archived,
    Transient,
    Corrupt,
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("\"{0}\" already present!")]
    AlreadyExists(String),
    #[error("\"{0}\" is already a member!")]
    AlreadyMember(String),
    #[error("\"{0}\" is already invited!")]
    AlreadyInvited(String),
    #[error("The trip creator cannot be removed")]
    CannotRemoveCreator,
    #[error("The trip is archived and read-only")]
    TripArchived,
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::PermissionDenied(_) => ErrorKind::Permission,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) | Self::AlreadyMember(_) | Self::AlreadyInvited(_) => {
                ErrorKind::Duplicate
            }
            Self::CannotRemoveCreator => ErrorKind::Policy,
            Self::TripArchived => ErrorKind::Archived,
            Self::StoreUnavailable(_) => ErrorKind::Transient,
            Self::Corrupt(_) => ErrorKind::Corrupt,
        }
    }

    /// Returns `true` for failures worth showing as "try again later".
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::AlreadyExists(a), Self::AlreadyExists(b)) => a == b,
            (Self::AlreadyMember(a), Self::AlreadyMember(b)) => a == b,
            (Self::AlreadyInvited(a), Self::AlreadyInvited(b)) => a == b,
            (Self::CannotRemoveCreator, Self::CannotRemoveCreator) => true,
            (Self::TripArchived, Self::TripArchived) => true,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => a == b,
            (Self::Corrupt(a), Self::Corrupt(b)) => a == b,
            _ => false,
        }
    }
}
