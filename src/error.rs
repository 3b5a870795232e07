use thiserror::Error;

use crate::models::ModerationStatus;

/// Message shown for any transport-level failure. Malformed responses are
/// reported the same way.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error, please try again later";

/// Client-side form validation failures. These never reach the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be a positive whole number of minutes")]
    InvalidDuration { field: &'static str },

    #[error("{field} must be between 1 and 5")]
    InvalidRating { field: &'static str },

    #[error("{0} accepts a single value")]
    SingleValueOnly(&'static str),

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Business or authorization failure reported by the catalog service,
    /// carried verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Transport(#[from] reqwest::Error),

    #[error("{}", NETWORK_ERROR_MESSAGE)]
    MalformedResponse(String),

    #[error("Permission denied: your role cannot {0}")]
    Forbidden(&'static str),

    #[error("You must be logged in")]
    NotLoggedIn,

    #[error("Cannot move a video from {from} to {to}")]
    InvalidTransition {
        from: ModerationStatus,
        to: ModerationStatus,
    },

    #[error("Video {0} already has a status change in progress")]
    Busy(i64),

    /// The status change reached the service but the listing reload after it
    /// did not.
    #[error("Video {id} is now {applied}, but the list could not be refreshed: {source}")]
    ReloadFailed {
        id: i64,
        applied: ModerationStatus,
        source: Box<Error>,
    },

    #[error("Self-registration is disabled")]
    RegistrationDisabled,

    #[error("Video {0} not found")]
    VideoNotFound(i64),

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
