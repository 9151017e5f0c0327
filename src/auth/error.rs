use thiserror::Error;

/// Domain failures surfaced by the credential store and reset-token flow.
/// Display strings double as the client-facing messages.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("An account with that email already exists.")]
    DuplicateEmail,
    #[error("Sorry, that username is already taken.")]
    DuplicateUsername,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("no account with that email")]
    UserNotFound,
    #[error("Password reset link is invalid or has expired. Please try again!")]
    InvalidOrExpiredToken,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}
