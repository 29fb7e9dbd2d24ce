//! Authentication error taxonomy.
//!
//! A closed set of failure kinds. Display strings are the human-readable
//! messages shown to the user; `code()` is the stable wire identifier used
//! by the backend and persisted in logs.

/// Authentication failure returned by action operations. Never panics across
/// the session-manager boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Email already in use")]
    EmailInUse,
    #[error("Password should be at least 6 characters")]
    WeakPassword,
    #[error("Network error occurred. Please check your connection")]
    Network(String),
    #[error("Too many attempts. Please try again later")]
    TooManyRequests,
    #[error("This account has been disabled")]
    AccountDisabled,
    /// The identity authenticated but has no profile record. The session is
    /// rejected rather than left half-established.
    #[error("User data not found")]
    UserDataNotFound,
    #[error("An error occurred during authentication")]
    Unknown(String),
}

impl AuthError {
    /// Stable error code, matching the identity backend's wire codes.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid-credential",
            AuthError::InvalidEmail => "invalid-email",
            AuthError::EmailInUse => "email-already-in-use",
            AuthError::WeakPassword => "weak-password",
            AuthError::Network(_) => "network-error",
            AuthError::TooManyRequests => "too-many-requests",
            AuthError::AccountDisabled => "user-disabled",
            AuthError::UserDataNotFound => "user-data-not-found",
            AuthError::Unknown(_) => "unknown",
        }
    }

    /// Map a backend error code onto the taxonomy. Unrecognized codes fall
    /// back to `Unknown` carrying the raw code for diagnostics.
    pub fn from_code(code: &str, detail: &str) -> Self {
        match code {
            "invalid-credential" => AuthError::InvalidCredentials,
            "invalid-email" => AuthError::InvalidEmail,
            "email-already-in-use" => AuthError::EmailInUse,
            "weak-password" => AuthError::WeakPassword,
            "network-error" => AuthError::Network(detail.to_string()),
            "too-many-requests" => AuthError::TooManyRequests,
            "user-disabled" => AuthError::AccountDisabled,
            "user-data-not-found" => AuthError::UserDataNotFound,
            other => AuthError::Unknown(format!("{other}: {detail}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        let errors = [
            AuthError::InvalidCredentials,
            AuthError::InvalidEmail,
            AuthError::EmailInUse,
            AuthError::WeakPassword,
            AuthError::TooManyRequests,
            AuthError::AccountDisabled,
            AuthError::UserDataNotFound,
        ];
        for err in errors {
            assert_eq!(AuthError::from_code(err.code(), ""), err);
        }
    }

    #[test]
    fn test_unrecognized_code_maps_to_unknown() {
        let err = AuthError::from_code("quota-exceeded", "server said no");
        assert_eq!(err.code(), "unknown");
        match err {
            AuthError::Unknown(detail) => assert!(detail.contains("quota-exceeded")),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(
            AuthError::WeakPassword.to_string(),
            "Password should be at least 6 characters"
        );
        assert_eq!(
            AuthError::TooManyRequests.to_string(),
            "Too many attempts. Please try again later"
        );
    }
}
