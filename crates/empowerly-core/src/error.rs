use thiserror::Error;

/// Failures `AuthContext::login` reports to its caller.
///
/// Missing or stale sessions are ordinary state, not errors; only a rejected
/// sign-in payload or a failed write surfaces here.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid sign-in response: {0}")]
    InvalidCredentials(String),

    #[error("failed to persist session: {0:#}")]
    Storage(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let invalid = AuthError::InvalidCredentials(String::from("response carries no token"));
        assert_eq!(
            invalid.to_string(),
            "invalid sign-in response: response carries no token"
        );

        let storage = AuthError::Storage(anyhow::anyhow!("disk full").context("write token"));
        assert_eq!(
            storage.to_string(),
            "failed to persist session: write token: disk full"
        );
    }
}
