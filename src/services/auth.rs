use std::fmt;

use crate::error::AppError;

/// Decides whether a caller-supplied credential grants access.
pub trait Authenticator: Send + Sync {
    fn verify(&self, credential: &str) -> bool;
}

/// One shared secret, compared for exact equality.
pub struct StaticSecret {
    secret: String,
}

impl StaticSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecret").finish_non_exhaustive()
    }
}

impl Authenticator for StaticSecret {
    fn verify(&self, credential: &str) -> bool {
        credential == self.secret
    }
}

/// Rejects the request unless `credential` is present and verifies.
pub fn require(auth: &dyn Authenticator, credential: Option<&str>) -> Result<(), AppError> {
    match credential {
        Some(credential) if auth.verify(credential) => Ok(()),
        _ => {
            tracing::warn!("Rejected request with invalid or missing password");
            Err(AppError::Unauthorized)
        }
    }
}
