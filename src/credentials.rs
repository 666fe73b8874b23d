//! Password hashing and verification (bcrypt).
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool.

use tracing::error;

/// Fixed input for the hash used when the username does not exist.
const DUMMY_PASSWORD: &str = "filekeep-dummy-password";

#[derive(Debug)]
pub enum CredentialError {
    Hash(bcrypt::BcryptError),
    /// The blocking task panicked or was cancelled
    Task,
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::Hash(e) => write!(f, "Password hashing failed: {}", e),
            CredentialError::Task => write!(f, "Password hashing task failed"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Hash a password with the given bcrypt cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, CredentialError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|_| CredentialError::Task)?
        .map_err(CredentialError::Hash)
}

/// Verifies presented passwords against stored hashes.
///
/// Holds a hash of the same cost as real credentials so that a lookup
/// for an unknown user costs as much as a wrong password.
#[derive(Clone)]
pub struct CredentialVerifier {
    dummy_hash: String,
}

impl CredentialVerifier {
    pub async fn new(cost: u32) -> Result<Self, CredentialError> {
        Ok(Self {
            dummy_hash: hash_password(DUMMY_PASSWORD, cost).await?,
        })
    }

    /// Check `password` against `hash`. `None` burns the same time and returns false.
    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: Option<&str>) -> bool {
        let known = hash.is_some();
        let hash = hash.unwrap_or(&self.dummy_hash).to_string();
        let password = password.to_string();

        let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await;

        match result {
            Ok(Ok(valid)) => known && valid,
            Ok(Err(e)) => {
                error!(error = %e, "Stored password hash is unreadable");
                false
            }
            Err(e) => {
                error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}
