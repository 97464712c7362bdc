//! Password hashing with bcrypt

/// Cost factor for bcrypt hashing (12 is recommended for production)
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Password hasher errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Credential mismatch")]
    CredentialMismatch,
}

/// Salted one-way password hasher.
///
/// Keeps a hash of a throwaway value at the configured cost so lookups of
/// unknown accounts can burn the same amount of time as a real verification.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Create a hasher; fails if bcrypt rejects the cost
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = bcrypt::hash("dummy-password-for-timing", cost)
            .map_err(|e| PasswordError::HashingError(e.to_string()))?;

        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::HashingError(e.to_string()))
    }

    /// Verify a password against a stored hash
    pub fn verify(&self, hash: &str, plaintext: &str) -> Result<(), PasswordError> {
        let is_valid = bcrypt::verify(plaintext, hash)
            .map_err(|e| PasswordError::HashingError(e.to_string()))?;

        if is_valid {
            Ok(())
        } else {
            Err(PasswordError::CredentialMismatch)
        }
    }

    /// Spend one verification's worth of work when there is no stored hash
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = bcrypt::verify(plaintext, &self.dummy_hash);
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
