use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::{AuthError, AuthResult};

const SALT_LEN: usize = 16;

/// One-way salted password hashing, Argon2id with a deliberately expensive
/// work factor. Stateless; safe to share behind an `Arc`.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> AuthResult<Self> {
        let mut builder = ParamsBuilder::new();
        builder.m_cost(19 * 1024); // 19 MiB
        builder.t_cost(2);
        builder.p_cost(1);
        let params = builder.build().map_err(AuthError::from)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        Ok(Self { argon2 })
    }

    /// Hash a plaintext password into a PHC string with an embedded
    /// per-call random salt.
    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(AuthError::from)?;
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(AuthError::from)?
            .to_string();
        Ok(hash)
    }

    /// Verify a plaintext password against a stored credential.
    ///
    /// Never fails: a mismatch, a malformed stored credential, or empty
    /// input all resolve to `false`. Malformed stored hashes indicate data
    /// corruption and are logged.
    pub fn verify_password(&self, password: &str, encoded: &str) -> bool {
        if password.is_empty() || encoded.is_empty() {
            return false;
        }
        let parsed = match PasswordHash::new(encoded) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("stored credential is malformed: {}", err);
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies_passwords() {
        let service = PasswordService::new().expect("password service");
        let hash = service
            .hash_password("super-secret")
            .expect("hash generation");
        assert!(service.verify_password("super-secret", &hash));
        assert!(!service.verify_password("wrong-password", &hash));
    }

    #[test]
    fn distinct_hashes_for_the_same_password() {
        let service = PasswordService::new().expect("password service");
        let first = service.hash_password("admin123").expect("hash");
        let second = service.hash_password("admin123").expect("hash");
        assert_ne!(first, second);
        assert!(service.verify_password("admin123", &first));
        assert!(service.verify_password("admin123", &second));
    }

    #[test]
    fn malformed_or_empty_input_never_verifies() {
        let service = PasswordService::new().expect("password service");
        let hash = service.hash_password("secret").expect("hash");

        assert!(!service.verify_password("secret", "not-a-phc-string"));
        assert!(!service.verify_password("", &hash));
        assert!(!service.verify_password("secret", ""));
    }
}
