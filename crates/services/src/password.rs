//! Argon2id password hashes stored as PHC strings (`$argon2id$v=19$...`).

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::SaltString,
};

pub use argon2::password_hash::Error as HashError;

const SALT_LEN: usize = 16;

/// Hash `password` with a fresh random salt and the default Argon2id params.
///
/// # Errors
///
/// Returns `HashError` if the hasher rejects its inputs.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt_bytes: [u8; SALT_LEN] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check `password` against a stored hash. Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
