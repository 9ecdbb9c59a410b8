use argon2::password_hash::{Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::OsRng;

// Argon2 parameters for 50-150ms target latency
const ARGON2_M_COST: u32 = 19456; // 19 MB
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;

const LEGACY_BCRYPT_PREFIX: &str = "$2";

fn hasher() -> Result<Argon2<'static>, HashError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)
        .map_err(HashError::from)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes with a fresh random salt and returns the PHC string.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Returns `Ok(false)` on mismatch; `Err` only when `hash` is unreadable.
///
/// Rows created before the switch to Argon2 hold bcrypt (`$2a$`/`$2b$`/`$2y$`)
/// hashes; those are still verified so existing accounts can log in.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, HashError> {
    if hash.starts_with(LEGACY_BCRYPT_PREFIX) {
        return bcrypt::verify(password, hash).map_err(|_| HashError::PhcStringField);
    }

    let parsed_hash = PasswordHash::new(hash)?;
    match hasher()?.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
