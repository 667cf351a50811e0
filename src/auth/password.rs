/// Password hashing and verification.
///
/// scrypt with fixed cost parameters (N=32768, r=8, p=1, 32-byte output) and
/// a fresh 32-byte random salt per hash. The stored form is
/// `hex(derived_key) "." hex(salt)`.

use rand::rngs::OsRng;
use rand::RngCore;
use scrypt::Params;
use subtle::ConstantTimeEq;

use crate::error::AppError;

const SCRYPT_LOG_N: u8 = 15; // N = 32768
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const DERIVED_KEY_LEN: usize = 32;
const SALT_LEN: usize = 32;
const DELIMITER: char = '.';

fn scrypt_params() -> Result<Params, AppError> {
    Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, DERIVED_KEY_LEN)
        .map_err(|err| AppError::internal(format!("invalid scrypt parameters: {}", err)))
}

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; DERIVED_KEY_LEN], AppError> {
    let mut derived = [0u8; DERIVED_KEY_LEN];
    scrypt::scrypt(password.as_bytes(), salt, &scrypt_params()?, &mut derived)
        .map_err(|err| AppError::internal(format!("scrypt derivation failed: {}", err)))?;
    Ok(derived)
}

/// Hashes a password with a fresh random salt. Two calls with the same
/// password yield different encoded outputs.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let derived = derive_key(password, &salt)?;

    Ok(format!(
        "{}{}{}",
        hex::encode(derived),
        DELIMITER,
        hex::encode(salt)
    ))
}

/// Checks a supplied password against a stored hash. A mismatch is
/// `Ok(false)`; a malformed stored hash or a derivation failure is an
/// internal error.
pub fn verify_password(stored: &str, supplied: &str) -> Result<bool, AppError> {
    let (stored_key_hex, salt_hex) = stored
        .split_once(DELIMITER)
        .ok_or_else(|| AppError::internal("malformed password hash"))?;

    let stored_key = hex::decode(stored_key_hex)
        .map_err(|err| AppError::internal(format!("could not decode password hash: {}", err)))?;
    let salt = hex::decode(salt_hex)
        .map_err(|err| AppError::internal(format!("could not decode password salt: {}", err)))?;

    let derived = derive_key(supplied, &salt)?;

    Ok(derived.ct_eq(stored_key.as_slice()).into())
}
