use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::error::{ApiError, ApiResult};

/// Hashes a plaintext password into a PHC string (Argon2id, random 16-byte salt).
///
/// Argon2 is CPU-bound, so the work runs on the blocking pool.
pub async fn hash_password(password: &str) -> ApiResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(ApiError::unexpected)?
}

/// `false` for a wrong password and for an unparseable stored hash alike.
pub async fn verify_password(hash: &str, password: &str) -> ApiResult<bool> {
    let (hash, password) = (hash.to_owned(), password.to_owned());
    tokio::task::spawn_blocking(move || verify_blocking(&hash, &password))
        .await
        .map_err(ApiError::unexpected)
}

fn hash_blocking(password: &str) -> ApiResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(ApiError::unexpected)?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(ApiError::unexpected)?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(ApiError::unexpected)
}

fn verify_blocking(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be parsed");
            false
        }
    }
}
