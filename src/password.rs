use crate::error::AppError;

/// hash_password
///
/// bcrypt-hashes a password on the blocking pool; hashing at a production work
/// factor takes long enough to stall the async executor otherwise.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// verify_password
///
/// Checks a password against a stored hash. A malformed stored hash counts as a
/// mismatch so a corrupt row reads as invalid credentials rather than a 500.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let verified = tokio::task::spawn_blocking(move || match bcrypt::verify(password, &hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("stored password hash is unreadable: {}", e);
            false
        }
    })
    .await?;
    Ok(verified)
}
