//! Tratamento de senhas de usuários
//!
//! Senhas são guardadas apenas como hash Argon2id no formato PHC.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{DbError, DbResult};

/// Gera o hash PHC de uma senha com sal aleatório
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::CredentialError(e.to_string()))
}

/// Confere uma senha contra o hash armazenado
pub fn verify_password(password: &str, stored_hash: &str) -> DbResult<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| DbError::CredentialError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
