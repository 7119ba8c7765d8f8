//! Credentials and sessions: argon2 password hashes and HS256 session tokens.

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys, bearer_token};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
