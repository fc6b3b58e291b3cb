use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const RESET_TOKEN_BYTES: usize = 32;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 30;

/// Raw token handed to the user plus the digest that gets stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedResetToken {
    pub token: String,
    pub digest: String,
}

pub fn issue_reset_token() -> IssuedResetToken {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let digest = digest_reset_token(&token);
    IssuedResetToken { token, digest }
}

/// SHA-256 of the token text, hex encoded.
pub fn digest_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
