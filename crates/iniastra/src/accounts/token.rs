use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bson::oid::ObjectId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::{Role, User};
use crate::clock::Clock;
use crate::config::AuthConfig;

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<ObjectId> {
        ObjectId::parse_str(&self.sub).ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed or its signature does not match")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token has expired")]
    Expired,
}

/// Signs and verifies HS256 session tokens. Expiry is judged against the shared
/// clock rather than the wall clock.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            clock,
        }
    }

    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.token_ttl, clock)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let iat = self.clock.now().timestamp();
        let claims = Claims {
            sub: user.id.to_hex(),
            role: user.role,
            iat,
            exp: iat.saturating_add(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn user(role: Role) -> User {
        let now = bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        User {
            id: ObjectId::new(),
            name: "Ada Admin".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            role,
            department: None,
            is_active: true,
            last_login: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_tokens_round_trip_until_expiry() {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let authority = TokenAuthority::new(b"secret", Duration::from_secs(3_600), clock.clone());
        let user = user(Role::Admin);

        let token = authority.issue(&user).expect("token issued");
        let claims = authority.verify(&token).expect("fresh token verifies");
        assert_eq!(claims.user_id(), Some(user.id));
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3_600);

        clock.advance(chrono::Duration::seconds(3_600));
        assert!(matches!(authority.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Utc::now()));
        let issuer = TokenAuthority::new(b"one", Duration::from_secs(60), clock.clone());
        let verifier = TokenAuthority::new(b"two", Duration::from_secs(60), clock);
        let token = issuer.issue(&user(Role::Reviewer)).expect("token issued");
        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid(_))));
        assert!(verifier.verify("not-a-jwt").is_err());
    }
}
