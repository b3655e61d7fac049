//! Session token issuing and verification.
//!
//! Tokens are compact JWTs signed with a server-held secret (HS256). The two
//! failure modes are deliberately distinct: an expired token is a normal,
//! recoverable state (the client silently re-authenticates), while a
//! malformed or tamper-signature token is a hard failure.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use harvesthub_core::{Email, Role, UserId};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Account ID, stringified.
    pub sub: String,
    /// Account email at issuance.
    pub email: String,
    /// Account role at issuance.
    pub role: Role,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into a [`UserId`].
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }
}

/// Token verification / issuance failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token's expiry has elapsed. Recoverable: re-authenticate.
    #[error("Token expired")]
    Expired,
    /// The token is malformed or its signature does not verify.
    #[error("Invalid token")]
    Invalid,
    /// Signing failed while issuing a token.
    #[error("token signing failed")]
    Signing,
}

/// Issues and verifies session tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    /// Create an issuer from the signing secret and lifetime in days.
    #[must_use]
    pub fn new(secret: &SecretString, lifetime_days: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            lifetime: Duration::days(lifetime_days),
        }
    }

    /// Issue a token for an account.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, id: UserId, email: &Email, role: Role) -> Result<String, TokenError> {
        self.issue_at(id, email, role, Utc::now())
    }

    /// Issue a token as of a given instant (tests pin the clock with this).
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(
        &self,
        id: UserId,
        email: &Email,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: id.to_string(),
            email: email.as_str().to_owned(),
            role,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Signing)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// `TokenError::Expired` when the expiry has elapsed (no leeway),
    /// `TokenError::Invalid` for anything else wrong with the token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Configured token lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&SecretString::from("kX9#mP2$vL8@qR5!wT3^zB7&nC4*hJ6%"), 30)
    }

    fn email() -> Email {
        Email::parse("asha@example.com").unwrap()
    }

    #[test]
    fn test_round_trip_recovers_claims() {
        let issuer = issuer();
        let token = issuer.issue(UserId::new(42), &email(), Role::Vendor).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.user_id(), Some(UserId::new(42)));
        assert_eq!(claims.email, "asha@example.com");
        assert_eq!(claims.role, Role::Vendor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_shape() {
        let token = issuer().issue(UserId::new(1), &email(), Role::User).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let issuer = issuer();
        let past = Utc::now() - Duration::days(31);
        let token = issuer
            .issue_at(UserId::new(1), &email(), Role::User, past)
            .unwrap();

        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expiry_boundary() {
        let issuer = issuer();

        // Just inside the lifetime: accepted.
        let fresh = issuer
            .issue_at(
                UserId::new(1),
                &email(),
                Role::User,
                Utc::now() - Duration::days(30) + Duration::seconds(5),
            )
            .unwrap();
        assert!(issuer.verify(&fresh).is_ok());

        // Past expiry: rejected, no leeway.
        let stale = issuer
            .issue_at(
                UserId::new(1),
                &email(),
                Role::User,
                Utc::now() - Duration::days(30) - Duration::seconds(2),
            )
            .unwrap();
        assert_eq!(issuer.verify(&stale), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_token_is_invalid_not_expired() {
        let issuer = issuer();
        let token = issuer.issue(UserId::new(1), &email(), Role::User).unwrap();

        let mut tampered = token.clone();
        // Flip the final signature character.
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(issuer.verify(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issuer().issue(UserId::new(1), &email(), Role::User).unwrap();
        let other = TokenIssuer::new(&SecretString::from("zW4!uY7@pK1#sD9$fG2^hN5&jM8*bV3%"), 30);

        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        assert_eq!(issuer().verify("not.a.token"), Err(TokenError::Invalid));
        assert_eq!(issuer().verify(""), Err(TokenError::Invalid));
    }
}
