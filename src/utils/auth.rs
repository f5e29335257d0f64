//! Session token codec
//!
//! Session tokens are HMAC-signed JWTs carrying the internal user id. They are
//! stateless: nothing is stored server side and there is no revocation list.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AppError, Result};

/// Issuer stamped into (and required from) every session token
pub const SESSION_ISSUER: &str = "moodshift-app";

/// Default session lifetime
pub const SESSION_TTL_HOURS: i64 = 24;

/// Algorithm used when issuing
const ISSUE_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms accepted when verifying: the HMAC family only
const ACCEPTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens with one fixed symmetric key
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Build a codec from the signing secret. An empty secret is a
    /// configuration error.
    pub fn new(secret: &[u8]) -> anyhow::Result<Self> {
        if secret.is_empty() {
            anyhow::bail!("session signing key is empty");
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(SESSION_TTL_HOURS),
        })
    }

    /// Override the session lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id`, valid from now until now + ttl
    pub fn issue(&self, user_id: &str) -> Result<String> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds)
    pub fn issue_at(&self, user_id: &str, now: i64) -> Result<String> {
        let claims = SessionClaims {
            user_id: user_id.to_string(),
            iss: SESSION_ISSUER.to_string(),
            iat: now,
            nbf: now,
            exp: now + self.ttl.num_seconds(),
        };

        encode(&Header::new(ISSUE_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {}", e)))
    }

    /// Verify a token against the wall clock and return the embedded user id
    pub fn verify(&self, token: &str) -> Result<String> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the current time were `now` (unix seconds).
    ///
    /// The token is valid on `[nbf, exp)`. No leeway is applied.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<String> {
        let mut validation = Validation::new(ISSUE_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);
        // time bounds are checked below against the caller's clock
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            debug!("session token rejected: {}", e);
            AppError::InvalidCredential
        })?;

        let claims = data.claims;
        if now < claims.nbf || now >= claims.exp {
            debug!(
                user_id = %claims.user_id,
                nbf = claims.nbf,
                exp = claims.exp,
                now,
                "session token outside its validity window"
            );
            return Err(AppError::InvalidCredential);
        }

        Ok(claims.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    const SECRET: &[u8] = b"test-signing-key";
    const NOW: i64 = 1_760_000_000;

    fn codec() -> SessionCodec {
        SessionCodec::new(SECRET).unwrap()
    }

    /// Build a token with an arbitrary header, signed with HMAC-SHA256
    fn forge(header_json: &str, claims: &SessionClaims, secret: &[u8]) -> String {
        let header = URL_SAFE_NO_PAD.encode(header_json);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        let signing_input = format!("{}.{}", header, payload);
        let signature = jsonwebtoken::crypto::sign(
            signing_input.as_bytes(),
            &EncodingKey::from_secret(secret),
            Algorithm::HS256,
        )
        .unwrap();
        format!("{}.{}", signing_input, signature)
    }

    fn claims_for(user_id: &str) -> SessionClaims {
        SessionClaims {
            user_id: user_id.to_string(),
            iss: SESSION_ISSUER.to_string(),
            iat: NOW,
            nbf: NOW,
            exp: NOW + 3600,
        }
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(SessionCodec::new(b"").is_err());
    }

    #[test]
    fn test_round_trip_before_expiry() {
        let codec = codec();
        for user_id in ["user-1", "a3f1c2d4-0000-4000-8000-000000000000", ""] {
            let token = codec.issue_at(user_id, NOW).unwrap();
            assert_eq!(codec.verify_at(&token, NOW).unwrap(), user_id);

            let last_valid_second = NOW + codec.ttl().num_seconds() - 1;
            assert_eq!(codec.verify_at(&token, last_valid_second).unwrap(), user_id);
        }
    }

    #[test]
    fn test_rejected_at_and_after_expiry() {
        let codec = codec().with_ttl(Duration::minutes(5));
        let token = codec.issue_at("user-1", NOW).unwrap();
        let exp = NOW + 300;

        assert!(matches!(
            codec.verify_at(&token, exp),
            Err(AppError::InvalidCredential)
        ));
        assert!(matches!(
            codec.verify_at(&token, exp + 86_400),
            Err(AppError::InvalidCredential)
        ));
    }

    #[test]
    fn test_rejected_before_not_before() {
        let codec = codec();
        let token = codec.issue_at("user-1", NOW).unwrap();
        assert!(matches!(
            codec.verify_at(&token, NOW - 1),
            Err(AppError::InvalidCredential)
        ));
    }

    #[test]
    fn test_default_ttl_is_24_hours() {
        let codec = codec();
        let token = codec.issue_at("user-1", NOW).unwrap();
        assert!(codec.verify_at(&token, NOW + 24 * 3600 - 1).is_ok());
        assert!(codec.verify_at(&token, NOW + 24 * 3600).is_err());
    }

    #[test]
    fn test_wall_clock_issue_verify() {
        let codec = codec();
        let token = codec.issue("user-42").unwrap();
        assert_eq!(codec.verify(&token).unwrap(), "user-42");
    }

    #[test]
    fn test_different_key_rejected() {
        let token = codec().issue_at("user-1", NOW).unwrap();
        let other = SessionCodec::new(b"another-key").unwrap();
        assert!(matches!(
            other.verify_at(&token, NOW),
            Err(AppError::InvalidCredential)
        ));
    }

    #[test]
    fn test_single_byte_payload_change_rejected() {
        let codec = codec();
        let token = codec.issue_at("user-1", NOW).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let payload = parts[1];
        for i in 0..payload.len() {
            let mut bytes = payload.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let altered = format!(
                "{}.{}.{}",
                parts[0],
                String::from_utf8(bytes).unwrap(),
                parts[2]
            );
            assert!(
                codec.verify_at(&altered, NOW).is_err(),
                "altered byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let codec = codec();
        for token in ["", "not-a-token", "a.b", "a.b.c", "....", "Bearer x.y.z"] {
            assert!(matches!(
                codec.verify_at(token, NOW),
                Err(AppError::InvalidCredential)
            ));
        }
    }

    #[test]
    fn test_forged_hs256_header_accepted_only_with_right_key() {
        let codec = codec();
        let claims = claims_for("user-1");

        let good = forge(r#"{"alg":"HS256","typ":"JWT"}"#, &claims, SECRET);
        assert_eq!(codec.verify_at(&good, NOW).unwrap(), "user-1");

        let bad = forge(r#"{"alg":"HS256","typ":"JWT"}"#, &claims, b"wrong");
        assert!(codec.verify_at(&bad, NOW).is_err());
    }

    #[test]
    fn test_asymmetric_algorithm_rejected_even_with_valid_hmac() {
        let codec = codec();
        let claims = claims_for("user-1");

        // signature is a correct HMAC over the input, only the declared alg differs
        for alg in ["RS256", "ES256", "PS256", "EdDSA"] {
            let header = format!(r#"{{"alg":"{}","typ":"JWT"}}"#, alg);
            let token = forge(&header, &claims, SECRET);
            assert!(
                matches!(codec.verify_at(&token, NOW), Err(AppError::InvalidCredential)),
                "{} was accepted",
                alg
            );
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let codec = codec();
        let claims = claims_for("user-1");
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        for token in [
            format!("{}.{}.", header, payload),
            format!("{}.{}", header, payload),
        ] {
            assert!(codec.verify_at(&token, NOW).is_err());
        }
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let codec = codec();
        let mut claims = claims_for("user-1");
        claims.iss = "someone-else".to_string();
        let token = forge(r#"{"alg":"HS256","typ":"JWT"}"#, &claims, SECRET);
        assert!(codec.verify_at(&token, NOW).is_err());
    }
}
