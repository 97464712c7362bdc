//! Token codec
//!
//! Encodes claims into compact HS256 JWTs and decodes them back, refusing any
//! token whose header names an algorithm outside the HMAC family. The signing
//! secret is injected at construction; nothing here reads the environment.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::db::models::Role;

/// Algorithm used when signing
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Header `alg` values accepted when decoding
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token errors. The distinctions are for logs; clients only see "Unauthorized".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("Token subject does not match requested user")]
    SubjectMismatch,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            _ => TokenError::MalformedToken,
        }
    }
}

/// Token payload.
///
/// Fields are private: claims are immutable once minted, a new token needs a
/// new `Claims` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userID")]
    user_id: Uuid,
    role: Role,
    iat: i64,
    exp: i64,
    nbf: i64,
}

impl Claims {
    /// Mint claims valid from `issued_at` for `ttl`. Fails when the expiry
    /// falls outside the representable date range.
    pub fn new(
        user_id: Uuid,
        role: Role,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encoding("token lifetime out of range".to_string()))?;
        let iat = issued_at.timestamp();

        Ok(Self {
            user_id,
            role,
            iat,
            exp: expires_at.timestamp(),
            nbf: iat,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Issued at (Unix timestamp)
    pub fn issued_at(&self) -> i64 {
        self.iat
    }

    /// Expiration time (Unix timestamp)
    pub fn expires_at(&self) -> i64 {
        self.exp
    }

    /// Not before (Unix timestamp)
    pub fn not_before(&self) -> i64 {
        self.nbf
    }

    /// Total validity window in seconds
    pub fn lifetime_secs(&self) -> i64 {
        self.exp - self.iat
    }

    /// `exp > iat` and `nbf <= iat`
    pub fn is_well_formed(&self) -> bool {
        self.exp > self.iat && self.nbf <= self.iat
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Read the `alg` field of a token header without trusting anything else
fn peek_algorithm(token: &str) -> Result<String, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::MalformedToken);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::MalformedToken)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::MalformedToken)?;

    Ok(raw.alg)
}

/// HMAC token codec
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    /// Create a codec signing with `secret`
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.set_required_spec_claims(&["exp", "iat", "nbf"]);
        validation.validate_nbf = true;
        // Strict expiry; the lifecycle manager checks again with its own clock
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign claims into a compact token string
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify structure, algorithm and signature, then return the claims
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let alg: Algorithm = peek_algorithm(token)?
            .parse()
            .map_err(|_| TokenError::UnsupportedAlgorithm)?;
        if !ACCEPTED_ALGORITHMS.contains(&alg) {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;

        if !data.claims.is_well_formed() {
            return Err(TokenError::MalformedToken);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtCodec {
        JwtCodec::new(b"test_secret_key_for_testing_only_32bytes!")
    }

    fn claims() -> Claims {
        Claims::new(Uuid::new_v4(), Role::Manager, Utc::now(), Duration::minutes(15)).unwrap()
    }

    fn forge(header: &str, payload: &str, signature: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload),
            signature
        )
    }

    // ========================================================================
    // Claims Tests
    // ========================================================================

    #[test]
    fn test_claims_new_window() {
        let now = Utc::now();
        let claims =
            Claims::new(Uuid::new_v4(), Role::Admin, now, Duration::seconds(900)).unwrap();

        assert_eq!(claims.issued_at(), now.timestamp());
        assert_eq!(claims.not_before(), now.timestamp());
        assert_eq!(claims.expires_at(), now.timestamp() + 900);
        assert_eq!(claims.lifetime_secs(), 900);
        assert!(claims.is_well_formed());
    }

    #[test]
    fn test_claims_wire_field_names() {
        let claims = claims();
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["userID"], claims.user_id().to_string());
        assert_eq!(json["role"], "manager");
        assert!(json["iat"].is_i64());
        assert!(json["exp"].is_i64());
        assert!(json["nbf"].is_i64());
    }

    #[test]
    fn test_claims_zero_ttl_is_not_well_formed() {
        let claims =
            Claims::new(Uuid::new_v4(), Role::Admin, Utc::now(), Duration::zero()).unwrap();
        assert!(!claims.is_well_formed());
    }

    #[test]
    fn test_claims_new_rejects_unrepresentable_expiry() {
        let result = Claims::new(Uuid::new_v4(), Role::Admin, Utc::now(), Duration::MAX);
        assert!(matches!(result, Err(TokenError::Encoding(_))));
    }

    // ========================================================================
    // Codec Tests
    // ========================================================================

    #[test]
    fn test_encode_produces_three_part_token() {
        let token = codec().encode(&claims()).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(peek_algorithm(&token).unwrap(), "HS256");
    }

    #[test]
    fn test_encode_decode_returns_same_claims() {
        let codec = codec();
        let claims = claims();

        let token = codec.encode(&claims).unwrap();
        let decoded = codec.decode(&token).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_decode_wrong_secret_is_invalid_signature() {
        let token = JwtCodec::new(b"secret_one").encode(&claims()).unwrap();

        let result = JwtCodec::new(b"secret_two").decode(&token);
        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_decode_expired_token() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(1);
        let claims =
            Claims::new(Uuid::new_v4(), Role::Admin, issued, Duration::minutes(15)).unwrap();
        let token = codec.encode(&claims).unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_decode_rejects_none_algorithm() {
        let claims = claims();
        let payload = serde_json::to_string(&claims).unwrap();
        let token = forge(r#"{"alg":"none","typ":"JWT"}"#, &payload, "");

        assert_eq!(codec().decode(&token), Err(TokenError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_decode_rejects_asymmetric_algorithm() {
        let payload = serde_json::to_string(&claims()).unwrap();
        let token = forge(r#"{"alg":"RS256","typ":"JWT"}"#, &payload, "c2ln");

        assert_eq!(codec().decode(&token), Err(TokenError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_decode_malformed_tokens() {
        let codec = codec();

        assert_eq!(codec.decode(""), Err(TokenError::MalformedToken));
        assert_eq!(codec.decode("not-a-token"), Err(TokenError::MalformedToken));
        assert_eq!(codec.decode("a.b"), Err(TokenError::MalformedToken));
        assert_eq!(codec.decode("a.b.c.d"), Err(TokenError::MalformedToken));
        assert_eq!(
            codec.decode("!!!.payload.signature"),
            Err(TokenError::MalformedToken)
        );
    }

    #[test]
    fn test_decode_unknown_role_fails() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({
            "userID": Uuid::new_v4(),
            "role": "viewer",
            "iat": now,
            "exp": now + 900,
            "nbf": now,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(b"test_secret_key_for_testing_only_32bytes!"),
        )
        .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::MalformedToken));
    }

    #[test]
    fn test_decode_missing_nbf_fails() {
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({
            "userID": Uuid::new_v4(),
            "role": "admin",
            "iat": now,
            "exp": now + 900,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(b"test_secret_key_for_testing_only_32bytes!"),
        )
        .unwrap();

        assert!(codec().decode(&token).is_err());
    }

    #[test]
    fn test_decode_accepts_other_hmac_variants() {
        let secret = b"test_secret_key_for_testing_only_32bytes!";
        let claims = claims();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert_eq!(JwtCodec::new(secret).decode(&token).unwrap(), claims);
    }

    #[test]
    fn test_token_error_display() {
        assert_eq!(TokenError::Expired.to_string(), "Token expired");
        assert_eq!(
            TokenError::InvalidSignature.to_string(),
            "Invalid token signature"
        );
        assert!(
            TokenError::Encoding("boom".to_string())
                .to_string()
                .contains("boom")
        );
    }
}
