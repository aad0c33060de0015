use crate::provider::keys::{JsonWebKeySet, KEY_ID};

use super::{FlowError, TokenKind};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::{event, Level};
use url::Url;

/// Claim shape of an access token as the relying party sees it.
#[derive(Debug, serde::Deserialize)]
pub struct AccessTokenPayload {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Refresh tokens issued by this server are opaque strings, so validating
/// one as a JWT is expected to come back `false`; the shape exists because
/// the contract covers all three credential kinds.
#[derive(Debug, serde::Deserialize)]
pub struct RefreshTokenPayload {
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct IdTokenPayload {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub nonce: Option<String>,
    pub auth_time: Option<i64>,
}

/// Verifies tokens against the authorization server's published key set,
/// without ever holding key material of its own.
pub struct JwtValidator {
    http: reqwest::Client,
    jwks_endpoint: Url,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtValidator {{ ... }}")
    }
}

impl JwtValidator {
    pub fn new(jwks_endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwks_endpoint,
        }
    }

    async fn fetch_key(&self) -> Result<DecodingKey, FlowError> {
        let response = self
            .http
            .get(self.jwks_endpoint.clone())
            .send()
            .await
            .map_err(FlowError::Transport)?;

        // An unreachable key set means the authorization server itself is
        // down, which is a hard failure rather than an invalid token.
        if !response.status().is_success() {
            return Err(FlowError::KeyDiscovery(response.status()));
        }

        let key_set = response
            .json::<JsonWebKeySet>()
            .await
            .map_err(FlowError::Decode)?;

        let key = key_set
            .keys
            .iter()
            .find(|k| k.kid == KEY_ID)
            .ok_or(FlowError::MissingKey)?;

        DecodingKey::from_rsa_components(&key.n, &key.e).map_err(FlowError::BadKey)
    }

    /// Signature-and-claims check for a token of the given kind. Any
    /// cryptographic or structural failure is a `false`, never an error.
    #[tracing::instrument(skip(self, token))]
    pub async fn validate(&self, token: &str, kind: TokenKind) -> Result<bool, FlowError> {
        let key = self.fetch_key().await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.leeway = 0;

        let verified = match kind {
            TokenKind::Access => {
                jsonwebtoken::decode::<AccessTokenPayload>(token, &key, &validation).is_ok()
            }
            TokenKind::Refresh => {
                jsonwebtoken::decode::<RefreshTokenPayload>(token, &key, &validation).is_ok()
            }
            TokenKind::Id => {
                jsonwebtoken::decode::<IdTokenPayload>(token, &key, &validation).is_ok()
            }
        };

        if !verified {
            event!(Level::DEBUG, ?kind, "Token failed signature or claim validation");
        }

        Ok(verified)
    }
}
