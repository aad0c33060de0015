use crate::core::types::TokenId;
use crate::oidc::types::Nonce;

/// Claims of the signed JWT wrapped around an access token. The `jti` is
/// the identifier the store keeps; everything else is derived at issuance.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: TokenId,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct IdClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Nonce>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
}
