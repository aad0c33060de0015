use crate::core::models::{
    AccessTokenRecord, AuthCodeData, Client, RefreshTokenData, ResourceServer,
};
use crate::core::types::{
    AuthCode, ClientId, ClientSecret, HashedAuthCode, HashedClientSecret, RedirectUri,
    RefreshTokenId, Scope, TokenId,
};
use crate::oidc;
use crate::provider::error::Error;

pub mod error;
pub mod introspection;
pub mod revocation;

use error::ErrorResponse;

pub type AccessTokenError = ErrorResponse<AccessTokenErrorKind>;

#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct ClientCredentials {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub enum TokenType {
    Bearer,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "grant_type")]
pub enum TokenRequest {
    #[serde(rename = "authorization_code")]
    AuthorizationCode(AuthorizationCodeTokenRequest),
    #[serde(rename = "refresh_token")]
    RefreshToken(RefreshTokenRequest),
}

#[derive(Debug, serde::Deserialize)]
pub struct AuthorizationCodeTokenRequest {
    pub code: AuthCode,
    pub redirect_uri: RedirectUri,
}

#[derive(Debug, serde::Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
    pub scope: Option<Scope>,
}

#[derive(serde::Serialize, Debug)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc: Option<oidc::AccessTokenResponse>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTokenErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnsupportedGrantType,
    InvalidScope,
}

impl From<AccessTokenErrorKind> for AccessTokenError {
    fn from(kind: AccessTokenErrorKind) -> Self {
        Self {
            kind,
            description: None,
            uri: None,
        }
    }
}

/// Persistence boundary for everything the token lifecycle touches.
#[async_trait::async_trait]
pub trait Store {
    async fn get_client(&self, client_id: &ClientId) -> Result<Option<Client>, Error>;
    async fn put_client(
        &self,
        client_id: ClientId,
        name: String,
        secret: HashedClientSecret,
    ) -> Result<Client, Error>;
    async fn delete_client(&self, client_id: &ClientId) -> Result<(), Error>;
    async fn list_clients(&self) -> Result<Vec<Client>, Error>;

    async fn get_resource_server(&self, username: &str) -> Result<Option<ResourceServer>, Error>;
    async fn put_resource_server(
        &self,
        username: String,
        secret: HashedClientSecret,
    ) -> Result<ResourceServer, Error>;

    async fn store_code(&self, data: AuthCodeData) -> Result<(), Error>;
    /// Atomic fetch-and-delete: a code can only ever be exchanged once.
    async fn take_authcode_data(
        &self,
        client_id: &ClientId,
        code: &HashedAuthCode,
    ) -> Result<Option<AuthCodeData>, Error>;

    async fn put_access_token(&self, record: &AccessTokenRecord) -> Result<(), Error>;
    async fn find_access_token(&self, token: &TokenId) -> Result<Option<AccessTokenRecord>, Error>;
    /// Deletes records for the same subject whose expiry is strictly earlier
    /// than the found record's. The found record itself is always excluded.
    async fn delete_superseded_tokens(&self, found: &AccessTokenRecord) -> Result<u64, Error>;

    async fn put_refresh_token(&self, data: &RefreshTokenData) -> Result<(), Error>;
    async fn find_refresh_token(
        &self,
        token: &RefreshTokenId,
    ) -> Result<Option<RefreshTokenData>, Error>;
    async fn delete_refresh_token(&self, token: &RefreshTokenId) -> Result<(), Error>;

    async fn clean_up(&self) -> Result<(), Error>;
}
