use crate::oidc::types::Nonce;

use super::types::*;

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub secret: HashedClientSecret,
}

/// A registered resource server, allowed to call the introspection endpoint.
#[derive(Debug)]
pub struct ResourceServer {
    pub username: String,
    pub secret: HashedClientSecret,
}

#[derive(Debug)]
pub struct AuthCodeData {
    pub code: HashedAuthCode,
    pub client_id: ClientId,
    pub redirect_uri: RedirectUri,
    pub subject: String,
    pub scope: Scope,
    pub nonce: Option<Nonce>,
}

impl Expire for AuthCodeData {
    const EXPIRES_IN_SECS: u64 = 10 * 60;
}

/// The persisted half of an access token. `token` is the unsigned
/// identifier; the signed JWT representation is never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessTokenRecord {
    pub token: TokenId,
    pub client_id: ClientId,
    pub subject: Option<String>,
    pub scope: Option<Scope>,
    pub invalid_after: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenData {
    pub token: RefreshTokenId,
    pub client_id: ClientId,
    pub subject: Option<String>,
    pub scope: Option<Scope>,
    pub invalid_after: i64,
}

impl Expire for RefreshTokenData {
    const EXPIRES_IN_SECS: u64 = 60 * 60 * 24 * 30;
}
