use crate::core::types::{ClientId, Scope};

use super::TokenType;

#[derive(Debug)]
#[derive(serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct IntrospectionRequest {
    pub token: String,
    pub token_type_hint: Option<TokenTypeHint>,
}

/// Both halves of the protocol live in this crate, so the response type
/// derives both directions: the authorization server serializes it, the
/// resource-server caller deserializes it.
#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<IntrospectionClaims>,
}

#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct IntrospectionClaims {
    pub client_id: ClientId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    pub exp: i64,
}
