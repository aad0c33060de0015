use super::introspection::TokenTypeHint;

#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct RevocationRequest {
    pub token: String,
    pub token_type_hint: Option<TokenTypeHint>,
}
