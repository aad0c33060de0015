pub mod types;

use crate::core::types::Scope;

/// OpenID Connect extension to the token response.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenResponse {
    pub id_token: String,
}

impl Scope {
    pub fn has_openid(&self) -> bool {
        self.contains("openid")
    }
}
