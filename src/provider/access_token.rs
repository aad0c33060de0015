use crate::auth::{
    AccessTokenError, AccessTokenErrorKind, AccessTokenResponse, ClientCredentials, Store,
    TokenRequest,
};
use crate::core::types::{unix_time_now, RefreshTokenId};
use crate::provider::token::TokenService;

use super::OAuth2Provider;

use tracing::{event, Level};

impl OAuth2Provider {
    #[tracing::instrument(skip_all, fields(client_id = ?credentials.client_id))]
    pub async fn access_token_request(
        &self,
        credentials: ClientCredentials,
        req: TokenRequest,
    ) -> Result<AccessTokenResponse, AccessTokenError> {
        event!(Level::TRACE, "Handling access token request");
        let client = self.check_client_authentication(&credentials).await?;

        use TokenRequest::*;

        match req {
            AuthorizationCode(req) => {
                event!(Level::TRACE, "Handling authorization_code grant");
                let hashed_code = self.hasher.hash_without_salt(&req.code);

                let data = self
                    .store
                    .take_authcode_data(&client.id, &hashed_code)
                    .await
                    .map_err(|_| AccessTokenErrorKind::InvalidGrant)?
                    .ok_or(AccessTokenErrorKind::InvalidGrant)?;

                if data.redirect_uri != req.redirect_uri {
                    event!(Level::WARN, "redirect_uri does not match the authorized request");
                    Err(AccessTokenErrorKind::InvalidGrant)?
                }

                let (access_token, record) = self
                    .token
                    .new_access_token(&client.id, Some(&data.subject), Some(&data.scope))
                    .map_err(|_| AccessTokenErrorKind::InvalidRequest)?;
                self.store
                    .put_access_token(&record)
                    .await
                    .map_err(|_| AccessTokenErrorKind::InvalidRequest)?;

                let refresh =
                    self.token
                        .new_refresh_token(&client.id, Some(&data.subject), Some(&data.scope));
                self.store
                    .put_refresh_token(&refresh)
                    .await
                    .map_err(|_| AccessTokenErrorKind::InvalidRequest)?;

                let oidc = if data.scope.has_openid() {
                    event!(Level::DEBUG, "Processing OpenID Connect extension data");
                    let id_token = self
                        .token
                        .new_id_token(&client.id, &data.subject, data.nonce.as_ref(), None)
                        .map_err(|_| AccessTokenErrorKind::InvalidRequest)?;
                    Some(crate::oidc::AccessTokenResponse { id_token })
                } else {
                    None
                };

                Ok(AccessTokenResponse {
                    access_token,
                    token_type: TokenService::token_type(),
                    refresh_token: Some(refresh.token.0),
                    expires_in: Some(self.token.access_token_ttl() as u64),
                    oidc,
                })
            }
            RefreshToken(req) => {
                event!(Level::TRACE, "Handling refresh_token grant");
                let data = self
                    .store
                    .find_refresh_token(&RefreshTokenId(req.refresh_token))
                    .await
                    .map_err(|_| AccessTokenErrorKind::InvalidGrant)?
                    .ok_or(AccessTokenErrorKind::InvalidGrant)?;

                if data.invalid_after <= unix_time_now() {
                    event!(Level::WARN, "Refresh token has expired");
                    Err(AccessTokenErrorKind::InvalidGrant)?
                }

                if client.id != data.client_id {
                    event!(
                        Level::WARN,
                        original_client_id = ?data.client_id,
                        refresh_client_id = ?client.id,
                        "client_ids do not match"
                    );
                    Err(AccessTokenErrorKind::InvalidGrant)?
                }

                let scope = match req.scope {
                    Some(requested) => match &data.scope {
                        Some(granted) if granted.contains_all(&requested) => Some(requested),
                        // This scope was not in the original grant
                        _ => Err(AccessTokenErrorKind::InvalidGrant)?,
                    },
                    None => data.scope.clone(),
                };

                let (access_token, record) = self
                    .token
                    .new_access_token(&client.id, data.subject.as_deref(), scope.as_ref())
                    .map_err(|_| AccessTokenErrorKind::InvalidRequest)?;
                self.store
                    .put_access_token(&record)
                    .await
                    .map_err(|_| AccessTokenErrorKind::InvalidRequest)?;

                let oidc = match (&scope, &data.subject) {
                    (Some(scope), Some(subject)) if scope.has_openid() => {
                        event!(Level::DEBUG, "Processing OpenID Connect extension data");
                        let id_token = self
                            .token
                            .new_id_token(&client.id, subject, None, None)
                            .map_err(|_| AccessTokenErrorKind::InvalidRequest)?;
                        Some(crate::oidc::AccessTokenResponse { id_token })
                    }
                    _ => None,
                };

                // The refresh token stays valid and is not rotated; it keeps
                // authorizing new access tokens until it expires or is revoked.
                Ok(AccessTokenResponse {
                    access_token,
                    token_type: TokenService::token_type(),
                    refresh_token: None,
                    expires_in: Some(self.token.access_token_ttl() as u64),
                    oidc,
                })
            }
        }
    }
}
