use crate::auth::{
    introspection::{IntrospectionClaims, IntrospectionRequest, IntrospectionResponse},
    ClientCredentials, Store,
};
use crate::core::models::AccessTokenRecord;
use crate::core::types::{unix_time_now, TokenId};
use crate::provider::token::TokenService;

use super::{Error, OAuth2Provider};

use tracing::{event, Level};

impl OAuth2Provider {
    #[tracing::instrument(skip(self, credentials), fields(resource_server = ?credentials.client_id))]
    pub async fn introspection_request(
        &self,
        credentials: ClientCredentials,
        request: IntrospectionRequest,
    ) -> Result<IntrospectionResponse, Error> {
        self.check_resource_server_authentication(&credentials)
            .await?;

        let record = self.get_access_token(&request.token).await?;

        match record {
            Some(record) if record.invalid_after > unix_time_now() => {
                event!(Level::DEBUG, jti = ?record.token, "Valid token");
                Ok(IntrospectionResponse {
                    active: true,
                    token_type: Some(TokenService::token_type()),
                    claims: Some(IntrospectionClaims {
                        client_id: record.client_id,
                        user_id: record.subject,
                        scope: record.scope,
                        exp: record.invalid_after,
                    }),
                })
            }
            _ => {
                event!(Level::WARN, "Invalid token");
                Ok(IntrospectionResponse {
                    active: false,
                    token_type: None,
                    claims: None,
                })
            }
        }
    }

    /// Resolves a bearer string to its store record. The string is usually
    /// a signed JWT whose `jti` names the record; anything that fails JWT
    /// verification is tried as a raw identifier so that pre-JWT opaque
    /// tokens keep resolving.
    pub async fn get_access_token(
        &self,
        bearer: &str,
    ) -> Result<Option<AccessTokenRecord>, Error> {
        let lookup_key = match self.token.decode_access_token(bearer) {
            Ok(claims) => claims.jti,
            Err(_) => {
                event!(Level::DEBUG, "Not a verifiable JWT, using the raw string");
                TokenId(bearer.to_string())
            }
        };

        let record = self.store.find_access_token(&lookup_key).await?;

        match &record {
            Some(found) => {
                // Older tokens for the same user are superseded; dropping
                // them here is opportunistic and must never fail the lookup.
                match self.store.delete_superseded_tokens(found).await {
                    Ok(count) if count > 0 => {
                        event!(Level::DEBUG, count, "Reaped superseded access tokens")
                    }
                    Ok(_) => {}
                    Err(err) => {
                        event!(Level::WARN, ?err, "Failed to reap superseded tokens")
                    }
                }
            }
            None => event!(Level::DEBUG, "Access token lookup miss"),
        }

        Ok(record)
    }
}
