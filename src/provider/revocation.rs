use crate::auth::{
    introspection::TokenTypeHint, revocation::RevocationRequest, ClientCredentials, Store,
};
use crate::core::types::RefreshTokenId;

use super::{Error, OAuth2Provider};

use tracing::{event, Level};

impl OAuth2Provider {
    /// Revokes a refresh token, ending its authority to mint access
    /// tokens. Access tokens are too short-lived to be worth revoking and
    /// simply age out.
    #[tracing::instrument(
        skip(self, credentials, request),
        fields(client_id = ?credentials.client_id)
    )]
    pub async fn revocation_request(
        &self,
        credentials: ClientCredentials,
        request: RevocationRequest,
    ) -> Result<(), Error> {
        let client = self
            .check_client_authentication(&credentials)
            .await
            .map_err(|_| Error::Unauthorized)?;

        match request.token_type_hint {
            None | Some(TokenTypeHint::AccessToken) => {
                event!(Level::WARN, "Unsupported revocation type");
                Err(Error::BadRequest)
            }
            Some(TokenTypeHint::RefreshToken) => {
                let token = RefreshTokenId(request.token);

                if let Some(data) = self.store.find_refresh_token(&token).await? {
                    if data.client_id != client.id {
                        event!(
                            Level::WARN,
                            original_client_id = ?data.client_id,
                            revoke_client_id = ?client.id,
                            "client_ids do not match"
                        );
                        Err(Error::BadRequest)?
                    }

                    event!(Level::DEBUG, "Invalidating refresh token");
                    self.store.delete_refresh_token(&token).await?;
                }

                // An already-unknown token revokes to the same end state.
                Ok(())
            }
        }
    }
}
