//! The relying-party half of the protocol: acquiring, refreshing and
//! introspecting tokens against a running authorization server.

use crate::auth::introspection::IntrospectionResponse;

pub mod cookie;
pub mod error;
pub mod validate;

pub use error::FlowError;

use tracing::{event, Level};
use url::Url;

/// The three token credentials a relying party juggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Id,
}

/// Externally observable acquisition states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    NoToken,
    HaveToken,
    Refreshing,
}

/// Credentials currently held by the caller, as read from its cookie jar
/// (or wherever else it keeps them — storage is not this module's concern).
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    pub fn state(&self) -> FlowState {
        if self.access_token.is_some() {
            FlowState::HaveToken
        } else {
            FlowState::NoToken
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub token_endpoint: Url,
    pub introspection_endpoint: Url,
    pub client_id: String,
    pub client_secret: String,
    pub resource_server_username: String,
    pub resource_server_password: String,
}

/// Successful response from the token endpoint. The flattened OpenID
/// extension surfaces as a plain optional `id_token`.
#[derive(Debug, serde::Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub id_token: Option<String>,
}

#[derive(Debug)]
pub struct IntrospectionOutcome {
    pub introspection: IntrospectionResponse,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenFlow {
    http: reqwest::Client,
    config: FlowConfig,
}

impl std::fmt::Debug for TokenFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenFlow {{ ... }}")
    }
}

impl TokenFlow {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Exchanges a refresh token for a fresh access token. An unreachable
    /// or refusing token endpoint is a normal outcome (`None`); only a
    /// malformed success body is an error. Retrying is the caller's call.
    #[tracing::instrument(skip_all)]
    pub async fn request_new_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<TokenGrant>, FlowError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        let response = match self
            .http
            .post(self.config.token_endpoint.clone())
            .basic_auth(
                &self.config.resource_server_username,
                Some(&self.config.resource_server_password),
            )
            .form(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                event!(Level::WARN, error = %err, "Token endpoint unreachable");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            event!(
                Level::WARN,
                status = %response.status(),
                "Token endpoint refused the refresh"
            );
            return Ok(None);
        }

        let grant = response
            .json::<TokenGrant>()
            .await
            .map_err(FlowError::Decode)?;

        Ok(Some(grant))
    }

    /// The combined operation a protected-resource request runs: make sure
    /// an access token is held (acquiring one first if necessary), then ask
    /// the introspection endpoint whether it is active.
    ///
    /// `Ok(None)` means "no answer" — an unauthenticated visitor or an
    /// unreachable endpoint — and is distinct from an `active: false`
    /// introspection result.
    #[tracing::instrument(skip_all, fields(force_refresh = force_refresh))]
    pub async fn introspect(
        &self,
        tokens: &SessionTokens,
        force_refresh: bool,
    ) -> Result<Option<IntrospectionOutcome>, FlowError> {
        let mut access_token = tokens.access_token.clone();
        let mut refresh_token = tokens.refresh_token.clone();

        // An unauthenticated visitor is expected, not exceptional: without
        // a refresh token there is nothing to exchange, so don't even try.
        if access_token.is_none() && refresh_token.is_none() {
            event!(Level::DEBUG, state = ?FlowState::NoToken, "No credentials held");
            return Ok(None);
        }

        if access_token.is_none() || force_refresh {
            let Some(held) = refresh_token.clone() else {
                return Ok(None);
            };

            event!(Level::DEBUG, state = ?FlowState::Refreshing, "Exchanging refresh token");
            if let Some(grant) = self.request_new_access_token(&held).await? {
                access_token = Some(grant.access_token);
                if let Some(rotated) = grant.refresh_token {
                    refresh_token = Some(rotated);
                }
            }
        }

        let (Some(access_token), Some(refresh_token)) = (access_token, refresh_token) else {
            return Ok(None);
        };

        let response = match self
            .http
            .post(self.config.introspection_endpoint.clone())
            .basic_auth(
                &self.config.resource_server_username,
                Some(&self.config.resource_server_password),
            )
            .form(&[("token", access_token.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                event!(Level::WARN, error = %err, "Introspection endpoint unreachable");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            event!(
                Level::WARN,
                status = %response.status(),
                "Introspection endpoint refused the request"
            );
            return Ok(None);
        }

        let introspection = response
            .json::<IntrospectionResponse>()
            .await
            .map_err(FlowError::Decode)?;

        Ok(Some(IntrospectionOutcome {
            introspection,
            access_token,
            refresh_token,
        }))
    }
}
