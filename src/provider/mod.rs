use crate::auth::{
    AccessTokenError, AccessTokenErrorKind, ClientCredentials, Store,
};
use crate::core::models::{AuthCodeData, Client, ResourceServer};
use crate::core::types::{AuthCode, ClientId, RedirectUri, Scope};
use crate::db::DbStore;
use crate::oidc::types::Nonce;
use crate::provider::keys::JsonWebKeySet;
use crate::util::{hash::HashingService, random::FromRandom};

pub mod access_token;
pub mod claims;
pub mod error;
pub mod introspection;
pub mod keys;
pub mod revocation;
pub mod token;

pub use error::Error;
use token::TokenService;

use tracing::{event, Level};

#[derive(Debug)]
pub struct OAuth2Provider {
    store: DbStore,
    hasher: HashingService,
    token: TokenService,
}

impl OAuth2Provider {
    pub fn new(store: DbStore, hasher: HashingService, token: TokenService) -> Self {
        Self {
            store,
            hasher,
            token,
        }
    }

    pub fn key_set(&self) -> &JsonWebKeySet {
        self.token.key_set()
    }

    async fn check_client_authentication(
        &self,
        cred: &ClientCredentials,
    ) -> Result<Client, AccessTokenError> {
        let client = self.store.get_client(&cred.client_id).await;

        if let Ok(Some(c)) = client {
            if let Ok(true) = self.hasher.verify(&cred.client_secret, &c.secret) {
                return Ok(c);
            }
        }

        event!(Level::WARN, client_id = ?cred.client_id, "Bad client authentication");
        Err(AccessTokenError {
            kind: AccessTokenErrorKind::InvalidClient,
            description: Some("Bad authentication".to_string()),
            uri: None,
        })
    }

    async fn check_resource_server_authentication(
        &self,
        cred: &ClientCredentials,
    ) -> Result<ResourceServer, Error> {
        let server = self.store.get_resource_server(&cred.client_id.0).await;

        if let Ok(Some(s)) = server {
            if let Ok(true) = self.hasher.verify(&cred.client_secret, &s.secret) {
                return Ok(s);
            }
        }

        event!(Level::WARN, username = ?cred.client_id, "Bad resource server authentication");
        Err(Error::Unauthorized)
    }

    /// Entry point for the (external) authorization UI: mints a single-use
    /// code bound to the client, redirect URI and authorized scope. Only
    /// the code's digest is stored.
    pub async fn issue_authorization_code(
        &self,
        client_id: &ClientId,
        subject: &str,
        scope: &Scope,
        redirect_uri: &RedirectUri,
        nonce: Option<Nonce>,
    ) -> Result<AuthCode, Error> {
        let code = AuthCode::from_random();
        let hashed_code = self.hasher.hash_without_salt(&code);

        let data = AuthCodeData {
            code: hashed_code,
            client_id: client_id.clone(),
            redirect_uri: redirect_uri.clone(),
            subject: subject.to_string(),
            scope: scope.clone(),
            nonce,
        };

        self.store.store_code(data).await?;
        Ok(code)
    }

    pub async fn start_clean_up_worker(&self) -> Result<(), Error> {
        use std::time::Duration;
        use tokio::time::interval;

        let mut interval = interval(Duration::from_secs(15));

        loop {
            interval.tick().await;
            self.store.clean_up().await?
        }
    }
}
