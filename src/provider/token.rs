use crate::auth::TokenType;
use crate::core::models::{AccessTokenRecord, RefreshTokenData};
use crate::core::types::{unix_time_now, ClientId, Expire, RefreshTokenId, Scope, TokenId};
use crate::oidc::types::Nonce;
use crate::provider::{
    claims::{AccessClaims, IdClaims},
    keys::{JsonWebKeySet, KeyService},
    Error,
};
use crate::util::random::FromRandom;

use jsonwebtoken::{Algorithm, Validation};
use tracing::{event, Level};

pub struct TokenService {
    keys: KeyService,
    issuer: String,
    access_token_ttl: i64,
    id_token_ttl: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenService {{ ... }}")
    }
}

impl TokenService {
    pub fn new(keys: KeyService, issuer: String, access_token_ttl: i64, id_token_ttl: i64) -> Self {
        Self {
            keys,
            issuer,
            access_token_ttl,
            id_token_ttl,
        }
    }

    pub fn token_type() -> TokenType {
        TokenType::Bearer
    }

    pub fn access_token_ttl(&self) -> i64 {
        self.access_token_ttl
    }

    pub fn key_set(&self) -> &JsonWebKeySet {
        self.keys.key_set()
    }

    /// Deterministic claim packaging and signature for an access JWT.
    pub fn create_jwt(
        &self,
        subject: &str,
        expiry: i64,
        audience: &str,
        jti: TokenId,
        issued_at: i64,
    ) -> Result<String, Error> {
        let claims = AccessClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            aud: audience.to_string(),
            exp: expiry,
            iat: issued_at,
            jti,
        };

        self.keys.sign_symmetric(&claims)
    }

    /// Mints the two representations of a fresh access token: the signed
    /// JWT handed to the caller and the identifier record the store keeps.
    /// Persisting the record is the caller's job.
    #[tracing::instrument(skip_all, fields(client_id = ?client_id))]
    pub fn new_access_token(
        &self,
        client_id: &ClientId,
        subject: Option<&str>,
        scope: Option<&Scope>,
    ) -> Result<(String, AccessTokenRecord), Error> {
        let time_now = unix_time_now();
        let expiry = time_now + self.access_token_ttl;
        let jti = TokenId::from_random();

        let jwt = self.create_jwt(
            subject.unwrap_or(""),
            expiry,
            &client_id.0,
            jti.clone(),
            time_now,
        )?;

        let record = AccessTokenRecord {
            token: jti,
            client_id: client_id.clone(),
            subject: subject.map(str::to_string),
            scope: scope.cloned(),
            invalid_after: expiry,
        };

        event!(Level::DEBUG, jti = ?record.token, "Issuing access_token");
        Ok((jwt, record))
    }

    #[tracing::instrument(skip_all, fields(client_id = ?client_id))]
    pub fn new_refresh_token(
        &self,
        client_id: &ClientId,
        subject: Option<&str>,
        scope: Option<&Scope>,
    ) -> RefreshTokenData {
        let record = RefreshTokenData {
            token: RefreshTokenId::from_random(),
            client_id: client_id.clone(),
            subject: subject.map(str::to_string),
            scope: scope.cloned(),
            invalid_after: RefreshTokenData::expiry().into(),
        };

        event!(Level::DEBUG, "Issuing refresh_token");
        record
    }

    #[tracing::instrument(skip(self, nonce))]
    pub fn new_id_token(
        &self,
        client_id: &ClientId,
        subject: &str,
        nonce: Option<&Nonce>,
        auth_time: Option<i64>,
    ) -> Result<String, Error> {
        let time_now = unix_time_now();

        let claims = IdClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            aud: vec![client_id.0.clone()],
            exp: time_now + self.id_token_ttl,
            iat: time_now,
            nonce: nonce.cloned(),
            auth_time,
        };

        event!(Level::DEBUG, "Issuing id_token");
        self.keys.sign_with_key_pair(&claims)
    }

    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;
        validation.leeway = 0;

        self.keys
            .verify_symmetric(token, &validation)
            .map_err(|_| Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        let keys = KeyService::new("test", &KeyService::generate_pem()).unwrap();
        TokenService::new(keys, "kagiko".to_string(), 120, 600)
    }

    #[test]
    fn access_jwt_round_trips() {
        let service = service();
        let now = unix_time_now();
        let jti = TokenId("token-1".to_string());

        let jwt = service
            .create_jwt("user-1", now + 60, "client-1", jti.clone(), now)
            .unwrap();
        let claims = service.decode_access_token(&jwt).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.aud, "client-1");
        assert_eq!(claims.jti, jti);
        assert_eq!(claims.iss, "kagiko");
        assert_eq!(claims.exp, now + 60);
        assert_eq!(claims.iat, now);
    }

    #[test]
    fn expired_access_jwt_is_rejected() {
        let service = service();
        let now = unix_time_now();

        let jwt = service
            .create_jwt("user-1", now - 1, "client-1", TokenId::from_random(), now - 61)
            .unwrap();

        assert!(service.decode_access_token(&jwt).is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let service = service();
        let other = {
            let keys = KeyService::new("test", &KeyService::generate_pem()).unwrap();
            TokenService::new(keys, "someone-else".to_string(), 120, 600)
        };
        let now = unix_time_now();

        let jwt = other
            .create_jwt("user-1", now + 60, "client-1", TokenId::from_random(), now)
            .unwrap();

        assert!(service.decode_access_token(&jwt).is_err());
    }

    #[test]
    fn new_access_token_embeds_the_stored_identifier() {
        let service = service();
        let client = ClientId("client-1".to_string());

        let (jwt, record) = service
            .new_access_token(&client, Some("user-1"), None)
            .unwrap();
        let claims = service.decode_access_token(&jwt).unwrap();

        assert_eq!(claims.jti, record.token);
        assert_eq!(record.client_id, client);
        assert_eq!(record.subject.as_deref(), Some("user-1"));
        assert_eq!(record.invalid_after, claims.exp);
        // The JWT is handed out; the record keeps only the identifier.
        assert_ne!(jwt, record.token.0);
    }

    #[test]
    fn refresh_tokens_are_opaque_hex() {
        let service = service();
        let record = service.new_refresh_token(&ClientId("client-1".to_string()), None, None);

        assert_eq!(record.token.0.len(), 64);
        assert!(record.token.0.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!record.token.0.contains('.'));

        let month = 60 * 60 * 24 * 30;
        let now = unix_time_now();
        assert!((record.invalid_after - now - month).abs() <= 2);
    }

    #[test]
    fn id_token_is_signed_with_the_advertised_key() {
        let service = service();
        let token = service
            .new_id_token(
                &ClientId("client-1".to_string()),
                "user-1",
                Some(&Nonce("n-1".to_string())),
                None,
            )
            .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(
            header.kid.as_deref(),
            Some(crate::provider::keys::KEY_ID)
        );
    }
}
