use kagiko::auth::introspection::IntrospectionRequest;
use kagiko::auth::{
    AccessTokenErrorKind, AuthorizationCodeTokenRequest, ClientCredentials, RefreshTokenRequest,
    Store, TokenRequest,
};
use kagiko::core::models::{AccessTokenRecord, RefreshTokenData};
use kagiko::core::types::{
    unix_time_now, ClientId, ClientSecret, RedirectUri, RefreshTokenId, Scope, TokenId,
};
use kagiko::db::DbStore;
use kagiko::oidc::types::Nonce;
use kagiko::provider::{keys::KeyService, token::TokenService, Error, OAuth2Provider};
use kagiko::util::hash::HashingService;
use kagiko::util::random::FromRandom;

use tempfile::TempDir;

const CLIENT_ID: &str = "client-1";
const CLIENT_SECRET: &str = "password123";
const RESOURCE_SERVER: &str = "resource-1";
const RESOURCE_SERVER_SECRET: &str = "resource-1-password";

struct Harness {
    _dir: TempDir,
    provider: OAuth2Provider,
    // Second handle on the same database, for seeding and inspection.
    store: DbStore,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db_uri = format!("sqlite://{}/kagiko.db?mode=rwc", dir.path().display());

    let store = DbStore::acquire(&db_uri).await.unwrap();
    let side_store = DbStore::acquire(&db_uri).await.unwrap();

    let hasher = HashingService::with_secret_key("pepper".to_string());
    let keys = KeyService::new("jwt-secret", &KeyService::generate_pem()).unwrap();
    let token = TokenService::new(keys, "kagiko".to_string(), 120, 600);

    let provider = OAuth2Provider::new(store, hasher, token);

    let seeder = HashingService::with_secret_key("pepper".to_string());
    side_store
        .put_client(
            ClientId(CLIENT_ID.to_string()),
            "example-client".to_string(),
            seeder.hash(&ClientSecret(CLIENT_SECRET.to_string())).unwrap(),
        )
        .await
        .unwrap();
    side_store
        .put_resource_server(
            RESOURCE_SERVER.to_string(),
            seeder
                .hash(&ClientSecret(RESOURCE_SERVER_SECRET.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    Harness {
        _dir: dir,
        provider,
        store: side_store,
    }
}

fn client_credentials() -> ClientCredentials {
    ClientCredentials {
        client_id: ClientId(CLIENT_ID.to_string()),
        client_secret: ClientSecret(CLIENT_SECRET.to_string()),
    }
}

fn resource_server_credentials() -> ClientCredentials {
    ClientCredentials {
        client_id: ClientId(RESOURCE_SERVER.to_string()),
        client_secret: ClientSecret(RESOURCE_SERVER_SECRET.to_string()),
    }
}

fn refresh_record(subject: &str, scope: &str, invalid_after: i64) -> RefreshTokenData {
    RefreshTokenData {
        token: RefreshTokenId::from_random(),
        client_id: ClientId(CLIENT_ID.to_string()),
        subject: Some(subject.to_string()),
        scope: Some(Scope::from_delimited_parts(scope)),
        invalid_after,
    }
}

fn access_record(token: &str, subject: Option<&str>, invalid_after: i64) -> AccessTokenRecord {
    AccessTokenRecord {
        token: TokenId(token.to_string()),
        client_id: ClientId(CLIENT_ID.to_string()),
        subject: subject.map(str::to_string),
        scope: None,
        invalid_after,
    }
}

#[tokio::test]
async fn refresh_grant_mints_resolvable_access_token() {
    let h = harness().await;

    let refresh = refresh_record("user-1", "openid admin", unix_time_now() + 3600);
    h.store.put_refresh_token(&refresh).await.unwrap();

    let response = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::RefreshToken(RefreshTokenRequest {
                refresh_token: refresh.token.0.clone(),
                scope: None,
            }),
        )
        .await
        .unwrap();

    // The refresh token keeps authorizing future grants; it is not rotated.
    assert!(response.refresh_token.is_none());
    assert_eq!(response.expires_in, Some(120));
    assert!(response.oidc.is_some());

    // The JWT's jti resolves to the persisted record.
    let record = h
        .provider
        .get_access_token(&response.access_token)
        .await
        .unwrap()
        .expect("record should resolve from the JWT");
    assert_eq!(record.subject.as_deref(), Some("user-1"));
    assert_eq!(
        record.scope,
        Some(Scope::from_delimited_parts("openid admin"))
    );

    // Legacy path: the raw identifier is also a valid bearer string.
    let by_raw_id = h
        .provider
        .get_access_token(&record.token.0)
        .await
        .unwrap()
        .expect("record should resolve from the raw identifier");
    assert_eq!(by_raw_id, record);

    // Lookup is idempotent.
    let again = h
        .provider
        .get_access_token(&response.access_token)
        .await
        .unwrap();
    assert_eq!(again, Some(record));
}

#[tokio::test]
async fn refresh_grant_rejects_foreign_expired_and_widened() {
    let h = harness().await;

    // Refresh token owned by another client.
    let foreign = RefreshTokenData {
        client_id: ClientId("someone-else".to_string()),
        ..refresh_record("user-1", "admin", unix_time_now() + 3600)
    };
    h.store.put_refresh_token(&foreign).await.unwrap();

    let err = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::RefreshToken(RefreshTokenRequest {
                refresh_token: foreign.token.0.clone(),
                scope: None,
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, AccessTokenErrorKind::InvalidGrant));

    // Expired refresh token.
    let expired = refresh_record("user-1", "admin", unix_time_now() - 10);
    h.store.put_refresh_token(&expired).await.unwrap();

    let err = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::RefreshToken(RefreshTokenRequest {
                refresh_token: expired.token.0.clone(),
                scope: None,
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, AccessTokenErrorKind::InvalidGrant));

    // Scope wider than the original grant.
    let narrow = refresh_record("user-1", "admin", unix_time_now() + 3600);
    h.store.put_refresh_token(&narrow).await.unwrap();

    let err = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::RefreshToken(RefreshTokenRequest {
                refresh_token: narrow.token.0.clone(),
                scope: Some(Scope::from_delimited_parts("admin superuser")),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, AccessTokenErrorKind::InvalidGrant));

    // Narrowing within the original grant is fine.
    let wide = refresh_record("user-1", "openid admin", unix_time_now() + 3600);
    h.store.put_refresh_token(&wide).await.unwrap();

    let response = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::RefreshToken(RefreshTokenRequest {
                refresh_token: wide.token.0.clone(),
                scope: Some(Scope::from_delimited_parts("admin")),
            }),
        )
        .await
        .unwrap();

    let record = h
        .provider
        .get_access_token(&response.access_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.scope, Some(Scope::from_delimited_parts("admin")));
}

#[tokio::test]
async fn auth_code_exchange_is_single_use() {
    let h = harness().await;

    let client_id = ClientId(CLIENT_ID.to_string());
    let redirect_uri = RedirectUri("http://localhost:8080/callback".to_string());
    let scope = Scope::from_delimited_parts("openid admin");

    let code = h
        .provider
        .issue_authorization_code(
            &client_id,
            "user-1",
            &scope,
            &redirect_uri,
            Some(Nonce("n-1".to_string())),
        )
        .await
        .unwrap();

    let response = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::AuthorizationCode(AuthorizationCodeTokenRequest {
                code: code.clone(),
                redirect_uri: redirect_uri.clone(),
            }),
        )
        .await
        .unwrap();

    assert!(response.refresh_token.is_some());
    assert!(response.oidc.is_some());

    // A code can only ever be exchanged once.
    let err = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::AuthorizationCode(AuthorizationCodeTokenRequest {
                code,
                redirect_uri: redirect_uri.clone(),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, AccessTokenErrorKind::InvalidGrant));

    // A mismatched redirect_uri invalidates the exchange.
    let second = h
        .provider
        .issue_authorization_code(&client_id, "user-1", &scope, &redirect_uri, None)
        .await
        .unwrap();

    let err = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::AuthorizationCode(AuthorizationCodeTokenRequest {
                code: second,
                redirect_uri: RedirectUri("http://evil.example/callback".to_string()),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, AccessTokenErrorKind::InvalidGrant));
}

#[tokio::test]
async fn lookup_miss_is_a_normal_outcome() {
    let h = harness().await;

    let missing = h
        .provider
        .get_access_token("not-a-token-anyone-issued")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn lookup_reaps_only_strictly_older_sibling_records() {
    let h = harness().await;
    let now = unix_time_now();

    let older = access_record("older", Some("user-1"), now + 50);
    let found = access_record("found", Some("user-1"), now + 100);
    let peer = access_record("peer", Some("user-1"), now + 100);
    let other_user = access_record("other-user", Some("user-2"), now + 10);

    for record in [&older, &found, &peer, &other_user] {
        h.store.put_access_token(record).await.unwrap();
    }

    let resolved = h
        .provider
        .get_access_token("found")
        .await
        .unwrap()
        .expect("matched record must survive its own lookup");
    assert_eq!(resolved.token, found.token);

    // Strictly older sibling is gone.
    assert!(h
        .store
        .find_access_token(&older.token)
        .await
        .unwrap()
        .is_none());
    // Equal-expiry sibling survives: comparison is strict.
    assert!(h
        .store
        .find_access_token(&peer.token)
        .await
        .unwrap()
        .is_some());
    // Other users' tokens are untouched.
    assert!(h
        .store
        .find_access_token(&other_user.token)
        .await
        .unwrap()
        .is_some());
    // And the matched record itself is intact.
    assert!(h
        .store
        .find_access_token(&found.token)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn concurrent_issuance_never_empties_a_users_records() {
    let h = harness().await;
    let now = unix_time_now();

    let first = access_record("first", Some("user-1"), now + 60);
    let second = access_record("second", Some("user-1"), now + 120);

    let (a, b) = tokio::join!(
        h.store.put_access_token(&first),
        h.store.put_access_token(&second)
    );
    a.unwrap();
    b.unwrap();

    // Each token resolves to its own record once issuance has completed.
    let found_first = h.provider.get_access_token("first").await.unwrap();
    assert_eq!(found_first.map(|r| r.token), Some(first.token));

    let found_second = h.provider.get_access_token("second").await.unwrap();
    assert_eq!(found_second.map(|r| r.token), Some(second.token.clone()));

    // The store never ends up with zero records for the user.
    assert!(h
        .store
        .find_access_token(&second.token)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn revoked_refresh_token_stops_granting() {
    use kagiko::auth::introspection::TokenTypeHint;
    use kagiko::auth::revocation::RevocationRequest;

    let h = harness().await;

    let refresh = refresh_record("user-1", "admin", unix_time_now() + 3600);
    h.store.put_refresh_token(&refresh).await.unwrap();

    h.provider
        .revocation_request(
            client_credentials(),
            RevocationRequest {
                token: refresh.token.0.clone(),
                token_type_hint: Some(TokenTypeHint::RefreshToken),
            },
        )
        .await
        .unwrap();

    let err = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::RefreshToken(RefreshTokenRequest {
                refresh_token: refresh.token.0.clone(),
                scope: None,
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, AccessTokenErrorKind::InvalidGrant));

    // Revoking a token nobody issued still converges on the same state.
    h.provider
        .revocation_request(
            client_credentials(),
            RevocationRequest {
                token: "never-issued".to_string(),
                token_type_hint: Some(TokenTypeHint::RefreshToken),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn introspection_authenticates_the_resource_server() {
    let h = harness().await;

    let err = h
        .provider
        .introspection_request(
            ClientCredentials {
                client_id: ClientId(RESOURCE_SERVER.to_string()),
                client_secret: ClientSecret("wrong".to_string()),
            },
            IntrospectionRequest {
                token: "anything".to_string(),
                token_type_hint: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn introspection_reports_active_and_inactive_tokens() {
    let h = harness().await;

    let refresh = refresh_record("user-1", "admin", unix_time_now() + 3600);
    h.store.put_refresh_token(&refresh).await.unwrap();

    let response = h
        .provider
        .access_token_request(
            client_credentials(),
            TokenRequest::RefreshToken(RefreshTokenRequest {
                refresh_token: refresh.token.0.clone(),
                scope: None,
            }),
        )
        .await
        .unwrap();

    let introspection = h
        .provider
        .introspection_request(
            resource_server_credentials(),
            IntrospectionRequest {
                token: response.access_token.clone(),
                token_type_hint: None,
            },
        )
        .await
        .unwrap();

    assert!(introspection.active);
    let claims = introspection.claims.unwrap();
    assert_eq!(claims.client_id, ClientId(CLIENT_ID.to_string()));
    assert_eq!(claims.user_id.as_deref(), Some("user-1"));
    assert_eq!(claims.scope, Some(Scope::from_delimited_parts("admin")));
    assert!(claims.exp > unix_time_now());

    // Introspection does not mutate validity: asking again gives the same
    // answer.
    let again = h
        .provider
        .introspection_request(
            resource_server_credentials(),
            IntrospectionRequest {
                token: response.access_token.clone(),
                token_type_hint: None,
            },
        )
        .await
        .unwrap();
    assert!(again.active);

    // An expired record is inactive even though the row still exists.
    let expired = access_record("expired", Some("user-9"), unix_time_now() - 5);
    h.store.put_access_token(&expired).await.unwrap();

    let inactive = h
        .provider
        .introspection_request(
            resource_server_credentials(),
            IntrospectionRequest {
                token: "expired".to_string(),
                token_type_hint: None,
            },
        )
        .await
        .unwrap();
    assert!(!inactive.active);
    assert!(inactive.claims.is_none());

    // Unknown tokens are inactive, not errors.
    let unknown = h
        .provider
        .introspection_request(
            resource_server_credentials(),
            IntrospectionRequest {
                token: "never-issued".to_string(),
                token_type_hint: None,
            },
        )
        .await
        .unwrap();
    assert!(!unknown.active);
}
