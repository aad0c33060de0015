pub mod auth;
pub mod client;
pub mod core;
pub mod db;
pub mod http;
pub mod oidc;
pub mod provider;
pub mod util;

use crate::db::DbStore;
use crate::http::server::Server;
use crate::provider::{keys::KeyService, token::TokenService, OAuth2Provider};
use crate::util::hash::HashingService;

use std::sync::Arc;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    hash_secret: String,
    jwt_secret: String,
    jwt_rsa_key_file: String,
    issuer: String,
    access_token_ttl: i64,
    id_token_ttl: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("Supply DATABASE_URL"),
            hash_secret: std::env::var("HASH_SECRET").expect("Supply HASH_SECRET"),
            jwt_secret: std::env::var("JWT_SECRET").expect("Supply JWT_SECRET"),
            jwt_rsa_key_file: std::env::var("JWT_RSA_KEY_FILE")
                .expect("Supply JWT_RSA_KEY_FILE"),
            issuer: std::env::var("ISSUER").unwrap_or_else(|_| "kagiko".to_string()),
            access_token_ttl: Self::ttl_from_env("ACCESS_TOKEN_TTL", 120),
            id_token_ttl: Self::ttl_from_env("ID_TOKEN_TTL", 600),
        }
    }

    fn ttl_from_env(var: &str, default: i64) -> i64 {
        std::env::var(var)
            .ok()
            .map(|v| v.parse().expect("TTL values must be integral seconds"))
            .unwrap_or(default)
    }
}

async fn kagikod(config: Config) -> Option<()> {
    let store = DbStore::acquire(&config.database_url).await.ok()?;
    let hasher = HashingService::with_secret_key(config.hash_secret);

    let rsa_pem =
        std::fs::read_to_string(&config.jwt_rsa_key_file).expect("Failed to read RSA key file");
    let keys = KeyService::new(&config.jwt_secret, &rsa_pem).expect("Failed to load key material");
    let token = TokenService::new(
        keys,
        config.issuer,
        config.access_token_ttl,
        config.id_token_ttl,
    );

    let provider = Arc::new(OAuth2Provider::new(store, hasher, token));

    let _clean_up = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.start_clean_up_worker().await })
    };

    let server = Server::new(provider);
    server.serve().await;
    Some(())
}

pub async fn main() -> Result<(), ()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();
    let config = Config::from_env();
    kagikod(config).await.ok_or(())
}
