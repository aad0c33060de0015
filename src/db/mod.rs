use crate::auth::Store;
use crate::core::models::{
    AccessTokenRecord, AuthCodeData, Client, RefreshTokenData, ResourceServer,
};
use crate::core::types::{
    unix_time_now, ClientId, Expire, HashedAuthCode, HashedClientSecret, RedirectUri,
    RefreshTokenId, Scope, TokenId,
};
use crate::oidc::types::Nonce;
use crate::provider::error::Error;

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS clients (
        client_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        secret_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS resource_servers (
        username TEXT PRIMARY KEY,
        secret_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS codes (
        code TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        redirect_uri TEXT NOT NULL,
        subject TEXT NOT NULL,
        scope TEXT NOT NULL,
        nonce TEXT,
        invalid_after INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS access_tokens (
        token TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        subject TEXT,
        scope TEXT,
        invalid_after INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS refresh_tokens (
        token TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        subject TEXT,
        scope TEXT,
        invalid_after INTEGER NOT NULL
    )",
];

#[derive(Debug)]
pub struct DbStore {
    pool: SqlitePool,
}

impl DbStore {
    pub async fn acquire(db_uri: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(db_uri).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn client_from_row(row: &SqliteRow) -> Result<Client, sqlx::Error> {
        Ok(Client {
            id: ClientId(row.try_get("client_id")?),
            name: row.try_get("name")?,
            secret: HashedClientSecret(row.try_get("secret_hash")?),
        })
    }

    fn access_token_from_row(row: &SqliteRow) -> Result<AccessTokenRecord, sqlx::Error> {
        Ok(AccessTokenRecord {
            token: TokenId(row.try_get("token")?),
            client_id: ClientId(row.try_get("client_id")?),
            subject: row.try_get("subject")?,
            scope: row
                .try_get::<Option<String>, _>("scope")?
                .map(|s| Scope::from_delimited_parts(&s)),
            invalid_after: row.try_get("invalid_after")?,
        })
    }

    fn refresh_token_from_row(row: &SqliteRow) -> Result<RefreshTokenData, sqlx::Error> {
        Ok(RefreshTokenData {
            token: RefreshTokenId(row.try_get("token")?),
            client_id: ClientId(row.try_get("client_id")?),
            subject: row.try_get("subject")?,
            scope: row
                .try_get::<Option<String>, _>("scope")?
                .map(|s| Scope::from_delimited_parts(&s)),
            invalid_after: row.try_get("invalid_after")?,
        })
    }
}

#[async_trait::async_trait]
impl Store for DbStore {
    async fn get_client(&self, client_id: &ClientId) -> Result<Option<Client>, Error> {
        let row = sqlx::query("SELECT * FROM clients WHERE client_id = ?")
            .bind(&client_id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::client_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn put_client(
        &self,
        client_id: ClientId,
        name: String,
        secret: HashedClientSecret,
    ) -> Result<Client, Error> {
        sqlx::query("INSERT INTO clients(client_id, name, secret_hash) VALUES(?, ?, ?)")
            .bind(&client_id.0)
            .bind(&name)
            .bind(&secret.0)
            .execute(&self.pool)
            .await?;

        Ok(Client {
            id: client_id,
            name,
            secret,
        })
    }

    async fn delete_client(&self, client_id: &ClientId) -> Result<(), Error> {
        sqlx::query("DELETE FROM clients WHERE client_id = ?")
            .bind(&client_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_clients(&self) -> Result<Vec<Client>, Error> {
        let rows = sqlx::query("SELECT * FROM clients ORDER BY client_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Self::client_from_row(row).map_err(Error::from))
            .collect()
    }

    async fn get_resource_server(&self, username: &str) -> Result<Option<ResourceServer>, Error> {
        let row = sqlx::query("SELECT * FROM resource_servers WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|row| -> Result<ResourceServer, sqlx::Error> {
                Ok(ResourceServer {
                    username: row.try_get("username")?,
                    secret: HashedClientSecret(row.try_get("secret_hash")?),
                })
            })
            .transpose()?)
    }

    async fn put_resource_server(
        &self,
        username: String,
        secret: HashedClientSecret,
    ) -> Result<ResourceServer, Error> {
        sqlx::query("INSERT INTO resource_servers(username, secret_hash) VALUES(?, ?)")
            .bind(&username)
            .bind(&secret.0)
            .execute(&self.pool)
            .await?;

        Ok(ResourceServer { username, secret })
    }

    async fn store_code(&self, data: AuthCodeData) -> Result<(), Error> {
        let invalid_after: i64 = AuthCodeData::expiry().into();

        sqlx::query(
            "INSERT INTO codes(code, client_id, redirect_uri, subject, scope, nonce, invalid_after)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.code.0)
        .bind(&data.client_id.0)
        .bind(&data.redirect_uri.0)
        .bind(&data.subject)
        .bind(data.scope.as_joined())
        .bind(data.nonce.as_ref().map(|n| n.0.clone()))
        .bind(invalid_after)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn take_authcode_data(
        &self,
        client_id: &ClientId,
        code: &HashedAuthCode,
    ) -> Result<Option<AuthCodeData>, Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT * FROM codes WHERE client_id = ? AND code = ? AND invalid_after > ?",
        )
        .bind(&client_id.0)
        .bind(&code.0)
        .bind(unix_time_now())
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM codes WHERE client_id = ? AND code = ?")
            .bind(&client_id.0)
            .bind(&code.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let data = row
            .map(|row| -> Result<AuthCodeData, sqlx::Error> {
                Ok(AuthCodeData {
                    code: HashedAuthCode(row.try_get("code")?),
                    client_id: ClientId(row.try_get("client_id")?),
                    redirect_uri: RedirectUri(row.try_get("redirect_uri")?),
                    subject: row.try_get("subject")?,
                    scope: Scope::from_delimited_parts(&row.try_get::<String, _>("scope")?),
                    nonce: row.try_get::<Option<String>, _>("nonce")?.map(Nonce),
                })
            })
            .transpose()?;

        Ok(data)
    }

    async fn put_access_token(&self, record: &AccessTokenRecord) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO access_tokens(token, client_id, subject, scope, invalid_after)
             VALUES(?, ?, ?, ?, ?)",
        )
        .bind(&record.token.0)
        .bind(&record.client_id.0)
        .bind(&record.subject)
        .bind(record.scope.as_ref().map(Scope::as_joined))
        .bind(record.invalid_after)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_access_token(
        &self,
        token: &TokenId,
    ) -> Result<Option<AccessTokenRecord>, Error> {
        let row = sqlx::query("SELECT * FROM access_tokens WHERE token = ?")
            .bind(&token.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::access_token_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_superseded_tokens(&self, found: &AccessTokenRecord) -> Result<u64, Error> {
        // Strictly-earlier expiry only, and never the record just matched.
        let result = match &found.subject {
            Some(subject) => {
                sqlx::query(
                    "DELETE FROM access_tokens
                     WHERE subject = ? AND invalid_after < ? AND token != ?",
                )
                .bind(subject)
                .bind(found.invalid_after)
                .bind(&found.token.0)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "DELETE FROM access_tokens
                     WHERE subject IS NULL AND invalid_after < ? AND token != ?",
                )
                .bind(found.invalid_after)
                .bind(&found.token.0)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn put_refresh_token(&self, data: &RefreshTokenData) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO refresh_tokens(token, client_id, subject, scope, invalid_after)
             VALUES(?, ?, ?, ?, ?)",
        )
        .bind(&data.token.0)
        .bind(&data.client_id.0)
        .bind(&data.subject)
        .bind(data.scope.as_ref().map(Scope::as_joined))
        .bind(data.invalid_after)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token: &RefreshTokenId,
    ) -> Result<Option<RefreshTokenData>, Error> {
        let row = sqlx::query("SELECT * FROM refresh_tokens WHERE token = ?")
            .bind(&token.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::refresh_token_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_refresh_token(&self, token: &RefreshTokenId) -> Result<(), Error> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(&token.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clean_up(&self) -> Result<(), Error> {
        let time = unix_time_now();

        sqlx::query("DELETE FROM codes WHERE invalid_after <= ?")
            .bind(time)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM access_tokens WHERE invalid_after <= ?")
            .bind(time)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE invalid_after <= ?")
            .bind(time)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
