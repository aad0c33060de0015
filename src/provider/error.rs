#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad request")]
    BadRequest,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid key material")]
    BadKeyMaterial,
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("database error")]
    Db(#[from] sqlx::Error),
}
