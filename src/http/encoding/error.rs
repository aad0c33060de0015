use crate::auth::AccessTokenError;
use crate::provider::Error;
use warp::{Rejection, Reply};

#[derive(Debug, Clone)]
pub enum AuthRejection {
    AccessToken(AccessTokenError),
    Unauthorized,
    BadRequest,
}

impl warp::reject::Reject for AuthRejection {}

impl From<AccessTokenError> for AuthRejection {
    fn from(error: AccessTokenError) -> Self {
        Self::AccessToken(error)
    }
}

impl From<Error> for AuthRejection {
    fn from(error: Error) -> Self {
        match error {
            Error::Unauthorized => Self::Unauthorized,
            _ => Self::BadRequest,
        }
    }
}

pub async fn handle_reject(err: Rejection) -> Result<impl Reply, Rejection> {
    match err.find::<AuthRejection>() {
        Some(e) => {
            let e = e.clone();
            match e {
                AuthRejection::AccessToken(e) => {
                    let resp = warp::reply::json(&e);
                    Ok(
                        warp::reply::with_status(resp, warp::http::StatusCode::BAD_REQUEST)
                            .into_response(),
                    )
                }
                AuthRejection::Unauthorized => {
                    let resp = warp::reply::json(&serde_json::json!({
                        "error": "unauthorized"
                    }));
                    Ok(
                        warp::reply::with_status(resp, warp::http::StatusCode::UNAUTHORIZED)
                            .into_response(),
                    )
                }
                AuthRejection::BadRequest => Ok(warp::reply::with_status(
                    warp::reply(),
                    warp::http::StatusCode::BAD_REQUEST,
                )
                .into_response()),
            }
        }
        _ => Err(err),
    }
}
