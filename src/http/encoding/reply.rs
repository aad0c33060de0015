use super::error::AuthRejection;
use warp::reply::Reply;
use warp::Rejection;

pub fn json_encode(
    value: Result<impl serde::Serialize, impl Into<AuthRejection>>,
) -> Result<impl Reply, Rejection> {
    value
        .map(|v| warp::reply::json(&v))
        .map_err(|e| warp::reject::custom::<AuthRejection>(e.into()))
}
