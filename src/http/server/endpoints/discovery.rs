use std::sync::Arc;

use warp::Filter;

use crate::provider::OAuth2Provider;

/// Publishes the verification key set at the usual well-known location.
pub fn discovery_endpoint(
    provider: Arc<OAuth2Provider>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_provider = warp::any().map(move || provider.clone());

    warp::path(".well-known")
        .and(warp::path("jwks.json"))
        .and(warp::get())
        .and(with_provider)
        .and_then(|provider: Arc<OAuth2Provider>| async move {
            Ok::<_, warp::Rejection>(warp::reply::json(provider.key_set()))
        })
}
