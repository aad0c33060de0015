use std::sync::Arc;
use warp::Filter;

use crate::provider::OAuth2Provider;

mod endpoints;

use endpoints::{discovery::discovery_endpoint, oauth::oauth_endpoint};

use super::encoding::error::handle_reject;

#[derive(Debug)]
pub struct Server {
    provider: Arc<OAuth2Provider>,
}

impl Server {
    pub fn new(provider: Arc<OAuth2Provider>) -> Self {
        Self {
            provider: Arc::clone(&provider),
        }
    }

    pub fn routes(
        provider: Arc<OAuth2Provider>,
    ) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let oauth = warp::path("oauth").and(oauth_endpoint(provider.clone()));
        let discovery = discovery_endpoint(provider);

        oauth
            .or(discovery)
            .recover(handle_reject)
            .with(warp::log("http-api"))
    }

    pub async fn serve(self) -> Option<()> {
        let routes = Self::routes(self.provider);

        warp::serve(routes).run(([0, 0, 0, 0], 8090)).await;

        Some(())
    }
}
