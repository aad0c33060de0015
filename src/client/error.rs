#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("failed to reach the authorization server")]
    Transport(#[source] reqwest::Error),
    #[error("key discovery failed with status {0}")]
    KeyDiscovery(reqwest::StatusCode),
    #[error("malformed response from the authorization server")]
    Decode(#[source] reqwest::Error),
    #[error("key set does not contain the expected key")]
    MissingKey,
    #[error("published key could not be rebuilt")]
    BadKey(#[source] jsonwebtoken::errors::Error),
}
