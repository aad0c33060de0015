use crate::core::types::{AuthCode, RefreshTokenId, TokenId};
use crate::util::hash::Salt;

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for AuthCode {
    fn from_random() -> Self {
        AuthCode(random_string(64))
    }
}

impl FromRandom for TokenId {
    fn from_random() -> Self {
        TokenId(random_string(32))
    }
}

impl FromRandom for RefreshTokenId {
    fn from_random() -> Self {
        let bytes: [u8; 32] = rand::random();
        RefreshTokenId(hex::encode(bytes))
    }
}

impl FromRandom for Salt {
    fn from_random() -> Self {
        Salt(random_string(16))
    }
}

fn random_string(size: usize) -> String {
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(size)
        .map(|b| b as char)
        .collect()
}
