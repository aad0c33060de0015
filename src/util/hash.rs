use crate::core::types::{AuthCode, ClientSecret, HashedAuthCode, HashedClientSecret};

use base64::{engine::general_purpose::URL_SAFE, Engine};

use super::random::FromRandom;

#[derive(Debug)]
pub struct Salt(pub String);

pub struct HashingService {
    secret_key: String,
}

impl std::fmt::Debug for HashingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HashingService {{ ... }}")
    }
}

pub trait HashTo: AsRef<str> {
    type HashedType;
}

impl HashTo for ClientSecret {
    type HashedType = HashedClientSecret;
}

impl HashTo for AuthCode {
    type HashedType = HashedAuthCode;
}

impl HashingService {
    pub fn with_secret_key(secret_key: String) -> Self {
        Self { secret_key }
    }

    fn get_config(&self) -> argon2::Config {
        let mut config = argon2::Config::default();
        config.secret = self.secret_key.as_bytes();
        config
    }

    pub fn hash<T, H>(&self, to_hash: &T) -> Result<H, argon2::Error>
    where
        T: HashTo<HashedType = H>,
        H: From<String>,
    {
        let salt = Salt::from_random();
        let hash = argon2::hash_encoded(
            to_hash.as_ref().as_bytes(),
            salt.0.as_bytes(),
            &self.get_config(),
        )?;

        Ok(hash.into())
    }

    pub fn verify<T, H>(&self, secret: &T, hashed: &H) -> Result<bool, argon2::Error>
    where
        T: HashTo<HashedType = H>,
        H: AsRef<str>,
    {
        argon2::verify_encoded_ext(
            hashed.as_ref(),
            secret.as_ref().as_bytes(),
            self.secret_key.as_bytes(),
            &[],
        )
    }

    /// Unsalted digest, for values that must be looked up by equality
    /// (authorization codes).
    pub fn hash_without_salt<T, H>(&self, to_hash: &T) -> H
    where
        T: HashTo<HashedType = H>,
        H: From<String>,
    {
        use sha2::Digest;

        let digest = sha2::Sha512::digest(to_hash.as_ref().as_bytes());
        let hash = URL_SAFE.encode(digest);
        hash.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hasher = HashingService::with_secret_key("pepper".to_string());
        let secret = ClientSecret("password123".to_string());

        let hashed: HashedClientSecret = hasher.hash(&secret).unwrap();
        assert!(hasher.verify(&secret, &hashed).unwrap());

        let wrong = ClientSecret("password124".to_string());
        assert!(!hasher.verify(&wrong, &hashed).unwrap());
    }

    #[test]
    fn unsalted_hash_is_deterministic() {
        let hasher = HashingService::with_secret_key("pepper".to_string());
        let code = AuthCode("a-code".to_string());

        let first: HashedAuthCode = hasher.hash_without_salt(&code);
        let second: HashedAuthCode = hasher.hash_without_salt(&code);
        assert_eq!(first.0, second.0);
    }
}
