use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::{
    pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding},
    traits::PublicKeyParts,
    RsaPrivateKey, RsaPublicKey,
};
use serde::de::DeserializeOwned;

use super::Error;

/// Stable identifier under which the verification key is advertised.
pub const KEY_ID: &str = "public-key";

const RSA_KEY_SIZE: usize = 2048;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub alg: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// Holds both halves of the signing setup: the symmetric secret used for
/// server-issued access JWTs, and the RSA pair whose public half is
/// published through the key-discovery document.
pub struct KeyService {
    symmetric_encoding: EncodingKey,
    symmetric_decoding: DecodingKey,
    key_pair_encoding: EncodingKey,
    key_set: JsonWebKeySet,
}

impl std::fmt::Debug for KeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyService {{ ... }}")
    }
}

impl KeyService {
    pub fn new(secret: &str, rsa_private_pem: &str) -> Result<Self, Error> {
        let private =
            RsaPrivateKey::from_pkcs8_pem(rsa_private_pem).map_err(|_| Error::BadKeyMaterial)?;
        let public = RsaPublicKey::from(&private);

        let key_pair_encoding =
            EncodingKey::from_rsa_pem(rsa_private_pem.as_bytes()).map_err(|_| Error::BadKeyMaterial)?;

        Ok(Self {
            symmetric_encoding: EncodingKey::from_secret(secret.as_bytes()),
            symmetric_decoding: DecodingKey::from_secret(secret.as_bytes()),
            key_pair_encoding,
            key_set: Self::key_set_for(&public),
        })
    }

    /// Mints a fresh RSA private key in PKCS#8 PEM form. Used by the CLI to
    /// provision key material and by tests.
    pub fn generate_pem() -> String {
        let mut rng = rand::rngs::OsRng;
        let private =
            RsaPrivateKey::new(&mut rng, RSA_KEY_SIZE).expect("Failed to generate RSA key");
        private
            .to_pkcs8_pem(LineEnding::LF)
            .expect("Failed to encode RSA key")
            .to_string()
    }

    fn key_set_for(public: &RsaPublicKey) -> JsonWebKeySet {
        let n = URL_SAFE_NO_PAD.encode(public.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public.e().to_bytes_be());

        JsonWebKeySet {
            keys: vec![JsonWebKey {
                kty: "RSA".to_string(),
                key_use: "sig".to_string(),
                kid: KEY_ID.to_string(),
                alg: "RS256".to_string(),
                n,
                e,
            }],
        }
    }

    pub fn key_set(&self) -> &JsonWebKeySet {
        &self.key_set
    }

    pub fn sign_symmetric(&self, claims: &impl serde::Serialize) -> Result<String, Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.symmetric_encoding)
            .map_err(Error::Signing)
    }

    pub fn verify_symmetric<C: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<C, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<C>(token, &self.symmetric_decoding, validation).map(|td| td.claims)
    }

    /// Signs with the advertised key pair; the header carries the key id so
    /// consumers can correlate against the discovery document.
    pub fn sign_with_key_pair(&self, claims: &impl serde::Serialize) -> Result<String, Error> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KEY_ID.to_string());
        jsonwebtoken::encode(&header, claims, &self.key_pair_encoding).map_err(Error::Signing)
    }
}
