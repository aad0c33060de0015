use std::{
    str::FromStr,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered, de-duplicated set of scope entries. Wire representation is
/// the usual space-delimited string; equality ignores ordering.
#[derive(Debug, Clone, Eq)]
pub struct Scope(Vec<String>);

impl Scope {
    pub fn from_parts(parts: Vec<String>) -> Self {
        let mut entries: Vec<String> = Vec::with_capacity(parts.len());
        for part in parts {
            if !entries.contains(&part) {
                entries.push(part);
            }
        }
        Self(entries)
    }

    pub fn from_delimited_parts(parts: &str) -> Self {
        let parts = parts
            .split(' ')
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect();
        Self::from_parts(parts)
    }

    pub fn as_joined(&self) -> String {
        self.0.join(" ")
    }

    pub fn as_parts(&self) -> Vec<String> {
        self.0.clone()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    pub fn contains_all(&self, other: &Scope) -> bool {
        other.0.iter().all(|s| self.contains(s))
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        let mut lhs = self.as_parts();
        let mut rhs = other.as_parts();
        lhs.sort();
        rhs.sort();
        lhs == rhs
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = String::deserialize(deserializer)?;
        Ok(Self::from_delimited_parts(&parts))
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let joined = self.as_joined();
        serializer.serialize_str(&joined)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl FromStr for ClientId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(pub String);

impl AsRef<str> for ClientSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HashedClientSecret(pub String);

impl From<String> for HashedClientSecret {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for HashedClientSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct RedirectUri(pub String);

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct AuthCode(pub String);

impl AsRef<str> for AuthCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct HashedAuthCode(pub String);

impl From<String> for HashedAuthCode {
    fn from(from: String) -> Self {
        Self(from)
    }
}

/// Unsigned access-token identifier. The store only ever sees this; the
/// signed JWT handed to the caller carries it as the `jti` claim.
#[derive(Debug, Clone, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

/// Opaque refresh-token identifier: random bytes, hex-encoded, never a JWT.
#[derive(Debug, Clone, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct RefreshTokenId(pub String);

pub fn unix_time_now() -> i64 {
    use std::convert::TryInto;

    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("Unix Epoch is in the past.")
        .as_secs()
        .try_into()
        .unwrap_or(i64::MAX)
}

pub struct Expiry(SystemTime);

impl From<Expiry> for i64 {
    fn from(expiry: Expiry) -> i64 {
        use std::convert::TryInto;

        expiry
            .0
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
            .try_into()
            .unwrap_or(0)
    }
}

pub trait Expire {
    const EXPIRES_IN_SECS: u64;

    fn expiry() -> Expiry {
        let time = SystemTime::now()
            .checked_add(Duration::from_secs(Self::EXPIRES_IN_SECS))
            .unwrap_or_else(SystemTime::now);
        Expiry(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_preserves_order_and_dedups() {
        let scope = Scope::from_delimited_parts("admin openid admin profile");
        assert_eq!(scope.as_parts(), vec!["admin", "openid", "profile"]);
        assert_eq!(scope.as_joined(), "admin openid profile");
    }

    #[test]
    fn scope_equality_ignores_order() {
        let lhs = Scope::from_delimited_parts("a b c");
        let rhs = Scope::from_delimited_parts("c b a");
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn scope_containment() {
        let all = Scope::from_delimited_parts("openid admin profile");
        let narrowed = Scope::from_delimited_parts("admin");
        assert!(all.contains_all(&narrowed));
        assert!(!narrowed.contains_all(&all));
    }
}
