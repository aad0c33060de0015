use super::TokenKind;

impl TokenKind {
    pub fn cookie_name(&self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
            TokenKind::Id => "id_token",
        }
    }

    /// Cookie lifetime per token type. The access-token cookie expires with
    /// the token itself, so "token expired" shows up as "cookie missing".
    pub fn cookie_max_age(&self) -> u64 {
        match self {
            TokenKind::Access => 60 * 2,
            TokenKind::Refresh => 60 * 60 * 24 * 30,
            TokenKind::Id => 60 * 10,
        }
    }
}

/// Parameters for storing a token value as an HTTP cookie. Actual cookie
/// handling belongs to the hosting framework; this only decides attributes.
#[derive(Debug, Clone)]
pub struct CookieSpec {
    pub name: &'static str,
    pub value: String,
    pub max_age: u64,
    pub http_only: bool,
    pub same_site_lax: bool,
    // Off so the reference setup works without TLS; anything real wants it.
    pub secure: bool,
}

pub fn cookie_for(kind: TokenKind, value: String) -> CookieSpec {
    CookieSpec {
        name: kind.cookie_name(),
        value,
        max_age: kind.cookie_max_age(),
        http_only: true,
        same_site_lax: true,
        secure: false,
    }
}

impl CookieSpec {
    pub fn to_set_cookie(&self) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, self.value),
            format!("Max-Age={}", self.max_age),
        ];
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if self.same_site_lax {
            parts.push("SameSite=Lax".to_string());
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        parts.join("; ")
    }
}
