// Session cookie intake and normalization

use crate::error::{FetchError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// A pre-obtained session cookie, in the shape browser cookie exporters emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Anything unrecognized maps to `Lax`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "lax" => SameSite::Lax,
            "none" | "no_restriction" => SameSite::None,
            _ => SameSite::Lax,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A cookie ready to be installed into a browsing session.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub same_site: Option<SameSite>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub expires: Option<f64>,
}

impl NormalizedCookie {
    /// `Set-Cookie` style header line for cookie-jar based sessions.
    pub fn to_header(&self) -> String {
        let mut header = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if self.secure == Some(true) {
            header.push_str("; Secure");
        }
        if self.http_only == Some(true) {
            header.push_str("; HttpOnly");
        }
        if let Some(same_site) = self.same_site {
            header.push_str("; SameSite=");
            header.push_str(same_site.as_str());
        }
        header
    }

    /// URL the cookie is scoped to, used when seeding a cookie jar.
    pub fn scope_url(&self) -> Option<Url> {
        let host = self.domain.trim_start_matches('.');
        let scheme = if self.secure == Some(true) { "https" } else { "http" };
        Url::parse(&format!("{}://{}{}", scheme, host, self.path)).ok()
    }
}

impl SessionCookie {
    pub fn normalize(&self) -> Result<NormalizedCookie> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FetchError::InvalidCookie("cookie name is empty".to_string()));
        }
        if name.contains(['=', ';']) {
            return Err(FetchError::InvalidCookie(format!(
                "cookie name '{}' contains a reserved character",
                name
            )));
        }
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(FetchError::InvalidCookie(format!(
                "cookie '{}' has no domain",
                name
            )));
        }

        let path = match self.path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => "/".to_string(),
        };

        Ok(NormalizedCookie {
            name: name.to_string(),
            value: self.value.clone(),
            domain: domain.to_string(),
            path,
            same_site: self.same_site.as_deref().map(SameSite::parse),
            secure: self.secure,
            http_only: self.http_only,
            expires: self.expiration_date,
        })
    }
}

/// Validates and normalizes a whole cookie payload. One bad cookie rejects the payload.
pub fn normalize_cookies(cookies: &[SessionCookie]) -> Result<Vec<NormalizedCookie>> {
    cookies.iter().map(SessionCookie::normalize).collect()
}
