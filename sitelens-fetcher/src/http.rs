// Plain HTTP fetcher: no JavaScript, no screenshot

use crate::artifact::PageArtifact;
use crate::cookies::{SessionCookie, normalize_cookies};
use crate::error::{FetchError, Result};
use crate::links::extract_links;
use crate::probes::{detect_framework_hints, extract_scripts, extract_title};
use crate::session::{FetchSession, Navigation, PageFetcher, SessionKind};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Sitelens/0.1 (https://github.com/trapdoorsec/sitelens)";

/// Derives a full artifact from raw markup. `base` is the document URL after redirects.
pub fn artifact_from_markup(url: &Url, base: &Url, markup: String) -> PageArtifact {
    let document = Html::parse_document(&markup);
    let mut artifact = PageArtifact::new(url.to_string());
    artifact.title = extract_title(&document);
    artifact.scripts = extract_scripts(&document);
    artifact.framework_hints = detect_framework_hints(&document);
    artifact.links = extract_links(&document, base);
    artifact.markup = markup;
    artifact
}

pub struct HttpFetcher {
    user_agent: String,
    connect_timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn open_session(
        &self,
        _kind: SessionKind,
        cookies: &[SessionCookie],
    ) -> Result<Box<dyn FetchSession>> {
        let cookies = normalize_cookies(cookies)?;

        let jar = Arc::new(Jar::default());
        for cookie in &cookies {
            let scope = cookie.scope_url().ok_or_else(|| {
                FetchError::InvalidCookie(format!(
                    "cookie '{}' has an unusable domain '{}'",
                    cookie.name, cookie.domain
                ))
            })?;
            jar.add_cookie_str(&cookie.to_header(), &scope);
        }
        if !cookies.is_empty() {
            info!("Injected {} cookies into session", cookies.len());
        }

        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .cookie_provider(jar)
            .connect_timeout(self.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Box::new(HttpSession { client }))
    }
}

pub struct HttpSession {
    client: Client,
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn fetch(&self, url: &Url, navigation: &Navigation) -> Result<PageArtifact> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url.clone())
            .timeout(navigation.timeout)
            .send()
            .await?;
        let final_url = response.url().clone();
        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::NavigationFailed {
                url: url.to_string(),
                reason: format!("server responded with {}", status),
            });
        }
        let body = response.text().await?;

        Ok(artifact_from_markup(url, &final_url, body))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
