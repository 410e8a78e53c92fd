// Headless Chromium fetcher

use crate::artifact::{FrameworkHints, PageArtifact};
use crate::cookies::{NormalizedCookie, SameSite, SessionCookie, normalize_cookies};
use crate::error::{FetchError, Result};
use crate::http::artifact_from_markup;
use crate::probes::FRAMEWORK_PROBE_SCRIPT;
use crate::session::{
    FetchSession, Navigation, PageFetcher, SessionKind, WaitUntil, release, within_timeout,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

pub const CHROME_PATH_ENV: &str = "SITELENS_CHROME";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

// True once the navigated document has been parsed, not the about:blank it replaced.
const DOM_READY_SCRIPT: &str =
    "document.readyState !== 'loading' && location.href !== 'about:blank'";

const NETWORK_IDLE_SCRIPT: &str = r#"
(() => ({
    readyState: document.readyState,
    resources: performance.getEntriesByType('resource').length
}))()
"#;

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub executable: Option<PathBuf>,
    pub batch_viewport: (u32, u32),
    pub single_viewport: (u32, u32),
    pub screenshot_quality: i64,
    /// Quiet period that counts as network idle.
    pub idle_window: Duration,
    pub settle_delay: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            executable: None,
            batch_viewport: (1920, 1080),
            single_viewport: (1440, 900),
            screenshot_quality: 70,
            idle_window: Duration::from_millis(500),
            settle_delay: true,
        }
    }
}

impl BrowserOptions {
    /// Defaults, with the executable taken from `SITELENS_CHROME` when set.
    pub fn from_env() -> Self {
        let executable = std::env::var(CHROME_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .filter(|p| p.exists());
        Self {
            executable,
            ..Self::default()
        }
    }

    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.executable = Some(path);
        self
    }
}

fn same_site_param(same_site: SameSite) -> CookieSameSite {
    match same_site {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    }
}

fn cookie_param(cookie: &NormalizedCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = cookie.secure;
    param.http_only = cookie.http_only;
    param.same_site = cookie.same_site.map(same_site_param);
    param.expires = cookie.expires.map(TimeSinceEpoch::new);
    param
}

pub struct ChromiumFetcher {
    options: BrowserOptions,
}

impl ChromiumFetcher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

impl Default for ChromiumFetcher {
    fn default() -> Self {
        Self::new(BrowserOptions::from_env())
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn open_session(
        &self,
        kind: SessionKind,
        cookies: &[SessionCookie],
    ) -> Result<Box<dyn FetchSession>> {
        let cookies = normalize_cookies(cookies)?;

        let (width, height) = match kind {
            SessionKind::Batch => self.options.batch_viewport,
            SessionKind::Single => self.options.single_viewport,
        };
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let profile_dir = tempfile::Builder::new().prefix("sitelens-").tempdir()?;

        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Default::default()
            })
            .user_data_dir(profile_dir.path())
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", user_agent));
        if let Some(ref path) = self.options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(FetchError::LaunchError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::LaunchError(e.to_string()))?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let session = ChromiumSession {
            browser,
            handler,
            profile_dir,
            options: self.options.clone(),
        };

        if !cookies.is_empty() {
            let params = cookies.iter().map(cookie_param).collect::<Vec<_>>();
            if let Err(e) = session.browser.set_cookies(params).await {
                release(Box::new(session)).await;
                return Err(e.into());
            }
            info!("Injected {} cookies into session", cookies.len());
        }

        Ok(Box::new(session))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: TempDir,
    options: BrowserOptions,
}

impl ChromiumSession {
    async fn settle(&self, navigation: &Navigation) {
        if !self.options.settle_delay {
            return;
        }
        let millis = match navigation.wait_until {
            WaitUntil::NetworkIdle => rand::thread_rng().gen_range(100..500),
            WaitUntil::DomContentLoaded => rand::thread_rng().gen_range(50..200),
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Polls until the document is complete and no new resources arrive for the idle window.
    /// Gives up quietly at `deadline`.
    async fn wait_for_network_idle(&self, page: &Page, deadline: Instant) {
        let poll = Duration::from_millis(100);
        let mut last_count = None;
        let mut quiet_since = Instant::now();

        while Instant::now() < deadline {
            let state = match page.evaluate(NETWORK_IDLE_SCRIPT).await {
                Ok(result) => result.into_value::<serde_json::Value>().ok(),
                Err(e) => {
                    debug!("Idle probe failed: {}", e);
                    None
                }
            };
            if let Some(state) = state {
                let complete = state.get("readyState").and_then(|v| v.as_str()) == Some("complete");
                let count = state.get("resources").and_then(|v| v.as_u64());
                if count != last_count {
                    last_count = count;
                    quiet_since = Instant::now();
                } else if complete && quiet_since.elapsed() >= self.options.idle_window {
                    return;
                }
            }
            tokio::time::sleep(poll).await;
        }
        warn!("Network never went idle, continuing with current page state");
    }

    /// Unbounded; `fetch` runs it under the navigation timeout.
    async fn wait_for_dom_ready(&self, page: &Page) {
        loop {
            match page.evaluate(DOM_READY_SCRIPT).await {
                Ok(result) if result.clone().into_value::<bool>().unwrap_or(false) => return,
                Ok(_) => {}
                Err(e) => debug!("Ready-state check failed: {}", e),
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// `goto` returns at the load event, so DOMContentLoaded issues `Page.navigate` directly and
    /// polls the ready state instead.
    async fn load(&self, page: &Page, url: &Url, navigation: &Navigation) -> Result<()> {
        match navigation.wait_until {
            WaitUntil::NetworkIdle => {
                let start = Instant::now();
                page.goto(url.as_str()).await?;
                let budget = navigation.timeout.saturating_sub(Duration::from_secs(2));
                self.wait_for_network_idle(page, start + budget).await;
            }
            WaitUntil::DomContentLoaded => {
                let response = page.execute(NavigateParams::new(url.as_str())).await?;
                if let Some(reason) = response.result.error_text.clone() {
                    return Err(FetchError::NavigationFailed {
                        url: url.to_string(),
                        reason,
                    });
                }
                self.wait_for_dom_ready(page).await;
            }
        }
        Ok(())
    }

    async fn capture(&self, page: &Page, url: &Url, navigation: &Navigation) -> Result<PageArtifact> {
        self.load(page, url, navigation).await?;
        self.settle(navigation).await;

        let markup = page.content().await?;
        let title = page.get_title().await?.unwrap_or_default();
        let base = page
            .url()
            .await?
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        let runtime_hints = match page.evaluate(FRAMEWORK_PROBE_SCRIPT).await {
            Ok(result) => result.into_value::<FrameworkHints>().unwrap_or_default(),
            Err(e) => {
                debug!("Framework probe failed on {}: {}", url, e);
                FrameworkHints::default()
            }
        };

        let screenshot = if navigation.screenshot {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Jpeg)
                .quality(self.options.screenshot_quality)
                .full_page(false)
                .build();
            Some(STANDARD.encode(page.screenshot(params).await?))
        } else {
            None
        };

        let mut artifact = artifact_from_markup(url, &base, markup);
        artifact.title = title;
        artifact.framework_hints = artifact.framework_hints.merge(runtime_hints);
        artifact.screenshot = screenshot;
        Ok(artifact)
    }
}

#[async_trait]
impl FetchSession for ChromiumSession {
    async fn fetch(&self, url: &Url, navigation: &Navigation) -> Result<PageArtifact> {
        let page = self.browser.new_page("about:blank").await?;
        let result = within_timeout(url, navigation, self.capture(&page, url, navigation)).await;
        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }
        result
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            handler,
            profile_dir,
            ..
        } = *self;

        let result = match browser.close().await {
            Ok(_) => browser.wait().await.map(|_| ()).map_err(FetchError::from),
            Err(e) => Err(FetchError::from(e)),
        };
        handler.abort();
        // Dropping the browser kills the process if close did not get there.
        drop(browser);
        drop(profile_dir);
        result
    }
}
