// The fetching capability: one scoped browsing session per top-level request

use crate::artifact::PageArtifact;
use crate::cookies::SessionCookie;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// How long to wait before the page counts as loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// No network activity for a short idle window.
    NetworkIdle,
    /// The document has been parsed.
    DomContentLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Root page plus its first ring of links.
    Batch,
    /// A single drilled page.
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
    pub screenshot: bool,
}

impl Navigation {
    pub fn root(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::NetworkIdle,
            timeout,
            screenshot: true,
        }
    }

    /// Child-ring pages only need their title and links.
    pub fn ring(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::DomContentLoaded,
            timeout,
            screenshot: false,
        }
    }
}

/// Opens browsing sessions. Cookies are installed before the session is handed out.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn open_session(
        &self,
        kind: SessionKind,
        cookies: &[SessionCookie],
    ) -> Result<Box<dyn FetchSession>>;
}

/// A live session. `fetch` may be called concurrently for different URLs.
#[async_trait]
pub trait FetchSession: Send + Sync {
    async fn fetch(&self, url: &Url, navigation: &Navigation) -> Result<PageArtifact>;

    /// Releases the session and everything it owns.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Extra time `navigate` allows past the navigation timeout, so a session that bounds its own
/// fetch can clean up before the outer deadline drops it.
pub const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

fn timed_out(url: &Url, navigation: &Navigation) -> FetchError {
    FetchError::Timeout {
        url: url.to_string(),
        after: navigation.timeout,
    }
}

/// Runs `work` within the navigation timeout. Sessions wrap their page work in this and release
/// per-page resources after it returns, whichever way it ends.
pub async fn within_timeout<T, F>(url: &Url, navigation: &Navigation, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(navigation.timeout, work)
        .await
        .map_err(|_| timed_out(url, navigation))?
}

/// Fetches through `session`, bounded by the navigation timeout plus [`TEARDOWN_GRACE`].
pub async fn navigate(
    session: &dyn FetchSession,
    url: &Url,
    navigation: &Navigation,
) -> Result<PageArtifact> {
    debug!("Navigating to {} ({:?})", url, navigation.wait_until);
    let start = Instant::now();
    let backstop = navigation.timeout + TEARDOWN_GRACE;
    match tokio::time::timeout(backstop, session.fetch(url, navigation)).await {
        Ok(Ok(mut artifact)) => {
            artifact.load_time = start.elapsed();
            Ok(artifact)
        }
        Ok(Err(e)) if e.is_timeout() => Err(timed_out(url, navigation)),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!("Session ignored the timeout for {}, dropping the fetch", url);
            Err(timed_out(url, navigation))
        }
    }
}

/// Closes a session, logging instead of failing. Call on every exit path.
pub async fn release(session: Box<dyn FetchSession>) {
    if let Err(e) = session.close().await {
        warn!("Failed to tear down browsing session: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stands in for a browser tab: work that never finishes, then a per-page close.
    struct StalledSession {
        pages_closed: AtomicUsize,
    }

    #[async_trait]
    impl FetchSession for StalledSession {
        async fn fetch(&self, url: &Url, navigation: &Navigation) -> Result<PageArtifact> {
            let result = within_timeout(url, navigation, std::future::pending()).await;
            self.pages_closed.fetch_add(1, Ordering::SeqCst);
            result
        }

        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_timeout_expires() {
        let url = Url::parse("https://example.com/slow").unwrap();
        let navigation = Navigation::ring(Duration::from_secs(3));
        let result: Result<()> = within_timeout(&url, &navigation, std::future::pending()).await;
        match result {
            Err(FetchError::Timeout { url, after }) => {
                assert_eq!(url, "https://example.com/slow");
                assert_eq!(after, Duration::from_secs(3));
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_timeout_passes_through_errors() {
        let url = Url::parse("https://example.com/").unwrap();
        let navigation = Navigation::ring(Duration::from_secs(3));
        let result: Result<()> = within_timeout(&url, &navigation, async {
            Err(FetchError::InvalidUrl("nope".to_string()))
        })
        .await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_fetch_still_closes_its_page() {
        let session = StalledSession {
            pages_closed: AtomicUsize::new(0),
        };
        let url = Url::parse("https://example.com/hang").unwrap();
        let navigation = Navigation::root(Duration::from_secs(5));

        let err = navigate(&session, &url, &navigation).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("after 5s"));
        assert_eq!(session.pages_closed.load(Ordering::SeqCst), 1);
    }

    struct StubbornSession {
        close_attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FetchSession for StubbornSession {
        async fn fetch(&self, url: &Url, _navigation: &Navigation) -> Result<PageArtifact> {
            Ok(PageArtifact::new(url.to_string()))
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.close_attempts.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::LaunchError("browser already gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_release_swallows_close_failure() {
        let close_attempts = Arc::new(AtomicUsize::new(0));
        release(Box::new(StubbornSession {
            close_attempts: close_attempts.clone(),
        }))
        .await;
        assert_eq!(close_attempts.load(Ordering::SeqCst), 1);
    }
}
