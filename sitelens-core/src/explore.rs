// Batch and drill request pipelines

use crate::analysis::{PageAnalysis, SiteAnalysis, format_duration};
use crate::config::ExploreConfig;
use crate::dom::{DomSummarizer, DomSummary};
use crate::error::{ExploreError, Result};
use crate::grouping::ChildLink;
use crate::page_detail::{self, PageDetail};
use crate::scripts::{self, JsArchitecture};
use crate::sitemap::{RingPage, SitemapBuilder};
use crate::tracking::{self, TrackingReport};
use crate::tree::{DrillTicket, ExplorationTree, Opened};
use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use sitelens_fetcher::links::filter_same_origin;
use sitelens_fetcher::session::{navigate, release};
use sitelens_fetcher::{
    FetchSession, LinkRecord, Navigation, PageArtifact, PageFetcher, SessionCookie, SessionKind,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Callback for human-readable progress messages
pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// What a drill request did to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillOutcome {
    /// Nothing was fetched.
    Toggled { expanded: bool },
    Analyzed { node_id: String, children: usize },
}

/// Accepts absolute `http`/`https` URLs only.
pub fn parse_target(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ExploreError::InvalidInput(format!("'{}' is not a valid URL: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExploreError::InvalidInput(format!(
            "'{}' must use http or https",
            raw
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ExploreError::InvalidInput(format!("'{}' has no host", raw)));
    }
    Ok(url)
}

/// First `cap` same-origin links, titled by link text or path.
pub fn child_links(links: &[LinkRecord], origin: &Url, cap: usize) -> Vec<ChildLink> {
    filter_same_origin(links, origin)
        .into_iter()
        .take(cap)
        .map(|link| ChildLink {
            title: if link.text.is_empty() {
                link.path.clone()
            } else {
                link.text
            },
            url: link.url,
            path: link.path,
        })
        .collect()
}

struct Derived {
    dom_tree: DomSummary,
    page_detail: PageDetail,
    js_architecture: JsArchitecture,
}

/// Runs the three analyzers on blocking workers. Each parses its own copy of the document.
async fn derive_artifacts(artifact: &PageArtifact, url: &Url, max_depth: usize) -> Result<Derived> {
    let markup: Arc<str> = Arc::from(artifact.markup.as_str());

    let dom_markup = Arc::clone(&markup);
    let dom = tokio::task::spawn_blocking(move || {
        DomSummarizer::new(max_depth).summarize(&dom_markup)
    });

    let detail_url = url.clone();
    let detail = tokio::task::spawn_blocking(move || page_detail::extract(&markup, &detail_url));

    let script_tags = artifact.scripts.clone();
    let hints = artifact.framework_hints;
    let js = tokio::task::spawn_blocking(move || scripts::analyze(&script_tags, &hints));

    let (dom_tree, page_detail, js_architecture) = tokio::try_join!(dom, detail, js)?;
    Ok(Derived {
        dom_tree,
        page_detail,
        js_architecture,
    })
}

async fn track_elements(artifact: &PageArtifact, url: &Url) -> Result<TrackingReport> {
    let markup = artifact.markup.clone();
    let base = url.clone();
    Ok(tokio::task::spawn_blocking(move || tracking::analyze(&markup, &base)).await?)
}

pub struct Explorer {
    fetcher: Arc<dyn PageFetcher>,
    config: ExploreConfig,
    progress: Option<ProgressCallback>,
}

impl Explorer {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            config: ExploreConfig::default(),
            progress: None,
        }
    }

    pub fn with_config(mut self, config: ExploreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &ExploreConfig {
        &self.config
    }

    fn report(&self, message: impl Into<String>) {
        if let Some(ref callback) = self.progress {
            callback(message.into());
        }
    }

    /// Root page plus first ring. A root failure fails the whole request.
    pub async fn analyze_site(&self, url: &str, cookies: &[SessionCookie]) -> Result<SiteAnalysis> {
        let root = parse_target(url)?;
        let start = Instant::now();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        info!("Starting batch analysis of {}", root);

        let session = self
            .fetcher
            .open_session(SessionKind::Batch, cookies)
            .await
            .map_err(ExploreError::from_session)?;
        let outcome = self.run_batch(session.as_ref(), &root).await;
        release(session).await;
        let (artifact, derived, ring, ring_links) = outcome?;

        let sitemap = SitemapBuilder::new(self.config.sitemap_page_cap).build(
            &root,
            &artifact.title,
            &ring,
            &ring_links,
        );

        let duration = format_duration(start.elapsed());
        info!("Finished batch analysis of {} in {}", root, duration);
        self.report(format!("Analysis complete in {}", duration));

        Ok(SiteAnalysis {
            url: root.to_string(),
            timestamp,
            duration,
            title: artifact.title,
            dom_tree: derived.dom_tree,
            sitemap,
            js_architecture: derived.js_architecture,
            root_page_detail: derived.page_detail,
            root_screenshot: artifact.screenshot,
        })
    }

    async fn run_batch(
        &self,
        session: &dyn FetchSession,
        root: &Url,
    ) -> Result<(PageArtifact, Derived, Vec<RingPage>, Vec<LinkRecord>)> {
        self.report(format!("Loading {}", root));
        let artifact = navigate(session, root, &Navigation::root(self.config.root_timeout))
            .await
            .map_err(|source| ExploreError::RootNavigation {
                url: root.to_string(),
                source,
            })?;
        debug!(
            "Root loaded in {:?} with {} links",
            artifact.load_time,
            artifact.links.len()
        );

        let ring_links = filter_same_origin(&artifact.links, root);
        let to_fetch = &ring_links[..ring_links.len().min(self.config.ring_size)];
        self.report(format!("Fetching {} linked pages", to_fetch.len()));

        let ring_navigation = Navigation::ring(self.config.ring_timeout);
        let ring = join_all(
            to_fetch
                .iter()
                .map(|link| fetch_ring_page(session, link, &ring_navigation)),
        );
        let analysis = derive_artifacts(&artifact, root, self.config.dom_max_depth);

        let (ring, derived) = tokio::join!(ring, analysis);
        let derived = derived?;

        Ok((artifact, derived, ring, ring_links))
    }

    /// Single page with its same-origin children. `origin` defaults to the page's own.
    pub async fn analyze_page(
        &self,
        url: &str,
        cookies: &[SessionCookie],
        origin: Option<&Url>,
    ) -> Result<PageAnalysis> {
        let target = parse_target(url)?;
        let start = Instant::now();
        info!("Analyzing page {}", target);

        let session = self
            .fetcher
            .open_session(SessionKind::Single, cookies)
            .await
            .map_err(ExploreError::from_session)?;
        let fetched = navigate(
            session.as_ref(),
            &target,
            &Navigation::root(self.config.root_timeout),
        )
        .await;
        release(session).await;
        let artifact = fetched.map_err(|source| ExploreError::RootNavigation {
            url: target.to_string(),
            source,
        })?;

        let derived = derive_artifacts(&artifact, &target, self.config.dom_max_depth).await?;
        let tracking = if self.config.track_elements {
            Some(track_elements(&artifact, &target).await?)
        } else {
            None
        };
        let child_links = child_links(
            &artifact.links,
            origin.unwrap_or(&target),
            self.config.child_link_cap,
        );

        let duration = format_duration(start.elapsed());
        info!(
            "Finished {} in {} with {} child links",
            target,
            duration,
            child_links.len()
        );

        Ok(PageAnalysis {
            url: target.to_string(),
            title: artifact.title,
            page_detail: derived.page_detail,
            dom_tree: derived.dom_tree,
            js_architecture: derived.js_architecture,
            child_links,
            screenshot: artifact.screenshot,
            tracking,
            duration,
        })
    }

    /// Batch request plus a tree seeded from it.
    pub async fn explore(
        &self,
        url: &str,
        cookies: &[SessionCookie],
    ) -> Result<(SiteAnalysis, ExplorationTree)> {
        let site = self.analyze_site(url, cookies).await?;
        let tree = ExplorationTree::from_batch(&site, &self.config)?;
        Ok((site, tree))
    }

    /// Drills into an unanalyzed page. The lock is only held to move the node between states.
    pub async fn drill(
        &self,
        tree: &Mutex<ExplorationTree>,
        id: &str,
        cookies: &[SessionCookie],
    ) -> Result<DrillOutcome> {
        let (ticket, origin) = {
            let mut guard = tree.lock().await;
            let ticket = guard.begin_drill(id)?;
            (ticket, guard.root_url().clone())
        };
        self.run_drill(tree, ticket, origin, cookies).await
    }

    /// Click semantics: drill if unanalyzed, otherwise toggle without fetching.
    pub async fn open(
        &self,
        tree: &Mutex<ExplorationTree>,
        id: &str,
        cookies: &[SessionCookie],
    ) -> Result<DrillOutcome> {
        let (ticket, origin) = {
            let mut guard = tree.lock().await;
            match guard.open(id)? {
                Opened::Toggled { expanded } => return Ok(DrillOutcome::Toggled { expanded }),
                Opened::Drill(ticket) => (ticket, guard.root_url().clone()),
            }
        };
        self.run_drill(tree, ticket, origin, cookies).await
    }

    async fn run_drill(
        &self,
        tree: &Mutex<ExplorationTree>,
        ticket: DrillTicket,
        origin: Url,
        cookies: &[SessionCookie],
    ) -> Result<DrillOutcome> {
        let fetched = self
            .analyze_page(ticket.url().as_str(), cookies, Some(&origin))
            .await;

        let mut guard = tree.lock().await;
        match fetched {
            Ok(analysis) => {
                let node = guard.complete_drill(ticket, analysis)?;
                Ok(DrillOutcome::Analyzed {
                    node_id: node.id.clone(),
                    children: node.children.len(),
                })
            }
            Err(e) => {
                warn!("Drill into {} failed: {}", ticket.node_id(), e);
                guard.fail_drill(ticket)?;
                Err(e)
            }
        }
    }
}

async fn fetch_ring_page(
    session: &dyn FetchSession,
    link: &LinkRecord,
    navigation: &Navigation,
) -> RingPage {
    let url = match Url::parse(&link.url) {
        Ok(url) => url,
        Err(e) => return RingPage::degraded(link, e),
    };
    match navigate(session, &url, navigation).await {
        Ok(artifact) => RingPage::loaded(link, artifact.title),
        Err(e) => {
            warn!("Linked page {} failed to load: {}", link.url, e);
            RingPage::degraded(link, e)
        }
    }
}
