// Tests for the batch and drill pipelines over a scripted fetcher

use async_trait::async_trait;
use sitelens_core::explore::DrillOutcome;
use sitelens_core::report::{node_input, site_inputs};
use sitelens_core::sitemap::{LOAD_FAILED_TITLE, RingStatus};
use sitelens_core::{
    ExplorationTree, ExploreConfig, ExploreError, Explorer, NodeState, NodeType, TreeError,
};
use sitelens_fetcher::cookies::normalize_cookies;
use sitelens_fetcher::error::Result as FetchResult;
use sitelens_fetcher::http::artifact_from_markup;
use sitelens_fetcher::session::within_timeout;
use sitelens_fetcher::{
    FetchError, FetchSession, Navigation, PageArtifact, PageFetcher, SessionCookie, SessionKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

// ============================================================================
// Scripted fetcher
// ============================================================================

#[derive(Clone, Default)]
struct FakePage {
    markup: String,
    delay: Duration,
    fail: bool,
    /// Final URL after redirects, when it differs from the requested one.
    landed_on: Option<String>,
}

#[derive(Default)]
struct Script {
    pages: StdMutex<HashMap<String, FakePage>>,
    navigations: StdMutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Script {
    fn page(&self, url: &str, markup: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FakePage {
                markup: markup.to_string(),
                ..Default::default()
            },
        );
    }

    fn slow(&self, url: &str, markup: &str, delay: Duration) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FakePage {
                markup: markup.to_string(),
                delay,
                ..Default::default()
            },
        );
    }

    fn broken(&self, url: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FakePage {
                fail: true,
                ..Default::default()
            },
        );
    }

    fn redirected(&self, url: &str, landed_on: &str, markup: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FakePage {
                markup: markup.to_string(),
                landed_on: Some(landed_on.to_string()),
                ..Default::default()
            },
        );
    }

    fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    fn count(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| *u == url).count()
    }
}

struct FakeFetcher(Arc<Script>);

struct FakeSession(Arc<Script>);

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn open_session(
        &self,
        _kind: SessionKind,
        cookies: &[SessionCookie],
    ) -> FetchResult<Box<dyn FetchSession>> {
        normalize_cookies(cookies)?;
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession(self.0.clone())))
    }
}

#[async_trait]
impl FetchSession for FakeSession {
    async fn fetch(&self, url: &Url, navigation: &Navigation) -> FetchResult<PageArtifact> {
        self.0.navigations.lock().unwrap().push(url.to_string());
        let page = self.0.pages.lock().unwrap().get(url.as_str()).cloned();
        let Some(page) = page else {
            return Err(FetchError::NavigationFailed {
                url: url.to_string(),
                reason: "no such page".to_string(),
            });
        };
        within_timeout(url, navigation, async {
            if !page.delay.is_zero() {
                tokio::time::sleep(page.delay).await;
            }
            Ok(())
        })
        .await?;
        if page.fail {
            return Err(FetchError::NavigationFailed {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        let base = match &page.landed_on {
            Some(landed_on) => Url::parse(landed_on).unwrap(),
            None => url.clone(),
        };
        let mut artifact = artifact_from_markup(url, &base, page.markup);
        if navigation.screenshot {
            artifact.screenshot = Some("c2NyZWVu".to_string());
        }
        Ok(artifact)
    }

    async fn close(self: Box<Self>) -> FetchResult<()> {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn explorer(script: &Arc<Script>) -> Explorer {
    Explorer::new(Arc::new(FakeFetcher(script.clone())))
}

fn titled(title: &str, body: &str) -> String {
    format!("<html><head><title>{}</title></head><body>{}</body></html>", title, body)
}

const ROOT: &str = "https://example.com/";

fn three_link_site() -> Arc<Script> {
    let script = Arc::new(Script::default());
    script.page(
        ROOT,
        &titled(
            "Home",
            r#"<nav><a href="/about">About</a><a href="/blog">Blog</a></nav>
               <a href="/contact">Contact</a><a href="/about">About again</a>
               <a href="https://twitter.com/example">Twitter</a>"#,
        ),
    );
    script.page("https://example.com/about", &titled("About", ""));
    script.page("https://example.com/blog", &titled("Blog", ""));
    script.page("https://example.com/contact", &titled("Contact", ""));
    script
}

// ============================================================================
// Batch Request Tests
// ============================================================================

#[tokio::test]
async fn test_ring_fetches_only_discovered_links() {
    let script = three_link_site();
    let site = explorer(&script).analyze_site(ROOT, &[]).await.unwrap();

    assert_eq!(script.navigations().len(), 4);
    assert_eq!(script.count(ROOT), 1);
    assert_eq!(site.sitemap.level1.len(), 3);
    assert_eq!(site.sitemap.stats.total_links, 3);
    assert!(site.sitemap.level1.iter().all(|r| r.status == RingStatus::Ok));
    assert_eq!(site.sitemap.tree.children[0].title, "About");
    assert_eq!(site.title, "Home");
    assert_eq!(site.root_page_detail.flow.external_links, 1);
    assert!(site.root_screenshot.is_some());
    assert!(site.duration.ends_with('s'));
    assert_eq!(script.opened.load(Ordering::SeqCst), 1);
    assert_eq!(script.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ring_size_bounds_fan_out() {
    let script = three_link_site();
    let config = ExploreConfig::default().with_ring_size(2);
    let site = explorer(&script)
        .with_config(config)
        .analyze_site(ROOT, &[])
        .await
        .unwrap();
    assert_eq!(script.navigations().len(), 3);
    assert_eq!(site.sitemap.level1.len(), 2);
    // The flat sitemap still lists every discovered page
    assert_eq!(site.sitemap.tree.children.len(), 3);
}

#[tokio::test]
async fn test_slow_ring_page_is_degraded_alone() {
    let script = three_link_site();
    script.slow(
        "https://example.com/blog",
        &titled("Blog", ""),
        Duration::from_secs(5),
    );
    let config = ExploreConfig::default().with_ring_timeout(Duration::from_millis(200));
    let site = explorer(&script)
        .with_config(config)
        .analyze_site(ROOT, &[])
        .await
        .unwrap();

    let rows = &site.sitemap.level1;
    let blog = rows.iter().find(|r| r.url.ends_with("/blog")).unwrap();
    assert_eq!(blog.title, LOAD_FAILED_TITLE);
    assert_eq!(blog.status, RingStatus::Error);
    assert_eq!(
        rows.iter().filter(|r| r.status == RingStatus::Ok).count(),
        2
    );
    assert_eq!(site.title, "Home");
}

#[tokio::test]
async fn test_broken_ring_page_does_not_abort_batch() {
    let script = three_link_site();
    script.broken("https://example.com/contact");
    let site = explorer(&script).analyze_site(ROOT, &[]).await.unwrap();
    let contact = site
        .sitemap
        .level1
        .iter()
        .find(|r| r.url.ends_with("/contact"))
        .unwrap();
    assert_eq!(contact.status, RingStatus::Error);
    assert_eq!(contact.link_text, "Contact");
}

#[tokio::test]
async fn test_root_failure_is_fatal_and_releases_session() {
    let script = Arc::new(Script::default());
    script.broken(ROOT);
    let result = explorer(&script).analyze_site(ROOT, &[]).await;
    assert!(matches!(result, Err(ExploreError::RootNavigation { .. })));
    assert_eq!(script.navigations().len(), 1);
    assert_eq!(script.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_input_never_navigates() {
    let script = three_link_site();
    let explorer = explorer(&script);

    let bad_url = explorer.analyze_site("not a url", &[]).await;
    assert!(matches!(bad_url, Err(ExploreError::InvalidInput(_))));

    let cookies = vec![SessionCookie {
        name: "sid".to_string(),
        value: "1".to_string(),
        domain: String::new(),
        path: None,
        same_site: None,
        secure: None,
        http_only: None,
        expiration_date: None,
    }];
    let bad_cookie = explorer.analyze_site(ROOT, &cookies).await;
    assert!(matches!(bad_cookie, Err(ExploreError::InvalidInput(_))));

    assert!(script.navigations().is_empty());
    assert_eq!(script.opened.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Drill Tests
// ============================================================================

async fn seeded(script: &Arc<Script>) -> (Explorer, Mutex<ExplorationTree>) {
    let explorer = explorer(script);
    let (_, tree) = explorer.explore(ROOT, &[]).await.unwrap();
    (explorer, Mutex::new(tree))
}

fn id_for(tree: &ExplorationTree, path: &str) -> String {
    tree.children("root")
        .into_iter()
        .find(|n| n.path.as_deref() == Some(path))
        .map(|n| n.id.clone())
        .unwrap()
}

#[tokio::test]
async fn test_drill_groups_children_and_filters_to_root_origin() {
    let script = three_link_site();
    let shoes = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|s| format!(r#"<a href="/shop/shoes/{}">{}</a>"#, s, s))
        .collect::<String>();
    script.page(
        "https://example.com/blog",
        &titled(
            "Blog",
            &format!(
                r#"{}<a href="/about">About</a><a href="https://cdn.other.com/x">x</a>"#,
                shoes
            ),
        ),
    );

    let (explorer, tree) = seeded(&script).await;
    let blog = id_for(&*tree.lock().await, "/blog");
    let before = script.count("https://example.com/blog");

    let outcome = explorer.drill(&tree, &blog, &[]).await.unwrap();
    assert_eq!(
        outcome,
        DrillOutcome::Analyzed {
            node_id: blog.clone(),
            children: 2
        }
    );
    assert_eq!(script.count("https://example.com/blog"), before + 1);

    let tree = tree.lock().await;
    let node = tree.get(&blog).unwrap();
    assert_eq!(node.state, NodeState::Analyzed);
    assert!(node.expanded);
    assert!(node.screenshot.is_some());

    let children = tree.children(&blog);
    assert_eq!(children[0].node_type, NodeType::Group);
    assert_eq!(children[0].title, "shop/shoes (5)");
    assert_eq!(tree.children(&children[0].id).len(), 5);
    assert_eq!(children[1].path.as_deref(), Some("/about"));
    assert_eq!(children[1].level, node.level + 1);
}

#[tokio::test]
async fn test_drill_keeps_root_origin_after_cross_host_redirect() {
    let script = three_link_site();
    script.redirected(
        "https://example.com/blog",
        "https://blog.example.com/",
        &titled(
            "Blog",
            r#"<a href="/posts/1">Post</a><a href="/feed">Feed</a>
               <a href="https://example.com/careers">Careers</a>
               <a href="https://other.com/x">Elsewhere</a>"#,
        ),
    );

    let (explorer, tree) = seeded(&script).await;
    let blog = id_for(&*tree.lock().await, "/blog");
    let outcome = explorer.drill(&tree, &blog, &[]).await.unwrap();
    assert_eq!(
        outcome,
        DrillOutcome::Analyzed {
            node_id: blog.clone(),
            children: 1
        }
    );

    let tree = tree.lock().await;
    let children = tree.children(&blog);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].url.as_deref(), Some("https://example.com/careers"));
    assert_eq!(children[0].title, "Careers");
}

#[tokio::test]
async fn test_each_node_is_fetched_at_most_once() {
    let script = three_link_site();
    let (explorer, tree) = seeded(&script).await;
    let about = id_for(&*tree.lock().await, "/about");
    let before = script.count("https://example.com/about");

    let first = explorer.open(&tree, &about, &[]).await.unwrap();
    assert!(matches!(first, DrillOutcome::Analyzed { .. }));
    let second = explorer.open(&tree, &about, &[]).await.unwrap();
    assert_eq!(second, DrillOutcome::Toggled { expanded: false });
    let third = explorer.drill(&tree, &about, &[]).await;
    assert!(matches!(
        third,
        Err(ExploreError::Tree(TreeError::AlreadyAnalyzed(_)))
    ));

    assert_eq!(script.count("https://example.com/about"), before + 1);
}

#[tokio::test]
async fn test_concurrent_drills() {
    let script = three_link_site();
    script.slow(
        "https://example.com/about",
        &titled("About", ""),
        Duration::from_millis(100),
    );
    script.slow(
        "https://example.com/contact",
        &titled("Contact", ""),
        Duration::from_millis(100),
    );
    let (explorer, tree) = seeded(&script).await;
    let (about, contact) = {
        let guard = tree.lock().await;
        (id_for(&guard, "/about"), id_for(&guard, "/contact"))
    };
    let before = script.count("https://example.com/about");

    let (a, again, c) = tokio::join!(
        explorer.open(&tree, &about, &[]),
        explorer.open(&tree, &about, &[]),
        explorer.open(&tree, &contact, &[]),
    );
    assert!(matches!(a, Ok(DrillOutcome::Analyzed { .. })));
    assert!(matches!(
        again,
        Err(ExploreError::Tree(TreeError::AlreadyLoading(_)))
    ));
    assert!(matches!(c, Ok(DrillOutcome::Analyzed { .. })));
    assert_eq!(script.count("https://example.com/about"), before + 1);

    let guard = tree.lock().await;
    assert!(guard.get(&about).unwrap().is_analyzed());
    assert!(guard.get(&contact).unwrap().is_analyzed());
    assert_eq!(guard.analyzed_pages().len(), 3);
}

#[tokio::test]
async fn test_failed_drill_rolls_back_and_can_retry() {
    let script = three_link_site();
    let (explorer, tree) = seeded(&script).await;
    let contact = id_for(&*tree.lock().await, "/contact");

    script.broken("https://example.com/contact");
    let failed = explorer.drill(&tree, &contact, &[]).await;
    assert!(matches!(failed, Err(ExploreError::RootNavigation { .. })));
    {
        let guard = tree.lock().await;
        let node = guard.get(&contact).unwrap();
        assert_eq!(node.state, NodeState::Unanalyzed);
        assert!(!node.has_artifacts());
    }

    script.page("https://example.com/contact", &titled("Contact", ""));
    let retried = explorer.drill(&tree, &contact, &[]).await.unwrap();
    assert!(matches!(retried, DrillOutcome::Analyzed { .. }));
}

// ============================================================================
// Report Input Tests
// ============================================================================

#[tokio::test]
async fn test_report_inputs_follow_analysis_order() {
    let script = three_link_site();
    let (explorer, tree) = seeded(&script).await;
    let about = id_for(&*tree.lock().await, "/about");
    explorer.drill(&tree, &about, &[]).await.unwrap();

    let guard = tree.lock().await;
    let inputs = site_inputs(&guard);
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].url, ROOT);
    assert_eq!(inputs[0].level, 0);
    assert_eq!(inputs[1].url, "https://example.com/about");
    assert!(inputs.iter().all(|i| i.screenshot.is_none()));

    let about_input = node_input(&guard, &about).unwrap();
    assert!(about_input.screenshot.is_some());
    assert!(about_input.dom_stats.total_elements > 0);

    let pending = id_for(&guard, "/contact");
    assert!(node_input(&guard, &pending).is_none());
}

// ============================================================================
// Tracking Inventory Tests
// ============================================================================

#[tokio::test]
async fn test_tracking_inventory_only_when_enabled() {
    let script = Arc::new(Script::default());
    script.page(
        "https://example.com/signup",
        &titled(
            "Signup",
            r#"<form id="join"><input type="email" name="e"><input type="password" name="p"></form>
               <button>Start free trial</button>"#,
        ),
    );

    let plain = explorer(&script)
        .analyze_page("https://example.com/signup", &[], None)
        .await
        .unwrap();
    assert!(plain.tracking.is_none());

    let tracked = explorer(&script)
        .with_config(ExploreConfig::default().with_tracking(true))
        .analyze_page("https://example.com/signup", &[], None)
        .await
        .unwrap();
    let report = tracked.tracking.unwrap();
    assert_eq!(report.summary.total_forms, 1);
    assert_eq!(report.summary.total_cta, 1);
    assert!(report.elements.forms[0].has_password);
    assert!(!report.recommended_events.is_empty());
    assert_eq!(script.count("https://example.com/signup"), 2);
}
