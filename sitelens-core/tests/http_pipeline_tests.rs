// End-to-end pipeline tests over the HTTP engine and a mock server

use sitelens_core::explore::DrillOutcome;
use sitelens_core::{ExploreConfig, Explorer, NodeState, NodeType};
use sitelens_fetcher::HttpFetcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount(server: &MockServer, route: &str, body: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(hits)
        .mount(server)
        .await;
}

fn explorer() -> Explorer {
    Explorer::new(Arc::new(HttpFetcher::new()))
}

#[tokio::test]
async fn test_batch_fetches_each_ring_page_once() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        r#"<html><head><title>Root</title><script src="/_next/static/chunks/main.js"></script></head>
           <body><div id="__next"><header><nav>
             <a href="/a">A</a><a href="/b">B</a><a href="/c">C</a><a href="/a#top">A</a>
           </nav></header></div></body></html>"#
            .to_string(),
        1,
    )
    .await;
    for route in ["/a", "/b", "/c"] {
        mount(&server, route, format!("<title>Page {}</title>", route), 1).await;
    }

    let site = explorer().analyze_site(&server.uri(), &[]).await.unwrap();

    assert_eq!(site.title, "Root");
    assert_eq!(site.sitemap.level1.len(), 3);
    assert_eq!(site.sitemap.tree.children[1].title, "Page /b");
    assert_eq!(site.js_architecture.frameworks[0].name, "Next.js (React)");
    assert_eq!(site.root_page_detail.flow.nav_links, 4);
    assert_eq!(site.root_page_detail.flow.external_ratio, "0.0%");
    assert!(site.root_screenshot.is_none());
    assert!(site.dom_tree.stats.depth <= 6);
}

#[tokio::test]
async fn test_slow_ring_page_degrades_over_http() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        r#"<a href="/fast">fast</a><a href="/slow">slow</a>"#.to_string(),
        1,
    )
    .await;
    mount(&server, "/fast", "<title>Fast</title>".to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<title>Slow</title>".to_string()).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = ExploreConfig::default().with_ring_timeout(Duration::from_millis(300));
    let site = explorer()
        .with_config(config)
        .analyze_site(&server.uri(), &[])
        .await
        .unwrap();

    let slow = site
        .sitemap
        .level1
        .iter()
        .find(|r| r.url.ends_with("/slow"))
        .unwrap();
    assert_eq!(slow.title, "load failed");
    let fast = site
        .sitemap
        .level1
        .iter()
        .find(|r| r.url.ends_with("/fast"))
        .unwrap();
    assert_eq!(fast.title, "Fast");
}

#[tokio::test]
async fn test_explore_then_drill_over_http() {
    let server = MockServer::start().await;
    mount(&server, "/", r#"<a href="/docs">Docs</a>"#.to_string(), 1).await;
    let docs = (1..=6)
        .map(|i| format!(r#"<a href="/docs/guide/{}">Guide {}</a>"#, i, i))
        .collect::<String>();
    mount(
        &server,
        "/docs",
        format!(
            r#"<title>Docs</title><ol class="breadcrumb"><li><a href="/">Home</a></li></ol>{}"#,
            docs
        ),
        2,
    )
    .await;

    let explorer = explorer();
    let (_, tree) = explorer.explore(&server.uri(), &[]).await.unwrap();
    let tree = Mutex::new(tree);
    let outcome = explorer.open(&tree, "root-0", &[]).await.unwrap();
    assert_eq!(
        outcome,
        DrillOutcome::Analyzed {
            node_id: "root-0".to_string(),
            children: 2
        }
    );

    let guard = tree.lock().await;
    let node = guard.get("root-0").unwrap();
    assert_eq!(node.state, NodeState::Analyzed);
    assert!(node.page_detail.as_ref().unwrap().breadcrumbs.detected);

    let children = guard.children("root-0");
    let group = children[0];
    assert_eq!(group.node_type, NodeType::Group);
    // The breadcrumb's link back home stays a plain leaf
    assert_eq!(children[1].path.as_deref(), Some("/"));
    assert_eq!(group.id, "root-0-g0");
    assert_eq!(guard.children(&group.id).len(), 6);
}
