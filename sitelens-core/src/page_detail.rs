// SEO tags, heading outline, link flow, breadcrumbs and semantic regions of one page

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use sitelens_fetcher::links::resolve_href;
use std::sync::LazyLock;
use url::Url;

macro_rules! selector {
    ($css:expr) => {
        LazyLock::new(|| Selector::parse($css).expect("static selector"))
    };
}

static TITLE: LazyLock<Selector> = selector!("title");
static META_DESCRIPTION: LazyLock<Selector> = selector!(r#"meta[name="description"]"#);
static META_KEYWORDS: LazyLock<Selector> = selector!(r#"meta[name="keywords"]"#);
static META_ROBOTS: LazyLock<Selector> = selector!(r#"meta[name="robots"]"#);
static CANONICAL: LazyLock<Selector> = selector!(r#"link[rel="canonical"]"#);
static OG_TITLE: LazyLock<Selector> = selector!(r#"meta[property="og:title"]"#);
static OG_DESCRIPTION: LazyLock<Selector> = selector!(r#"meta[property="og:description"]"#);
static OG_IMAGE: LazyLock<Selector> = selector!(r#"meta[property="og:image"]"#);

static H1: LazyLock<Selector> = selector!("h1");
static H2: LazyLock<Selector> = selector!("h2");
static H3: LazyLock<Selector> = selector!("h3");

static ANCHORS: LazyLock<Selector> = selector!("a[href]");
static NAV_ANCHORS: LazyLock<Selector> =
    selector!(r#"nav a[href], header a[href], [role="navigation"] a[href]"#);
static FOOTER_ANCHORS: LazyLock<Selector> = selector!("footer a[href]");

static CRUMB_ITEMS: LazyLock<Selector> = selector!("a, span, li");
static ANY_ANCHOR: LazyLock<Selector> = selector!("a");

static HEADER: LazyLock<Selector> = selector!("header");
static LOGO: LazyLock<Selector> = selector!(r#"img, svg, [class*="logo"]"#);
static NAV: LazyLock<Selector> = selector!("nav");
static HERO_HEADING: LazyLock<Selector> = selector!("h1, h2");
static IMG: LazyLock<Selector> = selector!("img");
static CTA: LazyLock<Selector> = selector!("a, button");
static MAIN: LazyLock<Selector> = selector!(r#"main, [role="main"]"#);
static SECTION: LazyLock<Selector> = selector!("section");
static ARTICLE: LazyLock<Selector> = selector!("article");
static SIDEBAR: LazyLock<Selector> = selector!(r#"aside, [role="complementary"], .sidebar"#);
static FOOTER: LazyLock<Selector> = selector!("footer");
static SOCIAL: LazyLock<Selector> = selector!(
    r#"[class*="social"], [href*="facebook"], [href*="twitter"], [href*="instagram"]"#
);

/// Tried in order. The first one that yields an item wins.
pub const BREADCRUMB_SELECTORS: &[&str] = &[
    r#"[itemtype*="BreadcrumbList"]"#,
    ".breadcrumb",
    ".breadcrumbs",
    r#"[aria-label="breadcrumb"]"#,
    "nav.breadcrumb",
    ".bread-crumb",
];

const HERO_SELECTORS: &[&str] = &[
    ".hero",
    r#"[class*="hero"]"#,
    ".banner",
    r#"[class*="banner"]"#,
    ".jumbotron",
    ".masthead",
];

const HEADING_CAP: usize = 10;
const BREADCRUMB_CAP: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoTags {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub robots: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H1Status {
    Missing,
    Single,
    Multiple,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
}

impl Headings {
    pub fn h1_status(&self) -> H1Status {
        match self.h1.len() {
            0 => H1Status::Missing,
            1 => H1Status::Single,
            _ => H1Status::Multiple,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub nav_links: usize,
    pub footer_links: usize,
    pub internal_links: usize,
    pub external_links: usize,
    pub external_ratio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadcrumbItem {
    pub text: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumbs {
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub items: Vec<BreadcrumbItem>,
}

impl Breadcrumbs {
    pub fn none() -> Self {
        Self {
            detected: false,
            selector: None,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename_all = "camelCase")]
    Header {
        tag: String,
        has_logo: bool,
        has_nav: bool,
    },
    #[serde(rename = "Hero Section", rename_all = "camelCase")]
    Hero {
        selector: String,
        has_heading: bool,
        has_image: bool,
        #[serde(rename = "hasCTA")]
        has_cta: bool,
    },
    #[serde(rename = "Main Content")]
    Main {
        tag: String,
        sections: usize,
        articles: usize,
    },
    Sidebar { tag: String },
    #[serde(rename_all = "camelCase")]
    Footer {
        tag: String,
        links_count: usize,
        has_social: bool,
    },
    Navigation { count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDetail {
    pub url: String,
    pub seo_tags: SeoTags,
    pub headings: Headings,
    pub flow: Flow,
    pub breadcrumbs: Breadcrumbs,
    pub blocks: Vec<Block>,
}

/// Best-effort and infallible: anything missing comes back as `None` or empty.
pub fn extract(markup: &str, url: &Url) -> PageDetail {
    let document = Html::parse_document(markup);
    extract_document(&document, url)
}

pub fn extract_document(document: &Html, url: &Url) -> PageDetail {
    PageDetail {
        url: url.to_string(),
        seo_tags: seo_tags(document),
        headings: headings(document),
        flow: flow(document, url),
        breadcrumbs: breadcrumbs(document),
        blocks: blocks(document),
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn attr_of(document: &Html, selector: &Selector, attr: &str) -> Option<String> {
    non_empty(document.select(selector).next().and_then(|el| el.value().attr(attr)))
}

fn seo_tags(document: &Html) -> SeoTags {
    let title = document
        .select(&TITLE)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());
    SeoTags {
        title,
        description: attr_of(document, &META_DESCRIPTION, "content"),
        keywords: attr_of(document, &META_KEYWORDS, "content"),
        canonical: attr_of(document, &CANONICAL, "href"),
        og_title: attr_of(document, &OG_TITLE, "content"),
        og_description: attr_of(document, &OG_DESCRIPTION, "content"),
        og_image: attr_of(document, &OG_IMAGE, "content"),
        robots: attr_of(document, &META_ROBOTS, "content"),
    }
}

fn headings(document: &Html) -> Headings {
    Headings {
        h1: document.select(&H1).map(text_of).collect(),
        h2: document.select(&H2).map(text_of).take(HEADING_CAP).collect(),
        h3: document.select(&H3).map(text_of).take(HEADING_CAP).collect(),
    }
}

/// `"12.5%"`, or `"0%"` when there are no classified links.
pub fn external_ratio(internal: usize, external: usize) -> String {
    let total = internal + external;
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", external as f64 / total as f64 * 100.0)
}

fn flow(document: &Html, url: &Url) -> Flow {
    let mut internal_links = 0;
    let mut external_links = 0;
    for anchor in document.select(&ANCHORS) {
        let Some(resolved) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_href(url, href))
        else {
            continue;
        };
        if resolved.origin() == url.origin() {
            internal_links += 1;
        } else {
            external_links += 1;
        }
    }

    Flow {
        nav_links: document.select(&NAV_ANCHORS).count(),
        footer_links: document.select(&FOOTER_ANCHORS).count(),
        internal_links,
        external_links,
        external_ratio: external_ratio(internal_links, external_links),
    }
}

fn breadcrumbs(document: &Html) -> Breadcrumbs {
    for css in BREADCRUMB_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        let Some(container) = document.select(&selector).next() else {
            continue;
        };

        let items = container
            .select(&CRUMB_ITEMS)
            .filter_map(|item| {
                let text = text_of(item);
                if text.is_empty() {
                    return None;
                }
                let href = non_empty(item.value().attr("href")).or_else(|| {
                    item.select(&ANY_ANCHOR)
                        .next()
                        .and_then(|a| non_empty(a.value().attr("href")))
                });
                Some(BreadcrumbItem { text, href })
            })
            .take(BREADCRUMB_CAP)
            .collect::<Vec<_>>();

        if !items.is_empty() {
            return Breadcrumbs {
                detected: true,
                selector: Some(css.to_string()),
                items,
            };
        }
    }
    Breadcrumbs::none()
}

fn has(el: ElementRef<'_>, selector: &Selector) -> bool {
    el.select(selector).next().is_some()
}

fn blocks(document: &Html) -> Vec<Block> {
    let mut blocks = Vec::new();

    if let Some(header) = document.select(&HEADER).next() {
        blocks.push(Block::Header {
            tag: "header".to_string(),
            has_logo: has(header, &LOGO),
            has_nav: has(header, &NAV),
        });
    }

    let hero = HERO_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document.select(&selector).next().map(|el| (*css, el))
    });
    if let Some((css, hero)) = hero {
        blocks.push(Block::Hero {
            selector: css.to_string(),
            has_heading: has(hero, &HERO_HEADING),
            has_image: has(hero, &IMG),
            has_cta: has(hero, &CTA),
        });
    }

    if let Some(main) = document.select(&MAIN).next() {
        blocks.push(Block::Main {
            tag: main.value().name().to_lowercase(),
            sections: main.select(&SECTION).count(),
            articles: main.select(&ARTICLE).count(),
        });
    }

    if let Some(aside) = document.select(&SIDEBAR).next() {
        blocks.push(Block::Sidebar {
            tag: aside.value().name().to_lowercase(),
        });
    }

    if let Some(footer) = document.select(&FOOTER).next() {
        blocks.push(Block::Footer {
            tag: "footer".to_string(),
            links_count: footer.select(&ANY_ANCHOR).count(),
            has_social: has(footer, &SOCIAL),
        });
    }

    let nav_count = document.select(&NAV).count();
    if nav_count > 0 {
        blocks.push(Block::Navigation { count: nav_count });
    }

    blocks
}
