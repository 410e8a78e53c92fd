// Flat root + first-ring sitemap of a batch request

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use sitelens_fetcher::LinkRecord;
use std::collections::{HashMap, HashSet};
use url::Url;

pub const DEFAULT_PAGE_CAP: usize = 20;

pub const LOAD_FAILED_TITLE: &str = "load failed";

/// Title lookup for one first-ring link. Failed loads keep the link and carry the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingPage {
    pub url: String,
    pub title: String,
    pub link_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RingPage {
    pub fn loaded(link: &LinkRecord, title: String) -> Self {
        Self {
            url: link.url.clone(),
            title,
            link_text: link.text.clone(),
            error: None,
        }
    }

    pub fn degraded(link: &LinkRecord, error: impl ToString) -> Self {
        Self {
            url: link.url.clone(),
            title: LOAD_FAILED_TITLE.to_string(),
            link_text: link.text.clone(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapPage {
    pub title: String,
    pub url: String,
    pub path: String,
    #[serde(rename = "type")]
    pub page_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapRoot {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub children: Vec<SitemapPage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level1Row {
    pub url: String,
    pub title: String,
    pub link_text: String,
    pub status: RingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapStats {
    pub total_links: usize,
    pub level1_scanned: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sitemap {
    pub tree: SitemapRoot,
    pub level1: Vec<Level1Row>,
    pub stats: SitemapStats,
}

pub struct SitemapBuilder {
    page_cap: usize,
}

impl SitemapBuilder {
    pub fn new(page_cap: usize) -> Self {
        Self { page_cap }
    }

    /// `links` are the root's same-origin links in discovery order.
    pub fn build(
        &self,
        root: &Url,
        root_title: &str,
        ring: &[RingPage],
        links: &[LinkRecord],
    ) -> Sitemap {
        let root_url = root.to_string();
        let titles: HashMap<&str, &str> = ring
            .iter()
            .map(|p| (p.url.as_str(), p.title.as_str()))
            .collect();

        let children: Vec<SitemapPage> = {
            let mut seen = HashSet::new();
            seen.insert(root_url.as_str());
            links
                .iter()
                .filter(|link| seen.insert(link.url.as_str()))
                .take(self.page_cap)
                .map(|link| SitemapPage {
                    title: page_title(link, titles.get(link.url.as_str()).copied()),
                    url: link.url.clone(),
                    path: link.path.clone(),
                    page_type: "page".to_string(),
                })
                .collect()
        };

        let title = if root_title.is_empty() {
            root.host_str().unwrap_or_default().to_string()
        } else {
            root_title.to_string()
        };

        Sitemap {
            tree: SitemapRoot {
                title,
                url: root_url,
                node_type: "root".to_string(),
                children,
            },
            level1: ring
                .iter()
                .map(|p| Level1Row {
                    url: p.url.clone(),
                    title: p.title.clone(),
                    link_text: p.link_text.clone(),
                    status: if p.is_degraded() {
                        RingStatus::Error
                    } else {
                        RingStatus::Ok
                    },
                })
                .collect(),
            stats: SitemapStats {
                total_links: links.len(),
                level1_scanned: ring.len(),
            },
        }
    }
}

impl Default for SitemapBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_CAP)
    }
}

/// Crawled title, else the decoded path, else link text, else host.
fn page_title(link: &LinkRecord, crawled: Option<&str>) -> String {
    if let Some(title) = crawled.filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    let parsed = Url::parse(&link.url).ok();
    let path = parsed.as_ref().map(Url::path).unwrap_or(link.path.as_str());
    if !path.is_empty() && path != "/" {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let raw = if !trimmed.is_empty() {
            trimmed
        } else if !link.text.is_empty() {
            link.text.as_str()
        } else {
            "Page"
        };
        return percent_decode_str(raw).decode_utf8_lossy().into_owned();
    }
    if !link.text.is_empty() {
        return link.text.clone();
    }
    parsed
        .as_ref()
        .and_then(Url::host_str)
        .unwrap_or_default()
        .to_string()
}
