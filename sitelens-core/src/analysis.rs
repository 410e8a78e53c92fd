use crate::dom::DomSummary;
use crate::grouping::ChildLink;
use crate::page_detail::PageDetail;
use crate::scripts::JsArchitecture;
use crate::sitemap::Sitemap;
use crate::tracking::TrackingReport;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of a batch request: the root page plus its first ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAnalysis {
    pub url: String,
    /// RFC 3339 start time
    pub timestamp: String,
    pub duration: String,
    #[serde(default)]
    pub title: String,
    pub dom_tree: DomSummary,
    pub sitemap: Sitemap,
    pub js_architecture: JsArchitecture,
    #[serde(rename = "level0PageDetail")]
    pub root_page_detail: PageDetail,
    #[serde(rename = "level0Screenshot", default, skip_serializing_if = "Option::is_none")]
    pub root_screenshot: Option<String>,
}

/// Result of a single-page (drill) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysis {
    pub url: String,
    pub title: String,
    pub page_detail: PageDetail,
    pub dom_tree: DomSummary,
    pub js_architecture: JsArchitecture,
    pub child_links: Vec<ChildLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Present when `ExploreConfig::track_elements` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingReport>,
    pub duration: String,
}

/// `"1.23s"`
pub fn format_duration(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}
