// Inputs handed to an external report generator

use crate::dom::DomStats;
use crate::node::NodeType;
use crate::page_detail::PageDetail;
use crate::scripts::JsArchitecture;
use crate::tree::ExplorationTree;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    pub url: String,
    pub title: String,
    pub level: usize,
    pub page_detail: PageDetail,
    pub dom_stats: DomStats,
    pub js_architecture: JsArchitecture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Input for one analyzed page node. `None` for groups and pages not yet drilled.
pub fn node_input(tree: &ExplorationTree, id: &str) -> Option<ReportInput> {
    let node = tree.get(id)?;
    if node.node_type == NodeType::Group {
        return None;
    }
    Some(ReportInput {
        url: node.url.clone()?,
        title: node.title.clone(),
        level: node.level,
        page_detail: node.page_detail.clone()?,
        dom_stats: node.dom_tree.as_ref()?.stats.clone(),
        js_architecture: node.js_architecture.clone()?,
        screenshot: node.screenshot.clone(),
    })
}

/// Every analyzed page in the order it was analyzed. Screenshots are left out.
pub fn site_inputs(tree: &ExplorationTree) -> Vec<ReportInput> {
    tree.analyzed_pages()
        .iter()
        .map(|page| ReportInput {
            url: page.url.clone(),
            title: page.title.clone(),
            level: page.level,
            page_detail: page.page_detail.clone(),
            dom_stats: page.dom_tree.stats.clone(),
            js_architecture: page.js_architecture.clone(),
            screenshot: None,
        })
        .collect()
}
