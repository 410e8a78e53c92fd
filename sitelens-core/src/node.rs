use crate::dom::DomSummary;
use crate::page_detail::PageDetail;
use crate::scripts::JsArchitecture;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Root,
    Page,
    /// Synthetic bucket of sibling links. Never fetched.
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Unanalyzed,
    Loading,
    Analyzed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationNode {
    pub id: String,
    pub url: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub level: usize,
    pub state: NodeState,
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_detail: Option<PageDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_tree: Option<DomSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_architecture: Option<JsArchitecture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Child ids, in display order.
    pub children: Vec<String>,
}

impl ExplorationNode {
    /// An unanalyzed page waiting to be drilled into.
    pub fn page(id: String, url: String, title: String, path: String, level: usize) -> Self {
        Self {
            id,
            url: Some(url),
            title,
            path: Some(path),
            node_type: NodeType::Page,
            level,
            state: NodeState::Unanalyzed,
            expanded: false,
            page_detail: None,
            dom_tree: None,
            js_architecture: None,
            screenshot: None,
            children: Vec::new(),
        }
    }

    pub fn group(id: String, title: String, level: usize, children: Vec<String>) -> Self {
        Self {
            id,
            url: None,
            title,
            path: None,
            node_type: NodeType::Group,
            level,
            state: NodeState::Analyzed,
            expanded: false,
            page_detail: None,
            dom_tree: None,
            js_architecture: None,
            screenshot: None,
            children,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.state == NodeState::Analyzed
    }

    pub fn is_loading(&self) -> bool {
        self.state == NodeState::Loading
    }

    pub fn has_artifacts(&self) -> bool {
        self.page_detail.is_some() || self.dom_tree.is_some() || self.js_architecture.is_some()
    }
}
