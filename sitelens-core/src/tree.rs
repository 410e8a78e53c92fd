// Caller-held exploration tree and its drill state machine

use crate::analysis::{PageAnalysis, SiteAnalysis};
use crate::config::ExploreConfig;
use crate::dom::DomSummary;
use crate::error::TreeError;
use crate::grouping::{Branch, ChildLink, LinkGrouper};
use crate::node::{ExplorationNode, NodeState, NodeType};
use crate::page_detail::PageDetail;
use crate::scripts::JsArchitecture;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use url::Url;

pub const ROOT_ID: &str = "root";

/// Issued by [`ExplorationTree::begin_drill`]. Redeem exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct DrillTicket {
    node_id: String,
    url: Url,
}

impl DrillTicket {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// What opening a node asks of the caller.
#[derive(Debug, PartialEq, Eq)]
pub enum Opened {
    /// Already analyzed or a group: only the expanded flag changed.
    Toggled { expanded: bool },
    /// Unanalyzed and now loading: fetch it and redeem the ticket.
    Drill(DrillTicket),
}

/// An analyzed page kept for site-level report input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPage {
    pub url: String,
    pub level: usize,
    pub title: String,
    pub page_detail: PageDetail,
    pub dom_tree: DomSummary,
    pub js_architecture: JsArchitecture,
}

#[derive(Debug, Clone)]
pub struct ExplorationTree {
    root_url: Url,
    nodes: HashMap<String, ExplorationNode>,
    grouper: LinkGrouper,
    analyzed: Vec<AnalyzedPage>,
}

impl ExplorationTree {
    /// Seeds the tree from a batch request. The root starts analyzed and expanded.
    pub fn from_batch(site: &SiteAnalysis, config: &ExploreConfig) -> Result<Self, TreeError> {
        let root_url =
            Url::parse(&site.url).map_err(|_| TreeError::NotDrillable(site.url.clone()))?;
        let grouper = LinkGrouper::new(config.group_threshold);

        let title = if site.title.is_empty() {
            site.sitemap.tree.title.clone()
        } else {
            site.title.clone()
        };
        let mut root = ExplorationNode {
            id: ROOT_ID.to_string(),
            url: Some(site.url.clone()),
            title: title.clone(),
            path: Some(root_url.path().to_string()),
            node_type: NodeType::Root,
            level: 0,
            state: NodeState::Analyzed,
            expanded: true,
            page_detail: Some(site.root_page_detail.clone()),
            dom_tree: Some(site.dom_tree.clone()),
            js_architecture: Some(site.js_architecture.clone()),
            screenshot: site.root_screenshot.clone(),
            children: Vec::new(),
        };

        let ring: Vec<ChildLink> = site
            .sitemap
            .tree
            .children
            .iter()
            .map(|p| ChildLink {
                url: p.url.clone(),
                title: p.title.clone(),
                path: p.path.clone(),
            })
            .collect();
        let branches = if config.group_first_ring {
            grouper.group(&ring, ROOT_ID, 1)
        } else {
            ring.iter()
                .enumerate()
                .map(|(i, link)| Branch {
                    node: ExplorationNode::page(
                        format!("{}-{}", ROOT_ID, i),
                        link.url.clone(),
                        link.title.clone(),
                        link.path.clone(),
                        1,
                    ),
                    members: Vec::new(),
                })
                .collect()
        };

        let mut tree = Self {
            root_url,
            nodes: HashMap::new(),
            grouper,
            analyzed: vec![AnalyzedPage {
                url: site.url.clone(),
                level: 0,
                title,
                page_detail: site.root_page_detail.clone(),
                dom_tree: site.dom_tree.clone(),
                js_architecture: site.js_architecture.clone(),
            }],
        };
        root.children = tree.insert_branches(branches)?;
        tree.nodes.insert(ROOT_ID.to_string(), root);
        Ok(tree)
    }

    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    pub fn root(&self) -> Option<&ExplorationNode> {
        self.nodes.get(ROOT_ID)
    }

    pub fn get(&self, id: &str) -> Option<&ExplorationNode> {
        self.nodes.get(id)
    }

    pub fn children(&self, id: &str) -> Vec<&ExplorationNode> {
        self.nodes
            .get(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root first, then drills in completion order. Unique by URL.
    pub fn analyzed_pages(&self) -> &[AnalyzedPage] {
        &self.analyzed
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut ExplorationNode, TreeError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::UnknownNode(id.to_string()))
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool, TreeError> {
        let node = self.node_mut(id)?;
        node.expanded = !node.expanded;
        Ok(node.expanded)
    }

    /// Click semantics: drill an unanalyzed page, toggle anything else.
    pub fn open(&mut self, id: &str) -> Result<Opened, TreeError> {
        let node = self.node_mut(id)?;
        match (node.node_type, node.state) {
            (_, NodeState::Loading) => Err(TreeError::AlreadyLoading(id.to_string())),
            (NodeType::Page, NodeState::Unanalyzed) => self.begin_drill(id).map(Opened::Drill),
            _ => self.toggle(id).map(|expanded| Opened::Toggled { expanded }),
        }
    }

    /// Moves an unanalyzed page into `loading`.
    pub fn begin_drill(&mut self, id: &str) -> Result<DrillTicket, TreeError> {
        let node = self.node_mut(id)?;
        if node.node_type != NodeType::Page {
            return Err(TreeError::NotDrillable(id.to_string()));
        }
        match node.state {
            NodeState::Loading => return Err(TreeError::AlreadyLoading(id.to_string())),
            NodeState::Analyzed => return Err(TreeError::AlreadyAnalyzed(id.to_string())),
            NodeState::Unanalyzed => {}
        }
        let url = node
            .url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .ok_or_else(|| TreeError::NotDrillable(id.to_string()))?;

        node.state = NodeState::Loading;
        debug!("Drilling into {} ({})", id, url);
        Ok(DrillTicket {
            node_id: id.to_string(),
            url,
        })
    }

    /// Stores the analysis and grows the node's children. `child_links` should already be
    /// filtered to the root's origin.
    pub fn complete_drill(
        &mut self,
        ticket: DrillTicket,
        analysis: PageAnalysis,
    ) -> Result<&ExplorationNode, TreeError> {
        let (id, level, title) = {
            let node = self.node_mut(&ticket.node_id)?;
            if node.state != NodeState::Loading {
                return Err(TreeError::StaleTicket(ticket.node_id));
            }
            (node.id.clone(), node.level, node.title.clone())
        };

        let branches = self.grouper.group(&analysis.child_links, &id, level + 1);
        let children = match self.insert_branches(branches) {
            Ok(children) => children,
            Err(e) => {
                self.node_mut(&id)?.state = NodeState::Unanalyzed;
                return Err(e);
            }
        };

        if !self.analyzed.iter().any(|p| p.url == analysis.url) {
            self.analyzed.push(AnalyzedPage {
                url: analysis.url.clone(),
                level,
                title,
                page_detail: analysis.page_detail.clone(),
                dom_tree: analysis.dom_tree.clone(),
                js_architecture: analysis.js_architecture.clone(),
            });
        }

        let node = self.node_mut(&id)?;
        node.state = NodeState::Analyzed;
        node.expanded = true;
        node.page_detail = Some(analysis.page_detail);
        node.dom_tree = Some(analysis.dom_tree);
        node.js_architecture = Some(analysis.js_architecture);
        node.screenshot = analysis.screenshot;
        node.children = children;
        Ok(node)
    }

    /// Rolls a failed drill back to `unanalyzed` so it can be retried.
    pub fn fail_drill(&mut self, ticket: DrillTicket) -> Result<(), TreeError> {
        let node = self.node_mut(&ticket.node_id)?;
        if node.state != NodeState::Loading {
            return Err(TreeError::StaleTicket(ticket.node_id));
        }
        node.state = NodeState::Unanalyzed;
        Ok(())
    }

    /// Adds every branch or nothing. An id already in the tree is rejected.
    fn insert_branches(&mut self, branches: Vec<Branch>) -> Result<Vec<String>, TreeError> {
        let mut incoming = HashSet::new();
        for branch in &branches {
            for id in std::iter::once(&branch.node.id).chain(branch.members.iter().map(|m| &m.id)) {
                if self.nodes.contains_key(id) || !incoming.insert(id.as_str()) {
                    return Err(TreeError::DuplicateId(id.clone()));
                }
            }
        }

        let mut ids = Vec::with_capacity(branches.len());
        for Branch { node, members } in branches {
            ids.push(node.id.clone());
            for member in members {
                self.nodes.insert(member.id.clone(), member);
            }
            self.nodes.insert(node.id.clone(), node);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomSummarizer;
    use crate::page_detail;
    use crate::scripts;
    use crate::sitemap::{SitemapPage, SitemapRoot, SitemapStats, Sitemap};
    use sitelens_fetcher::FrameworkHints;

    fn page(url: &str) -> PageAnalysis {
        let parsed = Url::parse(url).unwrap();
        PageAnalysis {
            url: url.to_string(),
            title: "t".to_string(),
            page_detail: page_detail::extract("<title>t</title>", &parsed),
            dom_tree: DomSummarizer::default().summarize("<title>t</title>"),
            js_architecture: scripts::analyze(&[], &FrameworkHints::default()),
            child_links: Vec::new(),
            screenshot: None,
            tracking: None,
            duration: "0.01s".to_string(),
        }
    }

    fn site(paths: &[&str]) -> SiteAnalysis {
        let root = page("https://example.com/");
        SiteAnalysis {
            url: root.url.clone(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            duration: "1.00s".to_string(),
            title: "Example".to_string(),
            dom_tree: root.dom_tree,
            sitemap: Sitemap {
                tree: SitemapRoot {
                    title: "Example".to_string(),
                    url: root.url.clone(),
                    node_type: "root".to_string(),
                    children: paths
                        .iter()
                        .map(|p| SitemapPage {
                            title: p.to_string(),
                            url: format!("https://example.com{}", p),
                            path: p.to_string(),
                            page_type: "page".to_string(),
                        })
                        .collect(),
                },
                level1: Vec::new(),
                stats: SitemapStats {
                    total_links: paths.len(),
                    level1_scanned: 0,
                },
            },
            js_architecture: root.js_architecture,
            root_page_detail: root.page_detail,
            root_screenshot: None,
        }
    }

    fn tree(paths: &[&str]) -> ExplorationTree {
        ExplorationTree::from_batch(&site(paths), &ExploreConfig::default()).unwrap()
    }

    #[test]
    fn test_root_is_seeded_analyzed_and_expanded() {
        let tree = tree(&["/about", "/pricing"]);
        let root = tree.root().unwrap();
        assert_eq!(root.state, NodeState::Analyzed);
        assert!(root.expanded);
        assert_eq!(root.children.len(), 2);
        assert_eq!(tree.analyzed_pages().len(), 1);
        assert_eq!(tree.children(ROOT_ID)[0].level, 1);
    }

    #[test]
    fn test_first_ring_grouping_is_switchable() {
        let paths = ["/c/x/1", "/c/x/2", "/c/x/3", "/c/x/4", "/c/x/5"];
        let grouped = tree(&paths);
        assert_eq!(grouped.root().unwrap().children, vec!["root-g0"]);

        let flat = ExplorationTree::from_batch(
            &site(&paths),
            &ExploreConfig::default().with_group_first_ring(false),
        )
        .unwrap();
        assert_eq!(flat.root().unwrap().children.len(), 5);
    }

    #[test]
    fn test_root_and_groups_are_not_drillable() {
        let mut tree = tree(&["/g/a/1", "/g/a/2", "/g/a/3", "/g/a/4", "/g/a/5"]);
        assert_eq!(
            tree.begin_drill(ROOT_ID),
            Err(TreeError::NotDrillable(ROOT_ID.to_string()))
        );
        assert!(matches!(tree.begin_drill("root-g0"), Err(TreeError::NotDrillable(_))));
        assert_eq!(tree.open("root-g0"), Ok(Opened::Toggled { expanded: true }));
        assert_eq!(tree.open(ROOT_ID), Ok(Opened::Toggled { expanded: false }));
        assert!(matches!(tree.open("nope"), Err(TreeError::UnknownNode(_))));
    }

    #[test]
    fn test_drill_lifecycle_and_memoization() {
        let mut tree = tree(&["/about"]);
        let ticket = tree.begin_drill("root-0").unwrap();
        assert!(tree.get("root-0").unwrap().is_loading());
        assert_eq!(
            tree.begin_drill("root-0"),
            Err(TreeError::AlreadyLoading("root-0".to_string()))
        );

        let mut analysis = page("https://example.com/about");
        analysis.child_links = vec![ChildLink {
            url: "https://example.com/team".to_string(),
            title: "Team".to_string(),
            path: "/team".to_string(),
        }];
        let node = tree.complete_drill(ticket, analysis).unwrap();
        assert!(node.is_analyzed());
        assert!(node.expanded);
        assert!(node.has_artifacts());
        assert_eq!(node.children, vec!["root-0-0"]);
        assert_eq!(tree.get("root-0-0").unwrap().level, 2);

        // Re-opening only toggles
        assert_eq!(tree.open("root-0"), Ok(Opened::Toggled { expanded: false }));
        assert_eq!(
            tree.begin_drill("root-0"),
            Err(TreeError::AlreadyAnalyzed("root-0".to_string()))
        );
        assert_eq!(tree.analyzed_pages().len(), 2);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_failed_drill_rolls_back() {
        let mut tree = tree(&["/about"]);
        let ticket = tree.begin_drill("root-0").unwrap();
        tree.fail_drill(ticket).unwrap();
        let node = tree.get("root-0").unwrap();
        assert_eq!(node.state, NodeState::Unanalyzed);
        assert!(!node.has_artifacts());

        // Retry is allowed after rollback
        assert!(matches!(tree.open("root-0"), Ok(Opened::Drill(_))));
    }

    #[test]
    fn test_stale_ticket_is_rejected() {
        let mut tree = tree(&["/about"]);
        let ticket = tree.begin_drill("root-0").unwrap();
        let copy = DrillTicket {
            node_id: ticket.node_id.clone(),
            url: ticket.url.clone(),
        };
        tree.complete_drill(ticket, page("https://example.com/about"))
            .unwrap();
        assert_eq!(
            tree.fail_drill(copy),
            Err(TreeError::StaleTicket("root-0".to_string()))
        );
        assert!(tree.get("root-0").unwrap().is_analyzed());
    }

    #[test]
    fn test_look_alike_group_keys_keep_every_link() {
        let mut paths: Vec<String> = (0..5).map(|i| format!("/a-b/c/{}", i)).collect();
        paths.extend((0..5).map(|i| format!("/a/b-c/{}", i)));
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();

        let tree = tree(&paths);
        let root = tree.root().unwrap();
        assert_eq!(root.children, vec!["root-g0", "root-g1"]);
        assert_eq!(tree.node_count(), 1 + 2 + 10);
        assert_eq!(tree.children("root-g0").len(), 5);
        assert_eq!(tree.children("root-g1").len(), 5);
        assert_eq!(tree.get("root-g0").unwrap().title, "a-b/c (5)");
        assert_eq!(tree.get("root-g1").unwrap().title, "a/b-c (5)");
    }

    #[test]
    fn test_existing_id_is_never_overwritten() {
        let mut tree = tree(&["/about"]);
        let squatter = ExplorationNode::page(
            "root-0-0".to_string(),
            "https://example.com/elsewhere".to_string(),
            "Elsewhere".to_string(),
            "/elsewhere".to_string(),
            2,
        );
        tree.nodes.insert(squatter.id.clone(), squatter);

        let ticket = tree.begin_drill("root-0").unwrap();
        let mut analysis = page("https://example.com/about");
        analysis.child_links = vec![ChildLink {
            url: "https://example.com/team".to_string(),
            title: "Team".to_string(),
            path: "/team".to_string(),
        }];
        assert_eq!(
            tree.complete_drill(ticket, analysis).err(),
            Some(TreeError::DuplicateId("root-0-0".to_string()))
        );

        assert_eq!(tree.get("root-0-0").unwrap().title, "Elsewhere");
        assert_eq!(tree.get("root-0").unwrap().state, NodeState::Unanalyzed);
        assert_eq!(tree.analyzed_pages().len(), 1);
    }
}
