// Buckets wide sibling sets by path prefix

use crate::node::ExplorationNode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_GROUP_THRESHOLD: usize = 5;

/// A same-origin link discovered on an analyzed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildLink {
    pub url: String,
    pub title: String,
    pub path: String,
}

/// One top-level child and, for a group, the pages nested under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub node: ExplorationNode,
    pub members: Vec<ExplorationNode>,
}

/// First two path segments, or the only one. `None` for root-only paths.
pub fn group_key(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => None,
        [only] => Some((*only).to_string()),
        [first, second, ..] => Some(format!("{}/{}", first, second)),
    }
}

#[derive(Debug, Clone)]
pub struct LinkGrouper {
    threshold: usize,
}

impl LinkGrouper {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    /// Groups come first, sorted by key, then leaves sorted by path (title when the path is empty).
    pub fn group(&self, links: &[ChildLink], parent_id: &str, level: usize) -> Vec<Branch> {
        let mut seen = HashSet::new();
        let mut buckets: BTreeMap<String, Vec<&ChildLink>> = BTreeMap::new();
        let mut loose: Vec<&ChildLink> = Vec::new();

        for link in links {
            if !seen.insert(link.url.as_str()) {
                continue;
            }
            match group_key(&link.path) {
                Some(key) => buckets.entry(key).or_default().push(link),
                None => loose.push(link),
            }
        }

        // Parent id plus a dash-free suffix, so ids are unique across the whole tree.
        let mut branches = Vec::new();
        for (key, members) in buckets {
            if members.len() < self.threshold {
                loose.extend(members);
                continue;
            }
            let group_id = format!("{}-g{}", parent_id, branches.len());
            let members = members
                .iter()
                .enumerate()
                .map(|(i, link)| leaf(format!("{}-{}", group_id, i), link, level + 1))
                .collect::<Vec<_>>();
            let node = ExplorationNode::group(
                group_id,
                format!("{} ({})", key, members.len()),
                level,
                members.iter().map(|m| m.id.clone()).collect(),
            );
            branches.push(Branch { node, members });
        }

        loose.sort_by(|a, b| sort_text(a).cmp(sort_text(b)));
        branches.extend(loose.into_iter().enumerate().map(|(i, link)| Branch {
            node: leaf(format!("{}-{}", parent_id, i), link, level),
            members: Vec::new(),
        }));
        branches
    }
}

impl Default for LinkGrouper {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_THRESHOLD)
    }
}

fn sort_text(link: &ChildLink) -> &str {
    if link.path.is_empty() {
        &link.title
    } else {
        &link.path
    }
}

fn leaf(id: String, link: &ChildLink, level: usize) -> ExplorationNode {
    ExplorationNode::page(id, link.url.clone(), link.title.clone(), link.path.clone(), level)
}
