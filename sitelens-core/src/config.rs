use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds and timeouts for batch and drill requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    pub root_timeout: Duration,
    pub ring_timeout: Duration,
    /// How many first-hop links the batch request fetches titles for
    pub ring_size: usize,
    pub child_link_cap: usize,
    pub sitemap_page_cap: usize,
    pub group_threshold: usize,
    pub dom_max_depth: usize,
    /// Pass the first ring through the link grouper when seeding a tree
    pub group_first_ring: bool,
    /// Inventory trackable elements on single-page requests
    pub track_elements: bool,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            root_timeout: Duration::from_secs(30),
            ring_timeout: Duration::from_secs(10),
            ring_size: 10,
            child_link_cap: 100,
            sitemap_page_cap: 20,
            group_threshold: 5,
            dom_max_depth: 6,
            group_first_ring: true,
            track_elements: false,
        }
    }
}

impl ExploreConfig {
    pub fn with_root_timeout(mut self, timeout: Duration) -> Self {
        self.root_timeout = timeout;
        self
    }

    pub fn with_ring_timeout(mut self, timeout: Duration) -> Self {
        self.ring_timeout = timeout;
        self
    }

    pub fn with_ring_size(mut self, size: usize) -> Self {
        self.ring_size = size;
        self
    }

    pub fn with_child_link_cap(mut self, cap: usize) -> Self {
        self.child_link_cap = cap;
        self
    }

    pub fn with_sitemap_page_cap(mut self, cap: usize) -> Self {
        self.sitemap_page_cap = cap;
        self
    }

    pub fn with_group_threshold(mut self, threshold: usize) -> Self {
        self.group_threshold = threshold.max(1);
        self
    }

    pub fn with_dom_max_depth(mut self, depth: usize) -> Self {
        self.dom_max_depth = depth.max(1);
        self
    }

    pub fn with_group_first_ring(mut self, enabled: bool) -> Self {
        self.group_first_ring = enabled;
        self
    }

    pub fn with_tracking(mut self, enabled: bool) -> Self {
        self.track_elements = enabled;
        self
    }
}
