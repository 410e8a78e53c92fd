pub mod analysis;
pub mod config;
pub mod dom;
pub mod error;
pub mod explore;
pub mod grouping;
pub mod node;
pub mod page_detail;
pub mod report;
pub mod scripts;
pub mod sitemap;
pub mod tracking;
pub mod tree;

pub use analysis::{PageAnalysis, SiteAnalysis};
pub use config::ExploreConfig;
pub use dom::{DomNode, DomSummarizer, DomSummary};
pub use error::{ExploreError, TreeError};
pub use explore::{DrillOutcome, Explorer, ProgressCallback};
pub use grouping::{ChildLink, LinkGrouper};
pub use node::{ExplorationNode, NodeState, NodeType};
pub use page_detail::PageDetail;
pub use sitemap::{Sitemap, SitemapBuilder};
pub use tree::{ExplorationTree, Opened};
