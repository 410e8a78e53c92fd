// Bounded structural skeleton of a document

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static ALL_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("*").expect("static selector"));

/// Tags whose children are expanded. Everything else is a leaf.
const CONTAINER_TAGS: &[&str] = &[
    "html", "head", "body", "header", "footer", "main", "nav", "aside", "section", "article",
    "div", "form", "table", "ul", "ol", "dl",
];

/// Tags dropped from the tree entirely.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "path", "circle", "rect", "meta", "link", "br", "hr",
    "img", "input", "button", "textarea", "option", "source", "track", "wbr", "area", "base",
    "col", "embed", "param", "iframe",
];

/// Sibling tags compressed after the first few occurrences.
const REPEAT_TAGS: &[&str] = &["li", "span", "p", "a", "td", "tr", "th"];

const REPEAT_KEEP: usize = 3;
const MAX_CLASSES: usize = 3;
const MAX_CLASS_LEN: usize = 30;

pub const DEFAULT_MAX_DEPTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomNode {
    Element {
        tag: String,
        id: Option<String>,
        #[serde(rename = "class")]
        classes: Option<String>,
        children: Vec<DomNode>,
    },
    /// Stands in for the repeat siblings past the kept ones.
    Overflow { tag: String, summary: String },
}

impl DomNode {
    fn overflow(tag: &str) -> Self {
        DomNode::Overflow {
            tag: tag.to_string(),
            summary: format!("more {} elements", tag),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            DomNode::Element { tag, .. } | DomNode::Overflow { tag, .. } => tag,
        }
    }

    pub fn children(&self) -> &[DomNode] {
        match self {
            DomNode::Element { children, .. } => children,
            DomNode::Overflow { .. } => &[],
        }
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, DomNode::Overflow { .. })
    }

    /// 1 for a childless node, else one more than the deepest child.
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(DomNode::depth).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomStats {
    /// Counted over the whole document, not the truncated tree.
    pub total_elements: usize,
    pub unique_tags: usize,
    /// Depth of the truncated tree.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomSummary {
    pub tree: DomNode,
    pub stats: DomStats,
}

pub struct DomSummarizer {
    max_depth: usize,
}

impl DomSummarizer {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn summarize(&self, markup: &str) -> DomSummary {
        let document = Html::parse_document(markup);
        self.summarize_document(&document)
    }

    pub fn summarize_document(&self, document: &Html) -> DomSummary {
        let tree = self
            .build(document.root_element(), 1)
            .unwrap_or_else(|| DomNode::Element {
                tag: "html".to_string(),
                id: None,
                classes: None,
                children: Vec::new(),
            });

        let mut tags = HashSet::new();
        let mut total_elements = 0;
        for el in document.select(&ALL_ELEMENTS) {
            total_elements += 1;
            tags.insert(el.value().name());
        }

        let stats = DomStats {
            total_elements,
            unique_tags: tags.len(),
            depth: tree.depth(),
        };
        DomSummary { tree, stats }
    }

    fn build(&self, element: ElementRef<'_>, level: usize) -> Option<DomNode> {
        if level > self.max_depth {
            return None;
        }
        let tag = element.value().name().to_lowercase();
        if NOISE_TAGS.contains(&tag.as_str()) {
            return None;
        }

        let mut children = Vec::new();
        if CONTAINER_TAGS.contains(&tag.as_str()) && level < self.max_depth {
            let mut seen: HashMap<String, usize> = HashMap::new();
            for child in element.children().filter_map(ElementRef::wrap) {
                let child_tag = child.value().name().to_lowercase();
                if NOISE_TAGS.contains(&child_tag.as_str()) {
                    continue;
                }
                if REPEAT_TAGS.contains(&child_tag.as_str()) {
                    let count = seen.entry(child_tag.clone()).or_insert(0);
                    *count += 1;
                    if *count == REPEAT_KEEP + 1 {
                        children.push(DomNode::overflow(&child_tag));
                    }
                    if *count > REPEAT_KEEP {
                        continue;
                    }
                }
                if let Some(node) = self.build(child, level + 1) {
                    children.push(node);
                }
            }
        }

        Some(DomNode::Element {
            tag,
            id: element
                .value()
                .attr("id")
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            classes: summarize_classes(element.value().attr("class")),
            children,
        })
    }
}

impl Default for DomSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

fn summarize_classes(raw: Option<&str>) -> Option<String> {
    let classes = raw?
        .split_whitespace()
        .filter(|c| c.len() < MAX_CLASS_LEN)
        .take(MAX_CLASSES)
        .collect::<Vec<_>>();
    if classes.is_empty() {
        None
    } else {
        Some(classes.join(" "))
    }
}
