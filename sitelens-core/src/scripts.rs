// Script inventory and client-side framework fingerprint

use serde::{Deserialize, Serialize};
use sitelens_fetcher::{FrameworkHints, ScriptTag};

const OTHER_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFramework {
    pub name: String,
    pub confidence: Confidence,
    pub root_element: String,
}

impl DetectedFramework {
    fn new(name: &str, confidence: Confidence, root_element: &str) -> Self {
        Self {
            name: name.to_string(),
            confidence,
            root_element: root_element.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptCategory {
    Framework,
    Library,
    Analytics,
    Bundle,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScriptNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStats {
    pub total_scripts: usize,
    pub framework_scripts: usize,
    pub bundle_scripts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsArchitecture {
    pub frameworks: Vec<DetectedFramework>,
    pub dependency_tree: ScriptNode,
    pub stats: ScriptStats,
}

/// Category and framework guess from the script URL alone.
pub fn categorize(src: &str) -> (ScriptCategory, Option<&'static str>) {
    if src.contains("react") || src.contains("_next") {
        (ScriptCategory::Framework, Some("React"))
    } else if src.contains("vue") {
        (ScriptCategory::Framework, Some("Vue"))
    } else if src.contains("angular") {
        (ScriptCategory::Framework, Some("Angular"))
    } else if src.contains("jquery") {
        (ScriptCategory::Library, Some("jQuery"))
    } else if src.contains("analytics") || src.contains("gtag") || src.contains("gtm") {
        (ScriptCategory::Analytics, None)
    } else if src.contains("chunk") || src.contains("bundle") {
        (ScriptCategory::Bundle, None)
    } else {
        (ScriptCategory::Other, None)
    }
}

fn file_name<'a>(src: &'a str, fallback: &'a str) -> &'a str {
    match src.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => fallback,
    }
}

fn hint_frameworks(hints: &FrameworkHints) -> Vec<DetectedFramework> {
    let mut found = Vec::new();
    if hints.react || hints.nextjs {
        found.push(if hints.nextjs {
            DetectedFramework::new("Next.js (React)", Confidence::High, "#__next")
        } else {
            DetectedFramework::new("React", Confidence::High, "#root")
        });
    }
    if hints.vue || hints.nuxt {
        found.push(if hints.nuxt {
            DetectedFramework::new("Nuxt (Vue)", Confidence::High, "#__nuxt")
        } else {
            DetectedFramework::new("Vue.js", Confidence::High, "#app")
        });
    }
    if hints.angular {
        found.push(DetectedFramework::new("Angular", Confidence::High, "app-root"));
    }
    found
}

pub fn analyze(scripts: &[ScriptTag], hints: &FrameworkHints) -> JsArchitecture {
    let categorized = scripts
        .iter()
        .map(|s| (s, categorize(&s.src)))
        .collect::<Vec<_>>();

    let mut frameworks = hint_frameworks(hints);
    if frameworks.is_empty()
        && let Some(name) = categorized
            .iter()
            .find(|(_, (cat, _))| *cat == ScriptCategory::Framework)
            .and_then(|(_, (_, fw))| *fw)
    {
        frameworks.push(DetectedFramework::new(name, Confidence::Medium, "unknown"));
    }
    if frameworks.is_empty() {
        frameworks.push(DetectedFramework::new(
            "Vanilla JS / Unknown",
            Confidence::Low,
            "body",
        ));
    }

    let category = |name: &str, wanted: ScriptCategory, fallback: &str, cap: usize| {
        let children = categorized
            .iter()
            .filter(|(_, (cat, _))| *cat == wanted)
            .take(cap)
            .map(|(s, (_, fw))| ScriptNode {
                name: file_name(&s.src, fallback).to_string(),
                node_type: "script".to_string(),
                framework: fw.map(str::to_string),
                children: Vec::new(),
            })
            .collect::<Vec<_>>();
        ScriptNode {
            name: name.to_string(),
            node_type: "category".to_string(),
            framework: None,
            children,
        }
    };

    let dependency_tree = ScriptNode {
        name: "Scripts".to_string(),
        node_type: "root".to_string(),
        framework: None,
        children: [
            category("Framework", ScriptCategory::Framework, "inline", usize::MAX),
            category("Bundles", ScriptCategory::Bundle, "chunk", usize::MAX),
            category("Analytics", ScriptCategory::Analytics, "analytics", usize::MAX),
            category("Other", ScriptCategory::Other, "script", OTHER_CAP),
        ]
        .into_iter()
        .filter(|c| !c.children.is_empty())
        .collect(),
    };

    let count = |wanted: ScriptCategory| {
        categorized
            .iter()
            .filter(|(_, (cat, _))| *cat == wanted)
            .count()
    };

    JsArchitecture {
        frameworks,
        dependency_tree,
        stats: ScriptStats {
            total_scripts: scripts.len(),
            framework_scripts: count(ScriptCategory::Framework),
            bundle_scripts: count(ScriptCategory::Bundle),
        },
    }
}
