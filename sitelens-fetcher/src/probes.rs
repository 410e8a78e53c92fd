// Structural probes over fetched markup: scripts, framework markers, title

use crate::artifact::{FrameworkHints, ScriptTag};
use scraper::{Html, Selector};
use std::sync::LazyLock;

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").expect("static selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static REACT_ROOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-reactroot]").expect("static selector"));
static ANGULAR_ROOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[ng-version]").expect("static selector"));
static NEXT_ROOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#__next").expect("static selector"));
static NUXT_ROOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#__nuxt").expect("static selector"));

/// Runs in the page. Returns the same shape as [`FrameworkHints`], and also sees
/// runtime-only markers such as `window.__VUE__`.
pub const FRAMEWORK_PROBE_SCRIPT: &str = r#"
(() => {
    const hasAttrPrefix = (prefix) => Array.from(document.querySelectorAll('*'))
        .some(el => Array.from(el.attributes).some(a => a.name.startsWith(prefix)));
    const root = document.querySelector('#root');
    return {
        react: !!document.querySelector('[data-reactroot]') || !!(root && root._reactRootContainer),
        vue: hasAttrPrefix('data-v-') || !!window.__VUE__,
        angular: !!document.querySelector('[ng-version]') || hasAttrPrefix('_ngcontent'),
        nextjs: !!document.querySelector('#__next'),
        nuxt: !!document.querySelector('#__nuxt')
    };
})()
"#;

pub fn extract_scripts(document: &Html) -> Vec<ScriptTag> {
    document
        .select(&SCRIPT_SELECTOR)
        .map(|el| {
            let attrs = el.value();
            ScriptTag {
                src: attrs.attr("src").unwrap_or_default().to_string(),
                script_type: attrs
                    .attr("type")
                    .filter(|t| !t.is_empty())
                    .unwrap_or("text/javascript")
                    .to_string(),
                is_async: attrs.attr("async").is_some(),
                defer: attrs.attr("defer").is_some(),
            }
        })
        .collect()
}

fn has_attr_prefix(document: &Html, prefix: &str) -> bool {
    document.root_element().descendants().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| el.attrs().any(|(name, _)| name.starts_with(prefix)))
    })
}

/// Static counterpart of [`FRAMEWORK_PROBE_SCRIPT`] for sessions that do not run JavaScript.
pub fn detect_framework_hints(document: &Html) -> FrameworkHints {
    FrameworkHints {
        react: document.select(&REACT_ROOT).next().is_some(),
        vue: has_attr_prefix(document, "data-v-"),
        angular: document.select(&ANGULAR_ROOT).next().is_some()
            || has_attr_prefix(document, "_ngcontent"),
        nextjs: document.select(&NEXT_ROOT).next().is_some(),
        nuxt: document.select(&NUXT_ROOT).next().is_some(),
    }
}

pub fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
