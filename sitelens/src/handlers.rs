use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use sitelens_core::node::{ExplorationNode, NodeState, NodeType};
use sitelens_core::page_detail::H1Status;
use sitelens_core::{ExploreConfig, ExplorationTree, ProgressCallback};
use sitelens_fetcher::{BrowserOptions, ChromiumFetcher, HttpFetcher, PageFetcher, SessionCookie};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const REPL_HELP: &str = "\
Commands:
  tree          Show the exploration tree
  open <id>     Analyze an unanalyzed page, or expand/collapse an analyzed one
  show <id>     Show the analysis summary of a node
  report <id>   Print report input JSON for a node (omit <id> for the whole site)
  pages         List analyzed pages in analysis order
  help          Show this help
  quit          Exit";

// Input loading

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Load cookies exported by a browser extension: a JSON array of cookie objects
pub fn load_cookies_from_file(path: &Path) -> Result<Vec<SessionCookie>, String> {
    let path = expand_path(path);
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read cookie file {}: {}", path.display(), e))?;
    parse_cookies(&content).map_err(|e| format!("Invalid cookie file {}: {}", path.display(), e))
}

pub fn parse_cookies(content: &str) -> Result<Vec<SessionCookie>, String> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(content).map_err(|e| e.to_string())
}

pub fn load_config_from_file(path: &Path) -> Result<ExploreConfig, String> {
    let path = expand_path(path);
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Invalid config file {}: {}", path.display(), e))
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root_timeout: Option<u64>,
    pub ring_timeout: Option<u64>,
    pub ring_size: Option<usize>,
    pub tracking: bool,
}

pub fn apply_overrides(mut config: ExploreConfig, overrides: &Overrides) -> ExploreConfig {
    if let Some(secs) = overrides.root_timeout {
        config = config.with_root_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = overrides.ring_timeout {
        config = config.with_ring_timeout(Duration::from_secs(secs));
    }
    if let Some(size) = overrides.ring_size {
        config = config.with_ring_size(size);
    }
    if overrides.tracking {
        config = config.with_tracking(true);
    }
    config
}

pub fn build_fetcher(engine: &str, chrome: Option<&Path>) -> Result<Arc<dyn PageFetcher>, String> {
    let fetcher: Arc<dyn PageFetcher> = match engine {
        "browser" => {
            let mut options = BrowserOptions::from_env();
            if let Some(path) = chrome {
                options = options.with_executable(expand_path(path));
            }
            Arc::new(ChromiumFetcher::new(options))
        }
        "http" => Arc::new(HttpFetcher::new()),
        other => return Err(format!("Unknown engine '{}', expected browser or http", other)),
    };
    Ok(fetcher)
}

// Output

pub fn write_output(value: &Value, output: Option<&Path>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize result: {}", e))?;
    match output {
        Some(path) => {
            let path = expand_path(path);
            fs::write(&path, json + "\n")
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
        }
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

/// A stderr spinner that mirrors explorer progress messages. Hidden when quiet.
pub fn progress_spinner(quiet: bool) -> (ProgressBar, ProgressCallback) {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };
    let handle = spinner.clone();
    let callback: ProgressCallback = Arc::new(move |message: String| handle.set_message(message));
    (spinner, callback)
}

// Tree rendering

fn node_label(node: &ExplorationNode) -> String {
    let title = match node.node_type {
        NodeType::Root => node.title.bold().to_string(),
        NodeType::Group => node.title.yellow().to_string(),
        NodeType::Page => match node.state {
            NodeState::Analyzed => node.title.green().to_string(),
            NodeState::Loading => node.title.cyan().to_string(),
            NodeState::Unanalyzed => node.title.clone(),
        },
    };
    let state = match node.state {
        NodeState::Loading => " (loading)".cyan().to_string(),
        NodeState::Unanalyzed if node.node_type == NodeType::Page => {
            " (not analyzed)".dimmed().to_string()
        }
        _ => String::new(),
    };
    format!("{} [{}]{}", title, node.id.dimmed(), state)
}

fn marker(node: &ExplorationNode) -> &'static str {
    if node.children.is_empty() {
        "-"
    } else if node.expanded {
        "v"
    } else {
        ">"
    }
}

fn render_subtree(tree: &ExplorationTree, node: &ExplorationNode, depth: usize, out: &mut Vec<String>) {
    out.push(format!("{}{} {}", "  ".repeat(depth), marker(node), node_label(node)));
    if !node.expanded {
        return;
    }
    for child in tree.children(&node.id) {
        render_subtree(tree, child, depth + 1, out);
    }
}

/// Indented outline of the tree. Collapsed nodes hide their children.
pub fn render_tree(tree: &ExplorationTree) -> String {
    let mut lines = Vec::new();
    if let Some(root) = tree.root() {
        render_subtree(tree, root, 0, &mut lines);
    }
    lines.join("\n")
}

pub fn render_node(node: &ExplorationNode) -> String {
    let mut lines = vec![
        format!("{} {}", "Node:".bold(), node.id),
        format!("{} {}", "Title:".bold(), node.title),
        format!("{} {:?} / {:?}", "Type:".bold(), node.node_type, node.state),
        format!("{} {}", "Level:".bold(), node.level),
    ];
    if let Some(url) = &node.url {
        lines.push(format!("{} {}", "URL:".bold(), url));
    }
    if node.node_type == NodeType::Group {
        lines.push(format!("{} {}", "Members:".bold(), node.children.len()));
    }

    if let Some(detail) = &node.page_detail {
        let h1 = match detail.headings.h1_status() {
            H1Status::Missing => "missing".red().to_string(),
            H1Status::Single => "ok".green().to_string(),
            H1Status::Multiple => format!("{} found", detail.headings.h1.len()).yellow().to_string(),
        };
        lines.push(format!("{} {}", "H1:".bold(), h1));
        lines.push(format!(
            "{} {} h2, {} h3",
            "Headings:".bold(),
            detail.headings.h2.len(),
            detail.headings.h3.len()
        ));
        lines.push(format!(
            "{} {} nav, {} footer, {} internal, {} external ({})",
            "Links:".bold(),
            detail.flow.nav_links,
            detail.flow.footer_links,
            detail.flow.internal_links,
            detail.flow.external_links,
            detail.flow.external_ratio
        ));
        if let Some(description) = &detail.seo_tags.description {
            lines.push(format!("{} {}", "Description:".bold(), description));
        }
        lines.push(format!("{} {}", "Blocks:".bold(), detail.blocks.len()));
    }
    if let Some(dom) = &node.dom_tree {
        lines.push(format!(
            "{} {} elements, {} unique tags, depth {}",
            "DOM:".bold(),
            dom.stats.total_elements,
            dom.stats.unique_tags,
            dom.stats.depth
        ));
    }
    if let Some(js) = &node.js_architecture {
        let frameworks: Vec<&str> = js.frameworks.iter().map(|f| f.name.as_str()).collect();
        lines.push(format!("{} {}", "Frameworks:".bold(), frameworks.join(", ")));
    }
    lines.join("\n")
}

pub fn render_pages(tree: &ExplorationTree) -> String {
    tree.analyzed_pages()
        .iter()
        .enumerate()
        .map(|(i, page)| format!("{:>3}. [L{}] {} {}", i + 1, page.level, page.title, page.url.dimmed()))
        .collect::<Vec<_>>()
        .join("\n")
}

// REPL

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Tree,
    Open(String),
    Show(String),
    Report(Option<String>),
    Pages,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_repl_command(line: &str) -> ReplCommand {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return ReplCommand::Empty;
    };
    let argument = parts.next().map(str::to_string);
    if parts.next().is_some() {
        return ReplCommand::Invalid(format!("Too many arguments for '{}'", command));
    }

    match (command.to_lowercase().as_str(), argument) {
        ("tree" | "ls", None) => ReplCommand::Tree,
        ("open" | "o", Some(id)) => ReplCommand::Open(id),
        ("show" | "s", Some(id)) => ReplCommand::Show(id),
        ("report", id) => ReplCommand::Report(id),
        ("pages", None) => ReplCommand::Pages,
        ("help" | "?", None) => ReplCommand::Help,
        ("quit" | "exit" | "q", None) => ReplCommand::Quit,
        ("open" | "o" | "show" | "s", None) => {
            ReplCommand::Invalid(format!("'{}' needs a node id", command))
        }
        (other, _) => ReplCommand::Invalid(format!("Unknown command '{}', try 'help'", other)),
    }
}
