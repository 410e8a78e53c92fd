use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use sitelens::handlers::{
    self, Overrides, REPL_HELP, ReplCommand, parse_repl_command, progress_spinner, render_node,
    render_pages, render_tree,
};
use sitelens_core::report::{node_input, site_inputs};
use sitelens_core::{DrillOutcome, ExploreConfig, ExplorationTree, Explorer};
use sitelens_fetcher::SessionCookie;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    let outcome = match chosen_command.subcommand() {
        Some(("analyze", primary_command)) => handle_analyze(primary_command, quiet).await,
        Some(("page", primary_command)) => handle_page(primary_command, quiet).await,
        Some(("explore", primary_command)) => handle_explore(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Everything a request needs, resolved from shared flags
struct RequestSetup {
    url: String,
    cookies: Vec<SessionCookie>,
    explorer: Explorer,
}

fn prepare(args: &ArgMatches, quiet: bool, tracking: bool) -> Result<(RequestSetup, indicatif::ProgressBar)> {
    let url = args
        .get_one::<String>("URL")
        .cloned()
        .context("a URL is required")?;

    let cookies = match args.get_one::<PathBuf>("cookies") {
        Some(path) => handlers::load_cookies_from_file(path).map_err(|e| anyhow!(e))?,
        None => Vec::new(),
    };

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => handlers::load_config_from_file(path).map_err(|e| anyhow!(e))?,
        None => ExploreConfig::default(),
    };
    let overrides = Overrides {
        root_timeout: args.get_one::<u64>("root-timeout").copied(),
        ring_timeout: args.try_get_one::<u64>("ring-timeout").ok().flatten().copied(),
        ring_size: args.try_get_one::<usize>("ring-size").ok().flatten().copied(),
        tracking,
    };
    let config = handlers::apply_overrides(config, &overrides);

    let engine = args
        .get_one::<String>("engine")
        .map(String::as_str)
        .unwrap_or("browser");
    let chrome = args.get_one::<PathBuf>("chrome").map(PathBuf::as_path);
    let fetcher = handlers::build_fetcher(engine, chrome).map_err(|e| anyhow!(e))?;
    debug!("Using {} engine, {} cookies, {:?}", engine, cookies.len(), config);

    let (spinner, callback) = progress_spinner(quiet);
    let explorer = Explorer::new(fetcher)
        .with_config(config)
        .with_progress_callback(callback);

    Ok((
        RequestSetup {
            url,
            cookies,
            explorer,
        },
        spinner,
    ))
}

async fn handle_analyze(args: &ArgMatches, quiet: bool) -> Result<()> {
    let (setup, spinner) = prepare(args, quiet, false)?;
    spinner.set_message(format!("Analyzing {}", setup.url));

    let result = setup.explorer.analyze_site(&setup.url, &setup.cookies).await;
    spinner.finish_and_clear();
    let site = result?;

    if !quiet {
        eprintln!(
            "{} {} ({} links, {} scanned) in {}",
            "[+]".green(),
            site.url,
            site.sitemap.stats.total_links,
            site.sitemap.stats.level1_scanned,
            site.duration
        );
    }
    let value = serde_json::to_value(&site).context("failed to serialize analysis")?;
    handlers::write_output(&value, args.get_one::<PathBuf>("output").map(PathBuf::as_path))
        .map_err(|e| anyhow!(e))
}

async fn handle_page(args: &ArgMatches, quiet: bool) -> Result<()> {
    let tracking = args.get_flag("tracking");
    let (setup, spinner) = prepare(args, quiet, tracking)?;
    spinner.set_message(format!("Analyzing {}", setup.url));

    let result = setup
        .explorer
        .analyze_page(&setup.url, &setup.cookies, None)
        .await;
    spinner.finish_and_clear();
    let page = result?;

    if !quiet {
        eprintln!(
            "{} {} ({} child links) in {}",
            "[+]".green(),
            page.url,
            page.child_links.len(),
            page.duration
        );
    }
    let value = serde_json::to_value(&page).context("failed to serialize analysis")?;
    handlers::write_output(&value, args.get_one::<PathBuf>("output").map(PathBuf::as_path))
        .map_err(|e| anyhow!(e))
}

async fn handle_explore(args: &ArgMatches, quiet: bool) -> Result<()> {
    let (setup, spinner) = prepare(args, quiet, false)?;
    spinner.set_message(format!("Analyzing {}", setup.url));

    let result = setup.explorer.explore(&setup.url, &setup.cookies).await;
    spinner.finish_and_clear();
    let (site, tree) = result?;

    println!(
        "{} {} in {}. Type 'help' for commands.\n",
        "[+] Explored".green(),
        site.url,
        site.duration
    );
    let tree = Mutex::new(tree);
    println!("{}", render_tree(&*tree.lock().await));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("\n{} ", "sitelens>".cyan().bold());
        io::stdout().flush().context("failed to flush stdout")?;

        line.clear();
        if stdin.lock().read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }

        match parse_repl_command(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Help => println!("{}", REPL_HELP),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(message) => println!("{}", message.yellow()),
            ReplCommand::Tree => println!("{}", render_tree(&*tree.lock().await)),
            ReplCommand::Pages => println!("{}", render_pages(&*tree.lock().await)),
            ReplCommand::Show(id) => match tree.lock().await.get(&id) {
                Some(node) => println!("{}", render_node(node)),
                None => println!("{}", format!("No node with id '{}'", id).yellow()),
            },
            ReplCommand::Report(id) => print_report(&tree, id.as_deref()).await?,
            ReplCommand::Open(id) => open_node(&setup, &tree, &id, quiet).await,
        }
    }
    Ok(())
}

async fn open_node(setup: &RequestSetup, tree: &Mutex<ExplorationTree>, id: &str, quiet: bool) {
    let (spinner, _) = progress_spinner(quiet);
    spinner.set_message(format!("Analyzing {}", id));
    let result = setup.explorer.open(tree, id, &setup.cookies).await;
    spinner.finish_and_clear();

    match result {
        Ok(DrillOutcome::Toggled { expanded }) => {
            let verb = if expanded { "Expanded" } else { "Collapsed" };
            println!("{} {}", verb, id);
            println!("{}", render_tree(&*tree.lock().await));
        }
        Ok(DrillOutcome::Analyzed { node_id, children }) => {
            println!("{} {} ({} children)", "[+] Analyzed".green(), node_id, children);
            println!("{}", render_tree(&*tree.lock().await));
        }
        Err(e) => println!("{} {}", "[!]".red(), e),
    }
}

async fn print_report(tree: &Mutex<ExplorationTree>, id: Option<&str>) -> Result<()> {
    let guard = tree.lock().await;
    let value = match id {
        Some(id) => match node_input(&guard, id) {
            Some(input) => serde_json::to_value(input)?,
            None => {
                println!("{}", format!("Node '{}' has no analysis to report", id).yellow());
                return Ok(());
            }
        },
        None => serde_json::to_value(site_inputs(&guard))?,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
