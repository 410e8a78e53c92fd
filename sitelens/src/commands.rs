use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

fn shared_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(<URL>)
            .required(true)
            .help("Absolute http(s) URL to analyze"),
    )
    .arg(
        arg!(-c --"cookies" <PATH>)
            .required(false)
            .help("JSON array of session cookies, in the browser-extension export format")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        arg!(--"engine" <ENGINE>)
            .required(false)
            .help("Page engine: a headless browser, or plain HTTP without JavaScript")
            .value_parser(["browser", "http"])
            .default_value("browser"),
    )
    .arg(
        arg!(--"chrome" <PATH>)
            .required(false)
            .help("Path to the Chromium executable (defaults to $SITELENS_CHROME or autodetect)")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        arg!(--"root-timeout" <SECONDS>)
            .required(false)
            .help("Navigation timeout for the requested page [default: 30]")
            .value_parser(clap::value_parser!(u64)),
    )
    .arg(
        arg!(--"config" <PATH>)
            .required(false)
            .help("JSON file of exploration settings; flags override its values")
            .value_parser(clap::value_parser!(PathBuf)),
    )
}

fn batch_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"ring-timeout" <SECONDS>)
            .required(false)
            .help("Navigation timeout for each first-hop page [default: 10]")
            .value_parser(clap::value_parser!(u64)),
    )
    .arg(
        arg!(--"ring-size" <COUNT>)
            .required(false)
            .help("How many first-hop links to fetch titles for [default: 10]")
            .value_parser(clap::value_parser!(usize)),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitelens")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitelens")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress progress and non-essential output").required(false))
        .subcommand_required(true)
        .subcommand(
            batch_args(shared_args(
                command!("analyze")
                    .about("Analyze a site's root page and its first ring of links. Prints JSON."),
            ))
            .arg(
                arg!(-o --"output" <PATH>)
                    .required(false)
                    .help("Write the JSON result to a file instead of stdout")
                    .value_parser(clap::value_parser!(PathBuf)),
            ),
        )
        .subcommand(
            shared_args(
                command!("page")
                    .about("Analyze a single page and list its same-origin child links. Prints JSON."),
            )
            .arg(
                arg!(-o --"output" <PATH>)
                    .required(false)
                    .help("Write the JSON result to a file instead of stdout")
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                arg!(-t --"tracking")
                    .help("Include an inventory of trackable elements and recommended events")
                    .required(false),
            ),
        )
        .subcommand(batch_args(shared_args(
            command!("explore")
                .about("Interactively explore a site's structure, drilling into pages on demand"),
        )))
}
