// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    Overrides, ReplCommand, apply_overrides, build_fetcher, load_config_from_file,
    load_cookies_from_file, parse_cookies, parse_repl_command, render_tree,
};
