//! Glint CLI
//!
//! Usage:
//!   glint [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>      App configuration (TOML format)
//!   -s, --state <KEY=VALUE>  Initial state; the value is JSON, else a string
//!   -r, --route <PATH>       Navigate to a route after rendering
//!   --snapshot               Print the app's debug snapshot as JSON
//!   -d, --debug              Debug logging
//!   -h, --help               Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use futures::executor::block_on;
use tracing_subscriber::EnvFilter;

use glint::store::value::parse_loose;
use glint::{App, AppConfig, AppError, DomError, MemoryHistory, RouterConfig};

#[derive(Parser)]
#[command(name = "glint")]
#[command(about = "Render reactive markup templates")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// App configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial state entry, KEY=VALUE (repeatable)
    #[arg(short, long = "state", value_name = "KEY=VALUE")]
    state: Vec<String>,

    /// Navigate to this route after rendering
    #[arg(short, long)]
    route: Option<String>,

    /// Print the debug snapshot as JSON after the page
    #[arg(long)]
    snapshot: bool,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let config = match &cli.config {
        Some(path) => match AppConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    };

    let (filename, source) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (path.display().to_string(), content),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => ("<stdin>".to_string(), buffer),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let app = config.build();
    for entry in &cli.state {
        match entry.split_once('=') {
            Some((key, value)) => {
                app.set(key.trim(), parse_loose(value));
            }
            None => {
                eprintln!("Invalid state entry '{}': expected KEY=VALUE", entry);
                std::process::exit(1);
            }
        }
    }

    match app.render(&source) {
        Ok(_) => {}
        Err(AppError::Dom(DomError::Markup(errors))) => {
            for error in errors {
                eprint!("{}", error.format(&source, &filename));
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    if config.router.is_some() || cli.route.is_some() {
        route(&app, config.router.clone().unwrap_or_default(), cli.route.as_deref());
    }

    app.ready();
    println!("{}", app.body_html());

    if cli.snapshot {
        match serde_json::to_string_pretty(&app.debug()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error writing snapshot: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn route(app: &App, config: RouterConfig, path: Option<&str>) {
    let router = match config.build(app, MemoryHistory::new()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    block_on(router.start());
    if let Some(path) = path {
        block_on(router.navigate(path));
    }
}

fn print_intro() {
    println!(
        r#"Glint - reactive markup templates

USAGE:
    glint [OPTIONS] [FILE]
    echo '<markup>' | glint

OPTIONS:
    -c, --config     App configuration (TOML file)
    -s, --state      Initial state, KEY=VALUE (repeatable)
    -r, --route      Navigate to a route after rendering
    --snapshot       Print the debug snapshot as JSON
    -d, --debug      Debug logging
    -h, --help       Print help

QUICK START:
    echo '<p>Hello {{name}}</p>' | glint -s name=Ada

Placeholders are written {{key}} or {{context.key}} and refresh when the key changes."#
    );
}
