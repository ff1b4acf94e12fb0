//! Parcel command-line tool
//!
//! Resolves, loads and inspects artifacts from the command line, using the
//! same search paths and binding rules as an embedded importer.

mod commands;
mod output;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use output::{resolve_color_choice, StyledOutput};
use parcel_core::{find_config, Importer, ParcelConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parcel")]
#[command(about = "Resolve, load and inspect Parcel namespaces", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: nearest parcel.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search root, replaces the configured ones (repeatable)
    #[arg(long = "root", global = true)]
    roots: Vec<PathBuf>,

    /// When to use colors
    #[arg(long, global = true, value_parser = ["auto", "always", "never"])]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a namespace maps to paths and names
    Resolve {
        /// Namespace (e.g. "lib/greet")
        namespace: String,
    },

    /// Load a namespace and list what it declares
    Inspect {
        namespace: String,
    },

    /// Call a function declared by a namespace
    Call {
        namespace: String,
        /// Function name
        function: String,
        /// Arguments: integers, floats, true/false, nil, anything else is a string
        args: Vec<String>,
    },

    /// Print a constant declared by a namespace
    Const {
        namespace: String,
        /// Constant name
        name: String,
    },

    /// Import into a scratch scope and show the resulting binding
    Bind {
        namespace: String,
        /// Bind under this name instead of the derived one
        #[arg(long = "as")]
        alias: Option<String>,
        /// Binding strategy: value, method, const or local
        #[arg(long)]
        to: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));
    let result = run(cli, &mut out);
    out.flush();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `PARCEL_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_env("PARCEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    let importer = Importer::new(load_config(cli.config.as_deref(), cli.roots)?);

    match cli.command {
        Commands::Resolve { namespace } => commands::resolve::execute(&importer, &namespace, out),
        Commands::Inspect { namespace } => commands::inspect::execute(&importer, &namespace, out),
        Commands::Call {
            namespace,
            function,
            args,
        } => commands::call::call(&importer, &namespace, &function, &args, out),
        Commands::Const { namespace, name } => {
            commands::call::constant(&importer, &namespace, &name, out)
        }
        Commands::Bind {
            namespace,
            alias,
            to,
        } => commands::bind::execute(&importer, &namespace, alias, to.as_deref(), out),
    }
}

/// Explicit `--config`, else the nearest `parcel.toml`, else defaults.
/// `--root` flags replace whatever search paths that produced.
fn load_config(explicit: Option<&std::path::Path>, roots: Vec<PathBuf>) -> anyhow::Result<ParcelConfig> {
    let found = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            find_config(&cwd)
        }
    };

    let config = match found {
        Some(path) => {
            tracing::debug!(config = %path.display(), "using config file");
            ParcelConfig::from_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => ParcelConfig::default(),
    };

    if roots.is_empty() {
        Ok(config)
    } else {
        Ok(config.with_search_paths(roots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "parcel", "call", "lib/greet", "greet", "bob", "--root", "a", "--root", "b",
        ])
        .unwrap();
        assert_eq!(cli.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        match cli.command {
            Commands::Call { function, args, .. } => {
                assert_eq!(function, "greet");
                assert_eq!(args, vec!["bob"]);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_color() {
        assert!(Cli::try_parse_from(["parcel", "--color", "rainbow", "resolve", "x"]).is_err());
    }

    #[test]
    fn test_load_config_roots_override() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("parcel.toml");
        fs::write(&file, "[loader]\nsearch_paths = [\"lib\"]\n").unwrap();

        let config = load_config(Some(file.as_path()), Vec::new()).unwrap();
        assert_eq!(config.loader.search_paths, vec![temp.path().join("lib")]);

        let config = load_config(Some(file.as_path()), vec![PathBuf::from("other")]).unwrap();
        assert_eq!(config.loader.search_paths, vec![PathBuf::from("other")]);
    }
}
