use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

/// Ostrich site build tool.
///
/// Builds the modules listed in site.toml once per flavor. Modules declare
/// libraries and programs in their module.toml; programs refer to libraries
/// of earlier modules by name or by `module::library`.
///
/// EXAMPLES:
///     ostrich build                     Build every flavor
///     ostrich build debug --dry-run     Print the debug build commands
///     ostrich query release 'lib1::*'   Show outputs of lib1's targets
///     ostrich flavors                   List flavors and build roots
///     ostrich modules                   List modules in build order
///
/// ENVIRONMENT VARIABLES:
///     BUILD_FLAVOR        Build only this flavor
///     OSTRICH_BUILD_BASE  Override [site] build_base
///     OSTRICH_CC          Override the C compiler
///     OSTRICH_CXX         Override the C++ compiler
///     OSTRICH_OUTPUT      Set to 'json' for JSON output by default
///     NO_COLOR            Set to disable colored output
///     RUST_LOG            Log filter (takes precedence over -v / -q)
#[derive(Parser)]
#[command(name = "ostrich")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(short = 'C', long = "directory", value_name = "DIR", global = true)]
    directory: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site
    ///
    /// Processes every module for each selected flavor and runs the
    /// resulting compile, link and install steps. With no flavor given,
    /// all flavors are built; BUILD_FLAVOR takes precedence over both.
    ///
    /// EXAMPLES:
    ///     ostrich build                   Build every flavor
    ///     ostrich build release           Build only release
    ///     ostrich build --dry-run --json  Print the build plan as JSON
    #[command(visible_alias = "b")]
    Build {
        /// Flavors to build
        flavors: Vec<String>,
        /// Print the build steps instead of running them
        #[arg(long, short = 'n')]
        dry_run: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
        /// Build flavors one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Resolve target queries in a flavor
    ///
    /// Queries containing `*` are wildcards over `module::target` keys,
    /// queries containing `::` are exact keys, anything else is a target
    /// name looked up in every module.
    ///
    /// EXAMPLES:
    ///     ostrich query debug addressbook
    ///     ostrich query debug 'Writer::*' --json
    #[command(visible_alias = "q")]
    Query {
        /// Flavor whose registry is queried
        flavor: String,
        /// Queries, resolved in order
        #[arg(required = true)]
        queries: Vec<String>,
        /// Do not warn when a query matches several targets
        #[arg(long)]
        no_multi_warn: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// List flavors and their build roots
    Flavors {
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// List modules in build order
    Modules {
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     ostrich completions bash > ~/.local/share/bash-completion/completions/ostrich
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    init_logging(cli.verbose, cli.quiet, cli_config.no_color);

    if cli_config.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Build {
            flavors,
            dry_run,
            json,
            sequential,
        } => {
            let args = commands::build::BuildArgs {
                flavors,
                dry_run,
                json: json || cli_config.default_json,
                sequential,
                quiet: cli.quiet,
                project_dir: cli.directory,
            };
            commands::build::run(args)?;
        }
        Commands::Query {
            flavor,
            queries,
            no_multi_warn,
            json,
        } => {
            let args = commands::query::QueryArgs {
                flavor,
                queries,
                no_multi_warn,
                json: json || cli_config.default_json,
                project_dir: cli.directory,
            };
            commands::query::run(args)?;
        }
        Commands::Flavors { json } => {
            commands::flavors::run(cli.directory, json || cli_config.default_json)?;
        }
        Commands::Modules { json } => {
            commands::modules::run(cli.directory, json || cli_config.default_json)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flags
fn init_logging(verbose: bool, quiet: bool, no_color: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(!no_color && io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}
