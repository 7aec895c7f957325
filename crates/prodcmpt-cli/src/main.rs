//! prodcmpt CLI
//!
//! Command-line interface for checking, fixing and inspecting product components

mod commands;
mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use prodcmpt_core::PropertyValueType;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "prodcmpt")]
#[command(about = "Check product components against their types and templates")]
#[command(version = prodcmpt_core::VERSION)]
#[command(
    long_about = "prodcmpt validates product components, computes the delta between stored\n\
components and their current type, and shows how template values resolve.\n\
\n\
Examples:\n  \
prodcmpt check                          # Validate all components of the project\n  \
prodcmpt delta --fix                    # Bring stored components in line with their types\n  \
prodcmpt resolve products.Basic rate    # Show where the value of rate comes from\n  \
prodcmpt config init                    # Write a prodcmpt.yaml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        help = "Path to configuration file (prodcmpt.yaml/.prodcmptrc.toml)"
    )]
    config: Option<PathBuf>,

    /// Project directory, searched upward for a configuration file
    #[arg(short = 'C', long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Number of threads to use for parallel processing
    #[arg(
        short = 'j',
        long,
        global = true,
        help = "Number of threads (default: number of CPU cores)"
    )]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate template references, template value statuses and link cardinalities
    #[command(alias = "validate")]
    Check {
        /// Components to check (default: all)
        cmpts: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,

        /// Exit with non-zero code on warnings too
        #[arg(long)]
        error_on_warnings: bool,
    },

    /// Compute the differences between stored components and their types
    Delta {
        /// Components to compare (default: all)
        cmpts: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,

        /// Apply the fixes and write the components back
        #[arg(long)]
        fix: bool,
    },

    /// Show how a property value resolves along the template chain
    Resolve {
        /// Qualified name of the component
        cmpt: String,

        /// Name of the property
        property: String,

        /// Kind of the stored value
        #[arg(long, default_value = "AttributeValue", value_parser = parse_value_type)]
        kind: PropertyValueType,

        /// Resolve in the generation effective on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a configuration file into the project directory
    Init {
        /// Configuration file format
        #[arg(short, long, default_value = "yaml")]
        format: ConfigFormat,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print the JSON schema of the configuration file
    Schema,

    /// Show the configuration in effect
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON format for programmatic consumption
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ConfigFormat {
    /// prodcmpt.yaml
    Yaml,
    /// prodcmpt.json
    Json,
    /// .prodcmptrc.toml
    Toml,
}

fn parse_value_type(s: &str) -> std::result::Result<PropertyValueType, String> {
    PropertyValueType::from_element_name(s).ok_or_else(|| {
        let known: Vec<&str> = PropertyValueType::ALL
            .iter()
            .map(|t| t.element_name())
            .collect();
        format!("unknown value kind '{s}', expected one of {}", known.join(", "))
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    colored::control::set_override(!cli.no_color && std::env::var("NO_COLOR").is_err());

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    prodcmpt_core::init_tracing_with_level(Some(level));

    if let Some(threads) = cli.threads
        && let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
    {
        error!("Failed to set thread pool size: {}", e);
        return ExitCode::FAILURE;
    }

    match run_command(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("prodcmpt failed: {:#}", e);
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Run the selected command; `Ok(false)` means the command found problems
fn run_command(cli: Cli) -> anyhow::Result<bool> {
    let config = cli.config.as_deref();
    match cli.command {
        Some(Commands::Check {
            cmpts,
            format,
            error_on_warnings,
        }) => commands::check_command(config, &cli.dir, &cmpts, format, error_on_warnings),

        Some(Commands::Delta { cmpts, format, fix }) => {
            commands::delta_command(config, &cli.dir, &cmpts, format, fix)
        }

        Some(Commands::Resolve {
            cmpt,
            property,
            kind,
            date,
        }) => commands::resolve_command(config, &cli.dir, &cmpt, &property, kind, date.as_deref()),

        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { format, force } => {
                commands::config_init_command(&cli.dir, format, force)
            }
            ConfigAction::Schema => commands::config_schema_command(),
            ConfigAction::Show => commands::config_show_command(config, &cli.dir),
        },

        None => {
            Cli::command().print_help()?;
            Ok(true)
        }
    }
}
