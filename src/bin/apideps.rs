//! apideps CLI
//!
//! Command-line interface for inferring operation dependencies from an
//! OpenAPI description.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use apideps::{
    analyze, load_description_auto, prepare, render_diagnostics, render_text, AnalysisConfig,
    Operation,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apideps")]
#[command(about = "Infer producer/consumer dependencies between API operations")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dependency graph of an API description
    Analyze {
        /// Description source: file path or URL (http:// or https://)
        source: String,

        /// Tag/alias configuration file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also print diagnostics to stderr
        #[arg(long)]
        diagnostics: bool,

        /// Evaluate operation pairs on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// List the operations extracted from an API description as JSON
    Operations {
        /// Description source: file path or URL (http:// or https://)
        source: String,

        /// Tag/alias configuration file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            source,
            config,
            format,
            pretty,
            output,
            diagnostics,
            sequential,
        } => run_analyze(AnalyzeArgs {
            source,
            config,
            format,
            pretty,
            output,
            diagnostics,
            sequential,
        }),

        Commands::Operations {
            source,
            config,
            pretty,
        } => run_operations(&source, config.as_deref(), pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apideps={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, u8> {
    match path {
        Some(path) => AnalysisConfig::from_file(path).map_err(|e| {
            eprintln!("Error loading config: {}", e);
            e.exit_code() as u8
        }),
        None => Ok(AnalysisConfig::default()),
    }
}

fn load(source: &str) -> Result<serde_json::Value, u8> {
    load_description_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

struct AnalyzeArgs {
    source: String,
    config: Option<PathBuf>,
    format: Format,
    pretty: bool,
    output: Option<PathBuf>,
    diagnostics: bool,
    sequential: bool,
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), u8> {
    let mut config = load_config(args.config.as_deref())?;
    if args.sequential {
        config = config.parallel(false);
    }
    let description = load(&args.source)?;

    let analysis = analyze(&description, &config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if args.diagnostics {
        eprint!("{}", render_diagnostics(&analysis));
    }

    let rendered = match args.format {
        Format::Text => render_text(&analysis),
        Format::Json => to_json(&analysis, args.pretty)?,
    };
    write_output(args.output.as_deref(), &rendered)
}

fn run_operations(source: &str, config: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let config = load_config(config)?;
    let description = load(source)?;

    let (_, extraction) = prepare(&description, &config).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let operations: Vec<&Operation> = extraction.operations.values().collect();
    let rendered = to_json(&operations, pretty)?;
    write_output(None, &rendered)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, u8> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), u8> {
    match output {
        Some(path) => std::fs::write(path, content).map_err(|e| {
            eprintln!("Error writing to {}: {}", path.display(), e);
            3u8
        }),
        None => {
            if content.ends_with('\n') {
                print!("{}", content);
            } else {
                println!("{}", content);
            }
            Ok(())
        }
    }
}
