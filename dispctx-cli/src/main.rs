//! dispctx CLI - print the issue string for positions in C/C++ source

#![deny(warnings)]

// Global invariants enforced:
// - One output line per requested position, in request order
// - stdout carries only reports; diagnostics go to stderr

use anyhow::Context;
use clap::{Parser, Subcommand};
use dispctx_core::config;
use dispctx_core::{display_file, render_json, render_text, ColumnMode, Language, Position};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dispctx")]
#[command(about = "Print the static-analyzer issue string for a line and column of C/C++ source")]
#[command(version = env!("DISPCTX_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve positions in a source file to issue strings
    Display {
        /// Path to the C or C++ source file
        source: PathBuf,

        /// 1-based line of a position (repeatable, paired with --column)
        #[arg(long, required = true, value_parser = clap::value_parser!(u32).range(1..))]
        line: Vec<u32>,

        /// 1-based column of a position (repeatable, paired with --line)
        #[arg(long, required = true, value_parser = clap::value_parser!(u32).range(1..))]
        column: Vec<u32>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Source language (default: detect from the file extension)
        #[arg(long)]
        language: Option<LanguageArg>,

        /// Compare columns for nodes that start and end on the requested line
        #[arg(long)]
        precise_columns: bool,

        /// Report no issue when the resolved location is on another line
        #[arg(long)]
        require_exact_line: bool,

        /// Fail when the source only parses with error recovery
        #[arg(long)]
        reject_syntax_errors: bool,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without resolving anything
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LanguageArg {
    C,
    Cpp,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::C => Language::C,
            LanguageArg::Cpp => Language::Cpp,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Display {
            source,
            line,
            column,
            format,
            language,
            precise_columns,
            require_exact_line,
            reject_syntax_errors,
            config: config_path,
        } => {
            if line.len() != column.len() {
                anyhow::bail!("Number of lines and columns must be the same");
            }

            let working_dir = std::env::current_dir()?;
            let resolved_config = config::load_and_resolve(&working_dir, config_path.as_deref())
                .context("failed to load configuration")?;
            if let Some(path) = &resolved_config.config_path {
                debug!(config = %path.display(), "using config");
            }

            // CLI flags override config file values
            let mut options = resolved_config.options();
            if precise_columns {
                options.column_mode = ColumnMode::Precise;
            }
            options.require_exact_line |= require_exact_line;
            options.reject_syntax_errors |= reject_syntax_errors;

            let language = language
                .map(Language::from)
                .or_else(|| resolved_config.language_for(&source));

            let positions: Vec<Position> = line
                .iter()
                .zip(&column)
                .map(|(&line, &column)| Position::new(line, column))
                .collect();

            let reports = display_file(&source, language, &positions, &options)?;

            match format {
                OutputFormat::Text => print!("{}", render_text(&reports)),
                OutputFormat::Json => println!("{}", render_json(&reports)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let working_dir = std::env::current_dir()?;
                match config::load_and_resolve(&working_dir, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let working_dir = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&working_dir, path.as_deref())
                    .context("failed to load configuration")?;

                println!("Configuration:");
                match resolved.config_path {
                    Some(ref p) => println!("  Source: {}", p.display()),
                    None => println!("  Source: defaults"),
                }
                let column_mode = match resolved.column_mode {
                    ColumnMode::LineOnly => "line-only",
                    ColumnMode::Precise => "precise",
                };
                println!("  Column mode: {}", column_mode);
                println!("  Require exact line: {}", resolved.require_exact_line);
                println!("  Reject syntax errors: {}", resolved.reject_syntax_errors);
                if resolved.cpp_extensions.is_empty() {
                    println!("  Extra C++ extensions: none");
                } else {
                    println!(
                        "  Extra C++ extensions: {}",
                        resolved.cpp_extensions.join(", ")
                    );
                }
            }
        },
    }

    Ok(())
}
