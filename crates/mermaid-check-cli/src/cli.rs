//! Command-line interface for the mermaid-check utility
//!
//! Finds Mermaid blocks in Markdown documents, validates them and maps the
//! result onto the exit status.

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::inputs::{resolve_targets, Targets};
use crate::printer::Printer;
use mermaid_check::core::logging::init_logging;
use mermaid_check::plugins::{CheckConfig, Checker, MermaidJsConfig};
use mermaid_check::{ArtifactDir, MultiReport, Outcome, Report, ValidatorConfig};

/// Mermaid Check - Validate Mermaid.js diagrams embedded in Markdown
#[derive(Parser, Debug)]
#[command(name = "mermaid-check")]
#[command(about = "Validate the syntax of Mermaid diagrams in Markdown documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(arg_required_else_help = true, disable_help_flag = true)]
pub struct Cli {
    /// Markdown files or glob patterns (e.g. "docs/**/*.md")
    pub inputs: Vec<String>,

    /// Check every Markdown file in a directory
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Descend into subdirectories of --dir
    #[arg(short, long, requires = "dir")]
    pub recursive: bool,

    /// Only print failures and totals; a single document is printed as JSON
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Keep the directory of extracted block files and print its path
    #[arg(long)]
    pub keep_temp: bool,

    /// Per-block validation timeout in milliseconds (0 disables it)
    #[arg(long, value_name = "MS", default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Node.js binary used to run mermaid
    #[arg(long, value_name = "PATH")]
    pub node: Option<PathBuf>,

    /// node_modules directory (or project root) containing mermaid and jsdom
    #[arg(long, value_name = "PATH")]
    pub node_modules: Option<PathBuf>,

    /// Fence language tag that marks diagram blocks
    #[arg(long, default_value = "mermaid")]
    pub language: String,

    /// When to use colors in output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Print help
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub help: bool,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Report output formats
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-block lines and totals
    Human,
    /// The report as JSON
    Json,
}

/// When to colorize output
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if output is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl Cli {
    /// Output format after applying the `--quiet` shortcut
    pub fn output_format(&self, single: bool) -> OutputFormat {
        match self.format {
            Some(format) => format,
            None if single && self.quiet => OutputFormat::Json,
            None => OutputFormat::Human,
        }
    }

    fn check_config(&self) -> CheckConfig {
        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        CheckConfig::default()
            .with_language(self.language.clone())
            .with_validator(ValidatorConfig::default().with_timeout(timeout))
    }

    /// Environment first, then explicit flags on top
    fn mermaid_js_config(&self) -> MermaidJsConfig {
        let mut config = MermaidJsConfig::from_env();
        if let Some(node) = &self.node {
            config = config.with_node(node);
        }
        if let Some(node_modules) = &self.node_modules {
            config = config.with_node_modules(node_modules);
        }
        config
    }
}

/// Main CLI application
#[derive(Debug, Default)]
pub struct CheckApp;

impl CheckApp {
    pub fn new() -> Self {
        Self
    }

    /// Run the application and return how it ended
    ///
    /// Errors are operational failures; invalid diagrams are an `Ok` outcome.
    pub fn run(&mut self, cli: Cli) -> Result<Outcome> {
        // Environment variables take precedence over CLI flags
        let log_level_str = std::env::var("MERMAID_CHECK_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("MERMAID_CHECK_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.help {
            eprintln!("{}", Cli::command().render_help());
            return Ok(Outcome::OperationalError);
        }

        if cli.verbose {
            eprintln!("mermaid-check v{}", env!("CARGO_PKG_VERSION"));
        }

        let targets = resolve_targets(&cli.inputs, cli.dir.as_deref(), cli.recursive)?;
        debug!(
            documents = targets.documents.len(),
            single = targets.single,
            "Resolved input documents"
        );
        if cli.verbose {
            eprintln!("Checking {} document(s)", targets.documents.len());
        }

        let mut checker = Checker::mermaid_js(cli.check_config(), cli.mermaid_js_config())
            .with_artifacts(ArtifactDir::create()?);

        let result = self.check(&mut checker, &cli, &targets);

        if let Some(artifacts) = checker.take_artifacts() {
            if cli.keep_temp {
                eprintln!("Kept extracted blocks in {}", artifacts.keep().display());
            } else {
                artifacts.close();
            }
        }

        if let Ok(outcome) = &result {
            debug!(%outcome, exit_code = outcome.exit_code(), "Run finished");
            if cli.verbose {
                eprintln!("Result: {}", outcome);
            }
        }
        result
    }

    fn check(&self, checker: &mut Checker, cli: &Cli, targets: &Targets) -> Result<Outcome> {
        let format = cli.output_format(targets.single);
        let printer = Printer::new(should_colorize(cli.color), cli.quiet);

        match targets.documents.as_slice() {
            [document] if targets.single => {
                let report = checker.check_document(document)?;
                self.write_report(&report, format, &printer)?;
                Ok(report.outcome())
            }
            documents => {
                let multi = checker.check_documents(documents)?;
                self.write_multi_report(&multi, format, &printer)?;
                Ok(multi.outcome())
            }
        }
    }

    fn write_report(&self, report: &Report, format: OutputFormat, printer: &Printer) -> Result<()> {
        let text = match format {
            OutputFormat::Json => serde_json::to_string_pretty(report)? + "\n",
            OutputFormat::Human => printer.report(report),
        };
        write_stdout(&text)
    }

    fn write_multi_report(
        &self,
        multi: &MultiReport,
        format: OutputFormat,
        printer: &Printer,
    ) -> Result<()> {
        let text = match format {
            OutputFormat::Json => serde_json::to_string_pretty(multi)? + "\n",
            OutputFormat::Human => printer.multi_report(multi),
        };
        write_stdout(&text)
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Determine if output should be colorized
fn should_colorize(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            if std::env::var("NO_COLOR").is_ok() {
                return false;
            }
            crossterm::tty::IsTty::is_tty(&std::io::stdout())
        }
    }
}
