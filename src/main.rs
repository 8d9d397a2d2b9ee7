//! Tx Guardian CLI - Command-line interface for transactional boundary checks
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like config discovery, process exit codes and terminal output
//! - Logging goes to stderr so stdout carries only the report

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use tx_guardian::config::RULE_ID;
use tx_guardian::{
    AnalysisOptions, GuardianConfig, GuardianResult, GuardianValidator, OutputFormat,
    ReportFormatter, ReportOptions, Severity,
};

const DEFAULT_CONFIGS: [&str; 3] = ["tx_guardian.yaml", "tx_guardian.yml", ".tx_guardian.yaml"];

/// Tx Guardian - transactional boundary enforcement
#[derive(Parser)]
#[command(name = "tx-guardian")]
#[command(version)]
#[command(about = "Flags managed components that hold repositories without being transactional")]
#[command(long_about = "Tx Guardian reads program models produced by a compiler front end and reports every component class holding a repository-typed field while lacking a transactional annotation. Diagnostics print as <file>:[<line>,<column>] <message>.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check program models for non-transactional repository holders
    Check {
        /// Model files or directories to analyze
        paths: Vec<PathBuf>,

        /// Output format: human, json, compiler, sarif or github
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,

        /// Minimum severity level to report
        #[arg(short, long, value_enum)]
        severity: Option<SeverityArg>,

        /// Maximum number of violations to report
        #[arg(long)]
        max_violations: Option<usize>,

        /// Maximum number of models to analyze
        #[arg(long)]
        max_models: Option<usize>,

        /// Disable parallel processing
        #[arg(long)]
        no_parallel: bool,

        /// Fail on the first model that cannot be loaded
        #[arg(long)]
        fail_fast: bool,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// Explain what the rule checks and how it is configured
    Explain,
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

/// Everything `check` needs besides the config
struct CheckArgs {
    paths: Vec<PathBuf>,
    format: OutputFormat,
    severity: Option<SeverityArg>,
    max_violations: Option<usize>,
    max_models: Option<usize>,
    no_parallel: bool,
    fail_fast: bool,
    use_colors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json)?;

    let exit_code = run_command(cli).await?;
    process::exit(exit_code);
}

async fn run_command(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Check {
            paths,
            format,
            severity,
            max_violations,
            max_models,
            no_parallel,
            fail_fast,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let args = CheckArgs {
                paths,
                format,
                severity,
                max_violations,
                max_models,
                no_parallel,
                fail_fast,
                use_colors: !cli.no_color,
            };
            Ok(run_check(config, args).await?)
        }
        Commands::ValidateConfig { config_file } => Ok(run_validate_config(config_file.or(cli.config))),
        Commands::Explain => {
            let config = load_config(cli.config.as_deref())?;
            Ok(run_explain(&config))
        }
    }
}

/// Use the given config file, else the first default file present, else defaults
fn load_config(config_path: Option<&Path>) -> anyhow::Result<GuardianConfig> {
    if let Some(config_path) = config_path {
        return GuardianConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()));
    }

    for config_name in DEFAULT_CONFIGS {
        if Path::new(config_name).exists() {
            tracing::debug!("Using configuration {}", config_name);
            return GuardianConfig::load_from_file(config_name)
                .with_context(|| format!("Failed to load configuration from {config_name}"));
        }
    }

    Ok(GuardianConfig::default())
}

async fn run_check(config: GuardianConfig, args: CheckArgs) -> GuardianResult<i32> {
    let formatter = ReportFormatter::new(ReportOptions {
        use_colors: args.use_colors,
        max_violations: args.max_violations,
        min_severity: args.severity.map(Into::into),
        ..Default::default()
    });
    let validator = GuardianValidator::new_with_config(config)?.with_report_formatter(formatter);

    // Use current directory if no paths specified
    let paths = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths
    };

    let options = AnalysisOptions {
        parallel: !args.no_parallel,
        fail_fast: args.fail_fast,
        max_models: args.max_models,
    };

    let report = validator.validate_with_options(&paths, &options).await?;

    validator.write_report(&report, args.format, std::io::stdout().lock())?;

    if report.has_errors() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn run_validate_config(config_path: Option<PathBuf>) -> i32 {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIGS[0]));

    println!("Validating configuration: {}", config_path.display());

    match GuardianConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("  Model patterns: {}", config.models.patterns.len());
            println!("  Exclude patterns: {}", config.models.exclude.len());
            println!("  Component annotations: {}", config.rule.component_annotations.len());
            println!("  Exempt annotations: {}", config.rule.exempt_annotations.len());
            println!("  Fingerprint: {}", config.fingerprint());
            0
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {e}");
            1
        }
    }
}

fn run_explain(config: &GuardianConfig) -> i32 {
    let rule = &config.rule;

    println!("Rule: {RULE_ID}");
    println!("Severity: {}", rule.severity.as_str());
    println!("Enabled: {}", rule.enabled);
    println!();
    println!("Description:");
    println!("   A class annotated with any component annotation that declares a field whose");
    println!("   type implements the repository interface, directly or through supertypes,");
    println!("   must carry one of the exempt annotations.");
    println!();
    println!("Component annotations:");
    for annotation in &rule.component_annotations {
        println!("   {annotation}");
    }
    println!("Exempt annotations:");
    for annotation in &rule.exempt_annotations {
        println!("   {annotation}");
    }
    println!("Repository interface:");
    println!("   {}", rule.repository_interface);
    println!();
    println!("Message:");
    println!("   <file>:[<line>,<column>] {}", rule.message_template());

    0
}

fn init_logging(verbose: bool, json: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
