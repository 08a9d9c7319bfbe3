//! Signature chain validator CLI
//!
//! Validates a signer certificate chain against trust anchors, CRLs and
//! OCSP evidence, and manages the validation policy file.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use sigchain_validator::{
    ChainValidationWorkflow, ConfigManager, EmbeddedCrlClient, ExportFormat, HttpCrlClient,
    InMemoryCertificateStore, OnlineFetching, OpenSslSignatureVerifier, ParsedCertificate,
    ReportItemStatus, TimeBasedContext, ValidationConfiguration, ValidationReport,
    ValidatorChainBuilder,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Parser)]
#[command(name = "sigchain-validator")]
#[command(about = "Certificate chain and revocation validation for document signatures")]
#[command(long_about = "
Signature chain validator - checks validity, extensions, trust and revocation
of the certificate chain behind a document signature.

EXAMPLES:
    # Validate a signer against a trusted root, with embedded CRLs
    sigchain-validator validate --signer signer.pem --chain ca.pem \\
        --trust root.pem --crl ca.crl --crl root.crl

    # Validate at the signing time, emitting JSON
    sigchain-validator validate --signer signer.pem --trust root.pem \\
        --at 2024-03-01T12:00:00Z --historical --json

    # Create the default policy file
    sigchain-validator config init

EXIT CODES:
    0   INFO: the chain is valid
    1   INVALID
    2   INDETERMINATE

ENVIRONMENT VARIABLES:
    RUST_LOG        Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a certificate chain
    Validate(ValidateArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// PEM file whose first certificate is validated; further certificates
    /// are used as intermediates
    #[arg(long, value_name = "PEM")]
    signer: PathBuf,

    /// PEM files with intermediate certificates
    #[arg(long, value_name = "PEM")]
    chain: Vec<PathBuf>,

    /// PEM files with trust anchors
    #[arg(long, value_name = "PEM", required = true)]
    trust: Vec<PathBuf>,

    /// CRL files (PEM or DER) shipped with the document
    #[arg(long, value_name = "CRL")]
    crl: Vec<PathBuf>,

    /// Validation instant in RFC 3339 (defaults to now)
    #[arg(long, value_name = "TIME")]
    at: Option<String>,

    /// Validate at a past instant (historical freshness rules apply)
    #[arg(long)]
    historical: bool,

    /// Validate as a timestamp authority certificate
    #[arg(long)]
    timestamp: bool,

    /// Never download revocation data
    #[arg(long)]
    offline: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Policy file (defaults to the user configuration)
    #[arg(long, value_name = "FILE", env = "SIGCHAIN_VALIDATOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => {
            let report = handle_validate_command(&args).await?;
            print_report(&report, args.json)?;
            match report.validation_result() {
                ReportItemStatus::Info => {}
                ReportItemStatus::Invalid => std::process::exit(1),
                ReportItemStatus::Indeterminate => std::process::exit(2),
            }
        }
        Commands::Config(config_cmd) => handle_config_command(config_cmd)?,
    }

    Ok(())
}

fn load_configuration(path: Option<&Path>) -> Result<ValidationConfiguration> {
    match path {
        Some(path) => ConfigManager::with_path(path).load().into_diagnostic(),
        None => {
            let manager = ConfigManager::new().into_diagnostic()?;
            if manager.config_path().exists() {
                manager.load().into_diagnostic()
            } else {
                Ok(ValidationConfiguration::default())
            }
        }
    }
}

fn parse_instant(at: Option<&str>) -> Result<SystemTime> {
    match at {
        Some(text) => {
            let parsed = chrono::DateTime::parse_from_rfc3339(text)
                .into_diagnostic()
                .wrap_err_with(|| format!("Invalid RFC 3339 time: {text}"))?;
            Ok(SystemTime::from(parsed.with_timezone(&chrono::Utc)))
        }
        None => Ok(SystemTime::now()),
    }
}

fn read_certificates(path: &Path) -> Result<Vec<ParsedCertificate>> {
    let pem = std::fs::read(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    ParsedCertificate::load_pem_chain(&pem).into_diagnostic()
}

async fn handle_validate_command(args: &ValidateArgs) -> Result<ValidationReport> {
    let mut config = load_configuration(args.config.as_deref())?;
    if args.offline {
        config.online_fetching = OnlineFetching::Never;
    }
    let instant = parse_instant(args.at.as_deref())?;

    let mut signer_file = read_certificates(&args.signer)?.into_iter();
    let signer = signer_file
        .next()
        .ok_or_else(|| miette::miette!("No certificate found in {}", args.signer.display()))?;

    let mut store = InMemoryCertificateStore::new();
    store.add_certificates(signer_file);
    for path in &args.chain {
        store.load_certificates_pem(path).into_diagnostic()?;
    }
    for path in &args.trust {
        store.load_trust_anchors_pem(path).into_diagnostic()?;
    }

    let mut embedded = EmbeddedCrlClient::default();
    for path in &args.crl {
        embedded.load_crl_file(path).into_diagnostic()?;
    }

    let http = HttpCrlClient::new(config.crl_http_config()).into_diagnostic()?;
    let validator = ValidatorChainBuilder::new()
        .with_properties(config.into_properties())
        .with_certificate_store(Arc::new(store))
        .with_signature_verifier(Arc::new(OpenSslSignatureVerifier::new()))
        .with_crl_client(Arc::new(embedded))
        .with_crl_client(Arc::new(http))
        .build()
        .into_diagnostic()?;
    let workflow = ChainValidationWorkflow::new(validator);

    let report = if args.timestamp {
        workflow.validate_timestamp_chain(&signer, instant).await
    } else {
        let time_based_context = if args.historical {
            TimeBasedContext::Historical
        } else {
            TimeBasedContext::Present
        };
        workflow
            .validate_signer_chain(&signer, instant, time_based_context)
            .await
    };
    Ok(report)
}

fn print_report(report: &ValidationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report).into_diagnostic()?);
        return Ok(());
    }
    let marker = match report.validation_result() {
        ReportItemStatus::Info => "✅",
        ReportItemStatus::Indeterminate => "⚠️",
        ReportItemStatus::Invalid => "❌",
    };
    println!("{marker} {report}");
    Ok(())
}

fn handle_config_command(config_cmd: ConfigCommands) -> Result<()> {
    let config_manager = ConfigManager::new().into_diagnostic()?;

    match config_cmd {
        ConfigCommands::Show => match config_manager.load() {
            Ok(config) => {
                println!("📋 Current Configuration:");
                println!("  Continue after failure: {}", config.continue_after_failure);
                println!("  Freshness: {}s", config.freshness_seconds);
                println!(
                    "  Historical freshness: {}s",
                    config.historical_freshness_seconds
                );
                println!("  Online fetching: {:?}", config.online_fetching);
                println!("  Maximum chain depth: {}", config.max_chain_depth);
                println!("  Policy overrides: {}", config.overrides.len());
                println!(
                    "  Configuration file: {}",
                    config_manager.config_path().display()
                );
            }
            Err(_) => {
                println!("📋 No configuration file found. Use 'config init' to create one.");
            }
        },

        ConfigCommands::Init => {
            config_manager.load_or_create_default().into_diagnostic()?;
            println!(
                "✅ Configuration initialized: {}",
                config_manager.config_path().display()
            );
        }

        ConfigCommands::Export { format, output } => {
            let content = config_manager
                .export_config(format.into())
                .into_diagnostic()?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, content).into_diagnostic()?;
                println!("✅ Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }
    }

    Ok(())
}
