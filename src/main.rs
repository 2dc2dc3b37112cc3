use anyhow::{Context, Result};
use blog_translate_sync::error::{SyncError, TranslateError};
use blog_translate_sync::i18n::Language;
use blog_translate_sync::report::SyncReport;
use blog_translate_sync::translation::{ChatTranslator, SegmentRequest, Translator};
use blog_translate_sync::{sync, Config};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Create missing translations between the two language trees of a blog.
#[derive(Debug, Parser)]
#[command(name = "translate-sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Content directory holding one subdirectory per language
    #[arg(long, global = true)]
    content_dir: Option<PathBuf>,

    /// Root of the primary-language tree (default: <content-dir>/<primary-lang>)
    #[arg(long, global = true)]
    primary_root: Option<PathBuf>,

    /// Root of the secondary-language tree (default: <content-dir>/<secondary-lang>)
    #[arg(long, global = true)]
    secondary_root: Option<PathBuf>,

    #[arg(long, global = true)]
    primary_lang: Option<String>,

    #[arg(long, global = true)]
    secondary_lang: Option<String>,

    /// File-name marker of secondary-language files (default: secondary language code)
    #[arg(long, global = true)]
    suffix: Option<String>,

    /// Report what would be translated without calling the service or writing files
    #[arg(long, global = true)]
    dry_run: bool,

    /// Maximum number of items translated at once
    #[arg(short = 'j', long, global = true)]
    concurrency: Option<usize>,

    /// Translate `tags` instead of copying them
    #[arg(long, global = true)]
    translate_tags: bool,

    /// Write a JSON report of every item to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Translate every item that exists in only one language (default)
    Sync,
    /// Translate a single content file into its counterpart
    TranslateFile { path: PathBuf },
}

/// Stand-in used by dry runs, which never reach the service.
struct Offline;

impl Translator for Offline {
    async fn translate(&self, _request: SegmentRequest<'_>) -> Result<String, TranslateError> {
        Err(TranslateError::Unreachable(
            "no translation service in a dry run".to_string(),
        ))
    }
}

const EXIT_CONFIGURATION: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (ignored when the variables come from the environment)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let directive = if cli.verbose {
        "blog_translate_sync=debug"
    } else {
        "blog_translate_sync=info"
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match directive.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing without writing further translations");
            on_signal.cancel();
        }
    });

    let result = if config.dry_run {
        execute(&cli, &config, &Offline, cancel).await
    } else {
        match config
            .credentials()
            .and_then(|credentials| {
                ChatTranslator::new(credentials, &config.api)
                    .map_err(|e| SyncError::ConfigurationFatal(e.to_string()))
            }) {
            Ok(translator) => execute(&cli, &config, &translator, cancel).await,
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(report) => finish(&report, cli.report.as_deref()),
        Err(e) => {
            error!("{}", e);
            if let Some(partial) = e.partial_report() {
                info!("Before abort: {}", partial.summary());
                write_report(partial, cli.report.as_deref());
            }
            ExitCode::from(EXIT_CONFIGURATION)
        }
    }
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config =
        Config::from_env().context("failed to read configuration from environment")?;

    if let Some(dir) = &cli.content_dir {
        config.content_dir = dir.clone();
    }
    if let Some(root) = &cli.primary_root {
        config.primary_root = Some(root.clone());
    }
    if let Some(root) = &cli.secondary_root {
        config.secondary_root = Some(root.clone());
    }
    if let Some(code) = &cli.primary_lang {
        config.primary_language =
            Language::from_code(code).context("invalid --primary-lang")?;
    }
    if let Some(code) = &cli.secondary_lang {
        config.secondary_language =
            Language::from_code(code).context("invalid --secondary-lang")?;
    }
    if let Some(suffix) = &cli.suffix {
        config.suffix = Some(suffix.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config.dry_run |= cli.dry_run;
    config.translate_tags |= cli.translate_tags;

    config.validate()?;
    Ok(config)
}

async fn execute<T: Translator>(
    cli: &Cli,
    config: &Config,
    translator: &T,
    cancel: CancellationToken,
) -> Result<SyncReport, SyncError> {
    match &cli.command {
        Some(Command::TranslateFile { path }) => {
            info!("Translating single file {}", path.display());
            sync::translate_file(config, translator, path, cancel).await
        }
        Some(Command::Sync) | None => {
            info!(
                "Starting sync ({} <-> {}){}",
                config.primary_language,
                config.secondary_language,
                if config.dry_run { " [dry run]" } else { "" }
            );
            sync::run(config, translator, cancel).await
        }
    }
}

fn finish(report: &SyncReport, report_path: Option<&Path>) -> ExitCode {
    let summary = report.summary();
    info!("Sync complete: {}", summary);
    write_report(report, report_path);

    ExitCode::from(report.exit_code() as u8)
}

fn write_report(report: &SyncReport, report_path: Option<&Path>) {
    if let Some(path) = report_path {
        match report.write_json(path) {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(e) => warn!("Failed to write report to {}: {}", path.display(), e),
        }
    }
}
